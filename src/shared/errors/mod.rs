use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// データベース関連のエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// バリデーション関連のエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// リソースが見つからない場合のエラー
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 認証関連のエラー
    #[error("認証エラー: {0}")]
    Authentication(String),

    /// 外部サービス連携でのエラー
    #[error("外部サービスエラー: {0}")]
    ExternalService(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// 許可されていないHTTPメソッド
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// リクエスト本文が上限を超えている
    #[error("リクエスト本文が大きすぎます")]
    PayloadTooLarge,

    /// I/O関連のエラー
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（外部サービス一時的エラーなど）
    Medium,
    /// 高重要度（データベースエラーなど）
    High,
}

impl AppError {
    /// ユーザーに表示するメッセージを取得
    ///
    /// ストア層のエラーは生のメッセージをそのまま返す。
    /// 呼び出し側はこのメッセージを表示して処理を中断する。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Authentication(msg) => msg.clone(),
            AppError::ExternalService(msg) => msg.clone(),
            AppError::Configuration(_) => "設定エラーが発生しました".to_string(),
            AppError::MethodNotAllowed => "Method not allowed".to_string(),
            AppError::PayloadTooLarge => "リクエスト本文が大きすぎます".to_string(),
            AppError::Io(_) => "ファイル操作でエラーが発生しました".to_string(),
            AppError::Json(e) => format!("JSONの形式が正しくありません: {e}"),
        }
    }

    /// エラーの詳細情報を取得（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Database(_) => ErrorSeverity::High,
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::NotFound(_) => ErrorSeverity::Low,
            AppError::Authentication(_) => ErrorSeverity::Low,
            AppError::ExternalService(_) => ErrorSeverity::Medium,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::MethodNotAllowed | AppError::PayloadTooLarge => ErrorSeverity::Low,
            AppError::Io(_) => ErrorSeverity::Medium,
            AppError::Json(_) => ErrorSeverity::Low,
        }
    }

    /// HTTPレスポンスのステータスコードを取得
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) | AppError::Json(_) => 400,
            AppError::Authentication(_) => 401,
            AppError::NotFound(_) => 404,
            AppError::MethodNotAllowed => 405,
            AppError::PayloadTooLarge => 413,
            AppError::ExternalService(_) => 502,
            AppError::Database(_)
            | AppError::Configuration(_)
            | AppError::Io(_) => 500,
        }
    }

    /// バリデーションエラーを作成するヘルパー関数
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// リソース未発見エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `resource` - 見つからなかったリソース名
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        AppError::NotFound(format!("{}が見つかりません", resource.into()))
    }

    /// 認証エラーを作成するヘルパー関数
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        AppError::Authentication(message.into())
    }

    /// 外部サービスエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `service` - サービス名
    /// * `message` - エラーメッセージ
    pub fn external_service<S: Into<String>>(service: S, message: S) -> Self {
        AppError::ExternalService(format!("{}: {}", service.into(), message.into()))
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }
}

/// rusqlite::ErrorからAppErrorへの変換
impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Database(error.to_string())
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        assert_eq!(
            AppError::validation("テスト").severity(),
            ErrorSeverity::Low
        );
        assert_eq!(
            AppError::not_found("サブスクリプション").severity(),
            ErrorSeverity::Low
        );
        assert_eq!(
            AppError::external_service("Resend", "接続失敗").severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            AppError::configuration("設定ファイル不正").severity(),
            ErrorSeverity::High
        );
    }

    #[test]
    fn test_user_message() {
        let validation_error = AppError::validation("金額が不正です");
        assert_eq!(validation_error.user_message(), "金額が不正です");

        let not_found_error = AppError::not_found("サブスクリプション");
        assert_eq!(
            not_found_error.user_message(),
            "サブスクリプションが見つかりません"
        );

        // ストア層のエラーは生のメッセージを返す
        let db_error = AppError::Database("UNIQUE constraint failed".to_string());
        assert_eq!(db_error.user_message(), "UNIQUE constraint failed");

        let config_error = AppError::configuration("RESEND_API_KEY");
        assert_eq!(config_error.user_message(), "設定エラーが発生しました");
    }

    #[test]
    fn test_status_code() {
        assert_eq!(AppError::validation("x").status_code(), 400);
        assert_eq!(AppError::authentication("x").status_code(), 401);
        assert_eq!(AppError::not_found("x").status_code(), 404);
        assert_eq!(AppError::MethodNotAllowed.status_code(), 405);
        assert_eq!(AppError::PayloadTooLarge.status_code(), 413);
        assert_eq!(
            AppError::external_service("auth", "down").status_code(),
            502
        );
        assert_eq!(AppError::Database("x".to_string()).status_code(), 500);
    }

    #[test]
    fn test_helper_functions() {
        let external_error = AppError::external_service("TestService", "テストエラー");
        assert!(matches!(external_error, AppError::ExternalService(_)));
        assert!(external_error.details().contains("TestService: テストエラー"));

        let rusqlite_error: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(rusqlite_error, AppError::Database(_)));
    }
}
