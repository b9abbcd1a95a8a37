use crate::shared::errors::AppError;
use serde::{Deserialize, Serialize};

/// 認証プロバイダー上のユーザー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// ユーザーID（プロバイダーが発行）
    pub id: String,
    /// メールアドレス
    #[serde(default)]
    pub email: Option<String>,
}

/// セッション情報を表す構造体
///
/// サインイン（コード検証）で作成され、サインアウトで破棄される。
/// 本人確認が必要な操作にはこの値を明示的に渡す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// セッションID
    pub id: String,
    /// ユーザーID
    pub user_id: String,
    /// メールアドレス
    pub email: String,
    /// 有効期限（RFC3339、UTC）
    pub expires_at: String,
    /// 作成日時（RFC3339、UTC）
    pub created_at: String,
}

/// コード送信リクエスト
#[derive(Debug, Clone, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

/// コード検証リクエスト
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

/// サインイン成功時のレスポンス
#[derive(Debug, Clone, Serialize)]
pub struct SignInResponse {
    /// 暗号化されたセッショントークン
    pub token: String,
    pub user: User,
    pub expires_at: String,
}

/// 現在のセッションユーザー
#[derive(Debug, Clone, Serialize)]
pub struct SessionUser {
    pub user_id: String,
    pub email: String,
    pub expires_at: String,
}

impl From<&Session> for SessionUser {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            expires_at: session.expires_at.clone(),
        }
    }
}

/// 認証エラーの種類
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// 認証設定エラー
    #[error("認証設定エラー: {0}")]
    ConfigError(String),

    /// メールアドレスの形式が不正
    #[error("メールアドレスの形式が正しくありません: {0}")]
    InvalidEmail(String),

    /// 認証コードが不正または期限切れ
    #[error("認証コードが無効です: {0}")]
    InvalidCode(String),

    /// 認証プロバイダーがリクエストを拒否した
    #[error("認証プロバイダーエラー: {0}")]
    ProviderError(String),

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    NetworkError(String),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    DatabaseError(String),

    /// 暗号化エラー
    #[error("暗号化エラー: {0}")]
    EncryptionError(String),

    /// 無効なトークンエラー
    #[error("無効なトークン")]
    InvalidToken,

    /// セッション期限切れエラー
    #[error("セッションが期限切れです")]
    SessionExpired,

    /// 認証が必要エラー
    #[error("認証が必要です")]
    AuthenticationRequired,
}

impl From<rusqlite::Error> for AuthError {
    fn from(error: rusqlite::Error) -> Self {
        AuthError::DatabaseError(error.to_string())
    }
}

/// セッションエラーの種類
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// 暗号化エラー
    #[error("暗号化エラー: {0}")]
    EncryptionError(String),

    /// 復号化エラー
    #[error("復号化エラー: {0}")]
    DecryptionError(String),

    /// セッション期限切れ
    #[error("セッションが期限切れです")]
    Expired,

    /// セッションが見つからない
    #[error("セッションが見つかりません")]
    NotFound,

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    DatabaseError(String),
}

impl From<rusqlite::Error> for SessionError {
    fn from(error: rusqlite::Error) -> Self {
        SessionError::DatabaseError(error.to_string())
    }
}

impl From<SessionError> for AuthError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Expired => AuthError::SessionExpired,
            SessionError::NotFound => AuthError::InvalidToken,
            // 改ざん・別キーのトークンは無効なトークンとして扱う
            SessionError::DecryptionError(_) => AuthError::InvalidToken,
            SessionError::EncryptionError(msg) => AuthError::EncryptionError(msg),
            SessionError::DatabaseError(msg) => AuthError::DatabaseError(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidEmail(_) => AppError::Validation(error.to_string()),
            AuthError::NetworkError(msg) => AppError::external_service("認証プロバイダー".to_string(), msg),
            AuthError::DatabaseError(msg) => AppError::Database(msg),
            AuthError::ConfigError(msg) | AuthError::EncryptionError(msg) => {
                AppError::Configuration(msg)
            }
            AuthError::InvalidCode(_)
            | AuthError::ProviderError(_)
            | AuthError::InvalidToken
            | AuthError::SessionExpired
            | AuthError::AuthenticationRequired => AppError::authentication(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_conversion() {
        assert!(matches!(
            AuthError::from(SessionError::Expired),
            AuthError::SessionExpired
        ));
        assert!(matches!(
            AuthError::from(SessionError::NotFound),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            AuthError::from(SessionError::DecryptionError("tag".to_string())),
            AuthError::InvalidToken
        ));
    }

    #[test]
    fn test_app_error_conversion() {
        assert_eq!(AppError::from(AuthError::InvalidToken).status_code(), 401);
        assert_eq!(AppError::from(AuthError::SessionExpired).status_code(), 401);
        assert_eq!(
            AppError::from(AuthError::InvalidCode("expired".to_string())).status_code(),
            401
        );
        assert_eq!(
            AppError::from(AuthError::InvalidEmail("x".to_string())).status_code(),
            400
        );
        assert_eq!(
            AppError::from(AuthError::NetworkError("timeout".to_string())).status_code(),
            502
        );

        let error = AppError::from(AuthError::AuthenticationRequired);
        assert!(matches!(error, AppError::Authentication(_)));
        assert_eq!(error.user_message(), "認証が必要です");
    }

    #[test]
    fn test_user_deserialize_without_email() {
        let user: User = serde_json::from_str(r#"{"id":"abc","aud":"authenticated"}"#).unwrap();
        assert_eq!(user.id, "abc");
        assert_eq!(user.email, None);
    }
}
