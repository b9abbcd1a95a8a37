/// 機能別モジュール
pub mod features;

/// 共有モジュール
pub mod shared;

use chrono::NaiveDate;
use features::auth::{AuthProvider, AuthService, HttpAuthProvider, SessionManager};
use features::reminders::{Mailer, ResendMailer};
use log::{error, info, warn};
use rusqlite::Connection;
use shared::config::{AuthConfig, EmailConfig, EnvironmentConfig, ServerConfig};
use shared::errors::AppError;
use shared::utils::today_in_berlin;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// アプリケーション状態
pub struct AppState {
    /// データベース接続
    pub db: Arc<Mutex<Connection>>,
    /// 認証サービス
    pub auth: AuthService,
    /// メール送信
    pub mailer: Arc<dyn Mailer>,
    /// リマインダーの送信元アドレス
    pub from_email: String,
    /// ベルリン時間での今日を返す
    pub today: fn() -> NaiveDate,
}

impl AppState {
    /// アプリケーション状態を作成する
    ///
    /// # 引数
    /// * `db` - データベース接続
    /// * `provider` - 認証プロバイダー
    /// * `mailer` - メール送信
    /// * `session_encryption_key` - セッショントークンの暗号化キー
    /// * `from_email` - リマインダーの送信元アドレス
    pub fn new(
        db: Arc<Mutex<Connection>>,
        provider: Arc<dyn AuthProvider>,
        mailer: Arc<dyn Mailer>,
        session_encryption_key: String,
        from_email: String,
    ) -> Self {
        let session_manager = SessionManager::new(Arc::clone(&db), session_encryption_key);
        Self {
            auth: AuthService::new(provider, session_manager),
            db,
            mailer,
            from_email,
            today: today_in_berlin,
        }
    }
}

/// 設定検証エラーを処理する（本番環境では起動を中止する）
fn check_config(
    env_config: &EnvironmentConfig,
    name: &str,
    result: Result<(), String>,
) -> Result<(), AppError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if env_config.is_production() => {
            error!("{name}の検証に失敗しました: {e}");
            Err(AppError::configuration(format!("{name}: {e}")))
        }
        Err(e) => {
            warn!("{name}の検証に失敗しましたが、開発環境のため続行します: {e}");
            Ok(())
        }
    }
}

/// サーバーを起動する
///
/// 環境変数の読み込み、ログ・データベースの初期化、外部サービスクライアントの作成を行い、
/// APIサーバーを起動する。
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    shared::config::load_environment_variables();
    shared::config::initialize_logging_system();

    info!("アプリケーション初期化を開始します...");

    let env_config = EnvironmentConfig::from_env();

    let server_config = ServerConfig::from_env();
    check_config(&env_config, "サーバー設定", server_config.validate())?;

    let auth_config = AuthConfig::from_env()
        .ok_or_else(|| AppError::configuration("認証プロバイダーの設定が見つかりません"))?;
    check_config(&env_config, "認証設定", auth_config.validate())?;
    info!("認証設定: {:?}", auth_config.get_debug_info());

    let email_config = EmailConfig::from_env()
        .ok_or_else(|| AppError::configuration("メール送信の設定が見つかりません"))?;
    check_config(&env_config, "メール設定", email_config.validate())?;
    info!("メール設定: {:?}", email_config.get_debug_info());

    // データベースを初期化
    let init_result = shared::config::initialize_application()?;
    let db_conn = shared::database::initialize_database(&init_result.database_path)
        .map_err(|e| {
            error!("データベースの初期化に失敗しました: {e}");
            e
        })?;
    shared::config::log_initialization_complete(&init_result);

    let db = Arc::new(Mutex::new(db_conn));
    let timeout = server_config.http_timeout_seconds;
    let provider = Arc::new(HttpAuthProvider::new(&auth_config, timeout)?);
    let mailer = Arc::new(ResendMailer::new(&email_config, timeout)?);

    let state = AppState::new(
        db,
        provider,
        mailer,
        auth_config.session_encryption_key.clone(),
        email_config.from_email.clone(),
    );

    // 起動時に期限切れセッションを削除
    if let Err(e) = state.auth.cleanup_expired_sessions() {
        warn!("期限切れセッションの削除に失敗しました: {e}");
    }

    let addr: SocketAddr = server_config
        .bind_addr
        .parse()
        .map_err(|e| AppError::configuration(format!("BIND_ADDR が不正です: {e}")))?;

    info!("アプリケーション初期化が完了しました");

    features::server::serve(Arc::new(state), addr).await
}
