use std::collections::HashMap;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            debug_mode,
            log_level,
        }
    }

    /// プロダクション環境かどうかを判定
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 開発環境かどうかを判定
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// 現在の実行環境を判定する
///
/// # 判定ロジック
/// 1. 実行時環境変数 ENVIRONMENT を確認
/// 2. デバッグビルドの場合は Development
/// 3. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_subscriptions.db"
/// - プロダクション環境: "subscriptions.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_subscriptions.db",
        Environment::Production => "subscriptions.db",
    }
}

/// 環境に応じた.envファイルを読み込む
pub fn load_environment_variables() {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    log::info!("環境: {environment}, 読み込み対象: {env_file}");

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            log::info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                log::warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// 複数回呼ばれても二重初期化でパニックしない。
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        log::info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level,
            env_config.environment
        );
    }
}

/// 秘密情報をマスクする（先頭`visible`文字のみ表示）
pub fn mask_secret(value: &str, visible: usize) -> String {
    let prefix: String = value.chars().take(visible).collect();
    format!("{prefix}****")
}

/// HTTPサーバーの設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 待ち受けアドレス
    pub bind_addr: String,
    /// 外部HTTP呼び出しのタイムアウト秒数
    pub http_timeout_seconds: u64,
}

impl ServerConfig {
    /// 環境変数からサーバー設定を読み込む
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
            log::debug!("BIND_ADDR が設定されていないため、デフォルト値を使用");
            "127.0.0.1:3000".to_string()
        });

        let http_timeout_seconds = std::env::var("HTTP_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Self {
            bind_addr,
            http_timeout_seconds,
        }
    }

    /// 設定を検証する
    pub fn validate(&self) -> Result<(), String> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| format!("BIND_ADDR が不正です: {e}"))?;
        if self.http_timeout_seconds == 0 {
            return Err("HTTP_TIMEOUT_SECONDS は1以上である必要があります".to_string());
        }
        Ok(())
    }
}

/// 認証プロバイダー（ワンタイムコード認証）の設定
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// 認証プロバイダーのベースURL
    pub base_url: String,
    /// 公開（anon）キー
    pub anon_key: String,
    /// 管理用（service role）キー
    pub service_role_key: String,
    /// セッション暗号化キー
    pub session_encryption_key: String,
}

impl AuthConfig {
    /// 環境変数から認証設定を読み込む
    ///
    /// # 戻り値
    /// 認証設定、または必須項目が欠けている場合はNone
    pub fn from_env() -> Option<Self> {
        log::debug!("AuthConfig::from_env() - 環境変数の読み込みを開始");

        let base_url = option_env!("EMBEDDED_AUTH_URL")
            .map(|s| {
                log::debug!("コンパイル時埋め込みAUTH_URL を使用: {s}");
                s.to_string()
            })
            .or_else(|| std::env::var("AUTH_URL").ok());

        let base_url = match base_url {
            Some(val) => val.trim_end_matches('/').to_string(),
            None => {
                log::error!("AUTH_URL が見つかりません（コンパイル時埋め込み値・実行時環境変数ともに）");
                return None;
            }
        };

        let anon_key = match std::env::var("AUTH_ANON_KEY") {
            Ok(val) => {
                log::debug!("AUTH_ANON_KEY が見つかりました: {}", mask_secret(&val, 8));
                val
            }
            Err(_) => {
                log::error!("AUTH_ANON_KEY が見つかりません");
                return None;
            }
        };

        let service_role_key = match std::env::var("AUTH_SERVICE_ROLE_KEY") {
            Ok(val) => {
                log::debug!(
                    "AUTH_SERVICE_ROLE_KEY が見つかりました: {}",
                    mask_secret(&val, 8)
                );
                val
            }
            Err(_) => {
                log::error!("AUTH_SERVICE_ROLE_KEY が見つかりません");
                return None;
            }
        };

        let session_encryption_key = std::env::var("SESSION_ENCRYPTION_KEY").unwrap_or_else(|_| {
            log::warn!("SESSION_ENCRYPTION_KEY が設定されていないため、デフォルト値を使用（本番環境では必ず設定してください）");
            "default_32_byte_encryption_key_123".to_string()
        });

        log::debug!("AuthConfig::from_env() - 設定の読み込みが完了しました");
        Some(Self {
            base_url,
            anon_key,
            service_role_key,
            session_encryption_key,
        })
    }

    /// 認証設定が有効かどうかを判定
    pub fn is_valid(&self) -> bool {
        !self.base_url.is_empty()
            && !self.anon_key.is_empty()
            && !self.service_role_key.is_empty()
            && !self.session_encryption_key.is_empty()
    }

    /// 設定を検証する
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_valid() {
            return Err("認証設定が不完全です".to_string());
        }

        url::Url::parse(&self.base_url).map_err(|e| format!("AUTH_URL が不正です: {e}"))?;

        // セッション暗号化キーの長さをチェック（最低16バイト）
        if self.session_encryption_key.len() < 16 {
            return Err("セッション暗号化キーは最低16文字以上である必要があります".to_string());
        }

        Ok(())
    }

    /// デバッグ情報を取得
    pub fn get_debug_info(&self) -> HashMap<String, String> {
        let mut info = HashMap::new();
        info.insert("base_url".to_string(), self.base_url.clone());
        info.insert("anon_key".to_string(), mask_secret(&self.anon_key, 8));
        info.insert(
            "session_encryption_key_length".to_string(),
            self.session_encryption_key.len().to_string(),
        );
        info
    }
}

/// メール送信プロバイダーの設定
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// APIキー
    pub api_key: String,
    /// 送信元メールアドレス
    pub from_email: String,
    /// 送信APIのURL
    pub api_url: String,
}

impl EmailConfig {
    /// 環境変数からメール設定を読み込む
    ///
    /// # 戻り値
    /// メール設定、またはAPIキーが無い場合はNone
    pub fn from_env() -> Option<Self> {
        let api_key = match std::env::var("RESEND_API_KEY") {
            Ok(val) => {
                log::debug!("RESEND_API_KEY が見つかりました: {}", mask_secret(&val, 4));
                val
            }
            Err(_) => {
                log::error!("RESEND_API_KEY が見つかりません");
                return None;
            }
        };

        let from_email = std::env::var("FROM_EMAIL")
            .ok()
            .or_else(|| option_env!("EMBEDDED_FROM_EMAIL").map(|s| s.to_string()))
            .unwrap_or_else(|| {
                log::debug!("FROM_EMAIL が設定されていないため、デフォルト値を使用");
                "reminder@example.com".to_string()
            });

        let api_url = std::env::var("EMAIL_API_URL")
            .ok()
            .or_else(|| option_env!("EMBEDDED_EMAIL_API_URL").map(|s| s.to_string()))
            .unwrap_or_else(|| "https://api.resend.com/emails".to_string());

        Some(Self {
            api_key,
            from_email,
            api_url,
        })
    }

    /// メール設定が有効かどうかを判定
    pub fn is_valid(&self) -> bool {
        !self.api_key.is_empty() && !self.from_email.is_empty() && !self.api_url.is_empty()
    }

    /// 設定を検証する
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_valid() {
            return Err("メール設定が不完全です".to_string());
        }
        if !self.from_email.contains('@') {
            return Err(format!("FROM_EMAIL が不正です: {}", self.from_email));
        }
        url::Url::parse(&self.api_url).map_err(|e| format!("EMAIL_API_URL が不正です: {e}"))?;
        Ok(())
    }

    /// デバッグ情報を取得
    pub fn get_debug_info(&self) -> HashMap<String, String> {
        let mut info = HashMap::new();
        info.insert("api_key".to_string(), mask_secret(&self.api_key, 4));
        info.insert("from_email".to_string(), self.from_email.clone());
        info.insert("api_url".to_string(), self.api_url.clone());
        info
    }
}
