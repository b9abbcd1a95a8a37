/// 環境設定と外部サービス設定
pub mod environment;

/// 起動時の初期化処理
pub mod initialization;

pub use environment::{
    get_database_filename, get_environment, initialize_logging_system,
    load_environment_variables, mask_secret, AuthConfig, EmailConfig, Environment,
    EnvironmentConfig, ServerConfig,
};
pub use initialization::{initialize_application, log_initialization_complete, InitializationResult};
