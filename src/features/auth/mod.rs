/// 認証機能のモジュール
///
/// メールで届くワンタイムコードによるサインインと、暗号化トークンによるセッション管理を提供します。
pub mod client;
pub mod models;
pub mod service;
pub mod session;

pub use client::{AuthProvider, HttpAuthProvider};
pub use models::*;
pub use service::AuthService;
pub use session::SessionManager;
