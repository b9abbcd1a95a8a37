/// 機能別モジュール
///
/// このモジュールは、アプリケーションの機能を機能別に整理したモジュール群を提供します。
/// 各機能モジュールは、その機能に関連するすべてのコード（モデル、データベース操作、サービス）
/// を含む自己完結型のユニットです。
pub mod auth;
pub mod reminders;
pub mod server;
pub mod subscriptions;
pub mod summary;

#[cfg(test)]
mod integration_tests;
