/// リマインダー機能モジュール
///
/// 外部スケジューラーから1日1回呼び出され、3日後に更新されるサブスクリプションの
/// 所有者へメールで通知します。同じ対象日への二重送信は送信履歴で防ぎます。
pub mod mailer;
pub mod models;
pub mod repository;
pub mod service;
pub mod template;

pub use mailer::{Mailer, ResendMailer};
pub use models::{ReminderEmail, ReminderReport, SentEntry};
pub use service::{reminder_target_date, ReminderDispatcher};
