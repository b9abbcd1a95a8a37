use super::mailer::Mailer;
use super::models::{ReminderEmail, ReminderReport, SentEntry};
use super::repository;
use super::template::{html_body, subject, REMINDER_LEAD_DAYS};
use crate::features::auth::AuthProvider;
use crate::features::subscriptions::repository as subscription_repository;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{add_days, to_iso_date};
use chrono::NaiveDate;
use futures::future::join_all;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// リマインダー対象の更新日（今日の3日後）
pub fn reminder_target_date(today: NaiveDate) -> NaiveDate {
    add_days(today, REMINDER_LEAD_DAYS)
}

/// リマインダーの送信設定
pub struct ReminderDispatcher<'a> {
    pub db: &'a Arc<Mutex<Connection>>,
    pub provider: &'a dyn AuthProvider,
    pub mailer: &'a dyn Mailer,
    /// 送信元アドレス
    pub from_email: &'a str,
}

impl ReminderDispatcher<'_> {
    /// 指定日の3日後に更新されるサブスクリプションへリマインダーを送信する
    ///
    /// 送信は1件ずつ順番に行い、送信や履歴の記録に失敗しても残りの送信を続ける。
    /// メールアドレスを解決できないユーザーの分は送信しない。
    ///
    /// # 引数
    /// * `today` - ベルリン時間での今日
    ///
    /// # 戻り値
    /// 送信結果、または対象の取得に失敗した場合はエラー
    pub async fn run(&self, today: NaiveDate) -> AppResult<ReminderReport> {
        let target = reminder_target_date(today);
        log::info!("リマインダージョブを開始します: today={today}, target={target}");

        let (subscriptions, already_sent) = {
            let conn = lock(self.db)?;
            (
                subscription_repository::find_active_due_on(&conn, target)?,
                repository::sent_ids_for(&conn, target)?,
            )
        };

        let user_ids: BTreeSet<&str> = subscriptions
            .iter()
            .filter(|s| !already_sent.contains(&s.id))
            .map(|s| s.user_id.as_str())
            .collect();
        let emails = self.resolve_emails(user_ids).await;

        let mut sent = Vec::new();
        for subscription in &subscriptions {
            if already_sent.contains(&subscription.id) {
                log::debug!("送信済みのためスキップします: sub_id={}", subscription.id);
                sent.push(SentEntry::already_sent(&subscription.id));
                continue;
            }

            let Some(to) = emails.get(subscription.user_id.as_str()) else {
                continue;
            };

            let email = ReminderEmail {
                from: self.from_email.to_string(),
                to: to.clone(),
                subject: subject(&subscription.name),
                html: html_body(subscription),
            };

            match self.mailer.send(&email).await {
                Ok(status) => {
                    log::info!(
                        "リマインダーを送信しました: sub_id={}, to={}, status={status}",
                        subscription.id,
                        fingerprint(to)
                    );
                    let mut entry = SentEntry::delivered(&subscription.id, status);
                    if (200..300).contains(&status) {
                        if let Err(e) = self.record_sent(&subscription.id, target, status) {
                            log::error!(
                                "送信履歴の記録に失敗しました: sub_id={}, error={e}",
                                subscription.id
                            );
                            entry = entry.with_error(e.user_message());
                        }
                    }
                    sent.push(entry);
                }
                Err(e) => {
                    log::error!(
                        "リマインダーの送信に失敗しました: sub_id={}, error={e}",
                        subscription.id
                    );
                    sent.push(SentEntry::failed(&subscription.id, e.user_message()));
                }
            }
        }

        log::info!(
            "リマインダージョブが完了しました: target={target}, count={}, attempted={}",
            subscriptions.len(),
            sent.len()
        );

        Ok(ReminderReport {
            ok: true,
            target: to_iso_date(target),
            count: subscriptions.len(),
            sent,
        })
    }

    /// 受け付けられた送信を履歴に記録する
    fn record_sent(&self, subscription_id: &str, target: NaiveDate, status: u16) -> AppResult<()> {
        let conn = lock(self.db)?;
        repository::record_sent(&conn, subscription_id, target, status)
    }

    /// ユーザーIDをメールアドレスに解決する
    ///
    /// 取得に失敗したユーザー、メールアドレスが無いユーザーは結果に含めない。
    async fn resolve_emails<'u>(&self, user_ids: BTreeSet<&'u str>) -> HashMap<&'u str, String> {
        let lookups = user_ids.into_iter().map(|user_id| async move {
            match self.provider.lookup_email(user_id).await {
                Ok(Some(email)) => Some((user_id, email)),
                Ok(None) => {
                    log::warn!("メールアドレスが登録されていません: user_id={user_id}");
                    None
                }
                Err(e) => {
                    log::warn!("メールアドレスの取得に失敗しました: user_id={user_id}, error={e}");
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }
}

fn lock(db: &Arc<Mutex<Connection>>) -> AppResult<MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|e| AppError::Database(format!("データベースロックエラー: {e}")))
}

/// ログ用のメールアドレス識別子（SHA-256の先頭12桁）
fn fingerprint(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}
