use crate::shared::errors::AppError;
use crate::shared::utils::{now_rfc3339, to_iso_date};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::HashSet;

/// 対象日に送信済みのサブスクリプションIDを取得する
pub fn sent_ids_for(conn: &Connection, target: NaiveDate) -> Result<HashSet<String>, AppError> {
    let mut stmt =
        conn.prepare("SELECT subscription_id FROM reminder_log WHERE target_date = ?1")?;
    let rows = stmt.query_map(params![to_iso_date(target)], |row| row.get::<_, String>(0))?;

    rows.collect::<Result<HashSet<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// 送信履歴を記録する
///
/// メールAPIが受け付けた（2xx）送信のみ記録する。
pub fn record_sent(
    conn: &Connection,
    subscription_id: &str,
    target: NaiveDate,
    status: u16,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT OR REPLACE INTO reminder_log (subscription_id, target_date, status, sent_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![subscription_id, to_iso_date(target), status, now_rfc3339()],
    )?;
    Ok(())
}
