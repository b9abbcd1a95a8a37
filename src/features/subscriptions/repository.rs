use super::icons::IconKey;
use super::models::{BillingCycle, NewSubscription, Subscription, SubscriptionStatus};
use crate::shared::errors::AppError;
use crate::shared::utils::{now_rfc3339, parse_iso_date, to_iso_date};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

const SELECT_COLUMNS: &str = "SELECT id, user_id, name, provider, icon_key, price_cents, currency, cycle,
        custom_days, start_date, next_renewal_date, status, is_trial, notes, created_at, updated_at
     FROM subscriptions";

/// データベースの行をそのまま保持する中間表現
struct SubscriptionRow {
    id: String,
    user_id: String,
    name: String,
    provider: Option<String>,
    icon_key: Option<String>,
    price_cents: i64,
    currency: String,
    cycle: String,
    custom_days: Option<i64>,
    start_date: Option<String>,
    next_renewal_date: Option<String>,
    status: String,
    is_trial: i64,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SubscriptionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            provider: row.get(3)?,
            icon_key: row.get(4)?,
            price_cents: row.get(5)?,
            currency: row.get(6)?,
            cycle: row.get(7)?,
            custom_days: row.get(8)?,
            start_date: row.get(9)?,
            next_renewal_date: row.get(10)?,
            status: row.get(11)?,
            is_trial: row.get(12)?,
            notes: row.get(13)?,
            created_at: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = AppError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let custom_days = row
            .custom_days
            .map(|days| {
                u32::try_from(days)
                    .map_err(|_| AppError::Database(format!("不正なcustom_daysです: {days}")))
            })
            .transpose()?;

        Ok(Subscription {
            icon_key: IconKey::from_stored(row.icon_key.as_deref()),
            cycle: BillingCycle::parse(&row.cycle)
                .map_err(|_| AppError::Database(format!("不明な支払いサイクルです: {}", row.cycle)))?,
            status: SubscriptionStatus::parse(&row.status)?,
            start_date: parse_stored_date(row.start_date)?,
            next_renewal_date: parse_stored_date(row.next_renewal_date)?,
            is_trial: row.is_trial != 0,
            custom_days,
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            provider: row.provider,
            price_cents: row.price_cents,
            currency: row.currency,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_stored_date(value: Option<String>) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(|v| parse_iso_date(&v).map_err(|_| AppError::Database(format!("不正な日付です: {v}"))))
        .transpose()
}

/// 行のイテレーターをサブスクリプションのリストに変換する
fn collect_rows<I>(rows: I) -> Result<Vec<Subscription>, AppError>
where
    I: Iterator<Item = rusqlite::Result<SubscriptionRow>>,
{
    rows.map(|row| Subscription::try_from(row?)).collect()
}

/// サブスクリプションを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - 所有ユーザーID
/// * `new` - バリデーション済みの入力
///
/// # 戻り値
/// 作成されたサブスクリプション、または失敗時はエラー
pub fn insert(
    conn: &Connection,
    user_id: &str,
    new: &NewSubscription,
) -> Result<Subscription, AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_rfc3339();

    conn.execute(
        "INSERT INTO subscriptions (id, user_id, name, provider, icon_key, price_cents, currency, cycle,
            custom_days, start_date, next_renewal_date, status, is_trial, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            id,
            user_id,
            new.name,
            new.provider,
            new.icon_key.as_str(),
            new.price_cents,
            new.currency,
            new.cycle.as_str(),
            new.custom_days,
            new.start_date.map(to_iso_date),
            new.next_renewal_date.map(to_iso_date),
            new.status.as_str(),
            new.is_trial as i64,
            new.notes,
            now,
            now
        ],
    )?;

    find_by_id(conn, user_id, &id)
}

/// IDでサブスクリプションを取得する（所有者のみ）
///
/// 他ユーザーの行は存在しないものとして扱う。
pub fn find_by_id(conn: &Connection, user_id: &str, id: &str) -> Result<Subscription, AppError> {
    let row = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1 AND user_id = ?2"),
            params![id, user_id],
            SubscriptionRow::from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::not_found(format!("ID {id} のサブスクリプション"))
            }
            _ => AppError::Database(e.to_string()),
        })?;

    Subscription::try_from(row)
}

/// ユーザーのサブスクリプション一覧を取得する
///
/// 次回更新日の昇順（未設定は末尾）、同日は名前順。
pub fn find_all_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Subscription>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE user_id = ?1
         ORDER BY next_renewal_date IS NULL, next_renewal_date ASC, name ASC"
    ))?;
    let rows = stmt.query_map(params![user_id], SubscriptionRow::from_row)?;

    collect_rows(rows)
}

/// 指定日に更新されるアクティブなサブスクリプションを全ユーザー分取得する
///
/// リマインダージョブ専用。
pub fn find_active_due_on(conn: &Connection, date: NaiveDate) -> Result<Vec<Subscription>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE status = 'active' AND next_renewal_date = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![to_iso_date(date)], SubscriptionRow::from_row)?;

    collect_rows(rows)
}

/// ステータスと次回更新日を更新する
pub fn update_status_and_date(
    conn: &Connection,
    user_id: &str,
    id: &str,
    status: SubscriptionStatus,
    next_renewal_date: Option<NaiveDate>,
) -> Result<Subscription, AppError> {
    let now = now_rfc3339();

    let rows_affected = conn.execute(
        "UPDATE subscriptions SET status = ?1, next_renewal_date = ?2, updated_at = ?3
         WHERE id = ?4 AND user_id = ?5",
        params![
            status.as_str(),
            next_renewal_date.map(to_iso_date),
            now,
            id,
            user_id
        ],
    )?;

    if rows_affected == 0 {
        return Err(AppError::not_found(format!("ID {id} のサブスクリプション")));
    }

    find_by_id(conn, user_id, id)
}

/// サブスクリプションを削除する
///
/// # 戻り値
/// 成功時はOk(())、対象が無い場合はNotFound
pub fn delete(conn: &Connection, user_id: &str, id: &str) -> Result<(), AppError> {
    let rows_affected = conn.execute(
        "DELETE FROM subscriptions WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;

    if rows_affected == 0 {
        return Err(AppError::not_found(format!("ID {id} のサブスクリプション")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::create_in_memory_connection;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_subscription(name: &str, renewal: Option<NaiveDate>, status: SubscriptionStatus) -> NewSubscription {
        NewSubscription {
            name: name.to_string(),
            provider: Some("Netflix".to_string()),
            icon_key: IconKey::Netflix,
            price_cents: 999,
            currency: "EUR".to_string(),
            cycle: BillingCycle::Monthly,
            custom_days: None,
            start_date: None,
            next_renewal_date: renewal,
            status,
            is_trial: false,
            notes: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let conn = create_in_memory_connection().unwrap();
        let new = new_subscription("Netflix", Some(date(2025, 6, 15)), SubscriptionStatus::Active);

        let created = insert(&conn, "user-1", &new).unwrap();
        assert_eq!(created.name, "Netflix");
        assert_eq!(created.user_id, "user-1");
        assert_eq!(created.icon_key, IconKey::Netflix);
        assert_eq!(created.next_renewal_date, Some(date(2025, 6, 15)));
        assert_eq!(created.status, SubscriptionStatus::Active);
        assert!(!created.is_trial);

        let found = find_by_id(&conn, "user-1", &created.id).unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_other_users_rows_are_invisible() {
        let conn = create_in_memory_connection().unwrap();
        let new = new_subscription("Netflix", Some(date(2025, 6, 15)), SubscriptionStatus::Active);
        let created = insert(&conn, "user-1", &new).unwrap();

        let error = find_by_id(&conn, "user-2", &created.id).unwrap_err();
        assert!(matches!(error, AppError::NotFound(_)));
        assert_eq!(
            error.user_message(),
            format!("ID {} のサブスクリプションが見つかりません", created.id)
        );
        assert!(find_all_for_user(&conn, "user-2").unwrap().is_empty());
        assert!(matches!(
            delete(&conn, "user-2", &created.id),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(find_all_for_user(&conn, "user-1").unwrap().len(), 1);
    }

    #[test]
    fn test_listing_order_nulls_last() {
        let conn = create_in_memory_connection().unwrap();
        insert(&conn, "u", &new_subscription("Paused", None, SubscriptionStatus::Paused)).unwrap();
        insert(&conn, "u", &new_subscription("Later", Some(date(2025, 7, 1)), SubscriptionStatus::Active)).unwrap();
        insert(&conn, "u", &new_subscription("Sooner", Some(date(2025, 6, 1)), SubscriptionStatus::Active)).unwrap();

        let names: Vec<String> = find_all_for_user(&conn, "u")
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Sooner", "Later", "Paused"]);
    }

    #[test]
    fn test_find_active_due_on() {
        let conn = create_in_memory_connection().unwrap();
        let due = insert(&conn, "u1", &new_subscription("Due", Some(date(2025, 3, 4)), SubscriptionStatus::Active)).unwrap();
        insert(&conn, "u2", &new_subscription("Next day", Some(date(2025, 3, 5)), SubscriptionStatus::Active)).unwrap();
        insert(&conn, "u2", &new_subscription("Paused", None, SubscriptionStatus::Paused)).unwrap();

        let found = find_active_due_on(&conn, date(2025, 3, 4)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);
    }

    #[test]
    fn test_update_status_and_date() {
        let conn = create_in_memory_connection().unwrap();
        let created = insert(&conn, "u", &new_subscription("Gym", None, SubscriptionStatus::Paused)).unwrap();

        let updated = update_status_and_date(
            &conn,
            "u",
            &created.id,
            SubscriptionStatus::Active,
            Some(date(2025, 9, 1)),
        )
        .unwrap();
        assert_eq!(updated.status, SubscriptionStatus::Active);
        assert_eq!(updated.next_renewal_date, Some(date(2025, 9, 1)));

        // アクティブなのに更新日が無い状態はスキーマで拒否される
        let result = update_status_and_date(&conn, "u", &created.id, SubscriptionStatus::Active, None);
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[test]
    fn test_delete() {
        let conn = create_in_memory_connection().unwrap();
        let created = insert(&conn, "u", &new_subscription("Netflix", Some(date(2025, 6, 15)), SubscriptionStatus::Active)).unwrap();

        assert!(delete(&conn, "u", &created.id).is_ok());
        assert!(find_all_for_user(&conn, "u").unwrap().is_empty());
        assert!(matches!(delete(&conn, "u", &created.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_custom_days_round_trip() {
        let conn = create_in_memory_connection().unwrap();
        let mut new = new_subscription("Gym", Some(date(2025, 6, 15)), SubscriptionStatus::Active);
        new.cycle = BillingCycle::CustomDays;
        new.custom_days = Some(14);
        new.is_trial = true;

        let created = insert(&conn, "u", &new).unwrap();
        assert_eq!(created.cycle, BillingCycle::CustomDays);
        assert_eq!(created.custom_days, Some(14));
        assert!(created.is_trial);
    }
}
