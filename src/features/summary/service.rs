use super::aggregator::{
    billable_currencies, chart, month_cost, month_options, total_active_cents, ChartBar,
    MonthOption,
};
use crate::features::auth::models::Session;
use crate::features::subscriptions::repository;
use crate::shared::errors::AppResult;
use crate::shared::utils::{format_major, month_key, month_label_de, parse_month_key, start_of_month};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

/// 1か月分の合計
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    /// YYYY-MM
    pub month: String,
    pub label: String,
    pub cents: i64,
    /// 例: "9.99"
    pub display: String,
}

impl MonthTotal {
    fn new(month_start: NaiveDate, cents: i64) -> Self {
        Self {
            month: month_key(month_start),
            label: month_label_de(month_start),
            cents,
            display: format_major(cents),
        }
    }
}

/// 費用サマリー
#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    pub current_month: MonthTotal,
    pub selected_month: MonthTotal,
    pub month_options: Vec<MonthOption>,
    pub chart: Vec<ChartBar>,
    pub total_active_cents: i64,
    pub total_active_display: String,
    /// 複数通貨が合算されている場合はtrue（換算は行っていない）
    pub mixed_currency: bool,
    pub currencies: Vec<String>,
}

/// ログインユーザーの費用サマリーを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `session` - ログインセッション
/// * `selected` - 選択月（YYYY-MM）、未指定なら当月
/// * `today` - ベルリン時間での今日
pub fn summarize(
    conn: &Connection,
    session: &Session,
    selected: Option<&str>,
    today: NaiveDate,
) -> AppResult<CostSummary> {
    let current = start_of_month(today);
    let selected = match selected.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => parse_month_key(value)?,
        None => current,
    };

    let subscriptions = repository::find_all_for_user(conn, &session.user_id)?;
    let currencies = billable_currencies(&subscriptions);
    let total = total_active_cents(&subscriptions);

    if currencies.len() > 1 {
        log::debug!(
            "複数通貨を換算せずに合算しています: user_id={}, currencies={:?}",
            session.user_id,
            currencies
        );
    }

    Ok(CostSummary {
        current_month: MonthTotal::new(current, month_cost(&subscriptions, current)),
        selected_month: MonthTotal::new(selected, month_cost(&subscriptions, selected)),
        month_options: month_options(current),
        chart: chart(&subscriptions, current),
        total_active_cents: total,
        total_active_display: format_major(total),
        mixed_currency: currencies.len() > 1,
        currencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::subscriptions::{service, BillingCycle, CreateSubscriptionDto};
    use crate::shared::database::create_in_memory_connection;

    fn session() -> Session {
        Session {
            id: "s".to_string(),
            user_id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            expires_at: "2099-01-01T00:00:00+01:00".to_string(),
            created_at: "2025-01-01T00:00:00+01:00".to_string(),
        }
    }

    fn create(conn: &Connection, name: &str, price: &str, currency: &str, renewal: &str) {
        service::create(
            conn,
            &session(),
            CreateSubscriptionDto {
                name: name.to_string(),
                provider: None,
                price: price.to_string(),
                currency: Some(currency.to_string()),
                cycle: BillingCycle::Monthly,
                custom_days: None,
                start_date: None,
                next_renewal_date: Some(renewal.to_string()),
                is_active: true,
                is_trial: false,
                notes: None,
            },
        )
        .unwrap();
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    #[test]
    fn test_summary_selected_month() {
        let conn = create_in_memory_connection().unwrap();
        create(&conn, "Netflix", "9.99", "EUR", "2025-06-15");

        let summary = summarize(&conn, &session(), None, today()).unwrap();
        assert_eq!(summary.current_month.month, "2025-06");
        assert_eq!(summary.current_month.display, "9.99");
        assert_eq!(summary.selected_month.display, "9.99");
        assert_eq!(summary.month_options.len(), 12);
        assert_eq!(summary.chart.len(), 6);
        assert!(!summary.mixed_currency);
        assert_eq!(summary.currencies, vec!["EUR"]);

        let summary = summarize(&conn, &session(), Some("2025-07"), today()).unwrap();
        assert_eq!(summary.selected_month.month, "2025-07");
        assert_eq!(summary.selected_month.label, "Juli 2025");
        assert_eq!(summary.selected_month.display, "0.00");
        assert_eq!(summary.current_month.display, "9.99");
    }

    #[test]
    fn test_summary_flags_mixed_currency() {
        let conn = create_in_memory_connection().unwrap();
        create(&conn, "Netflix", "9.99", "EUR", "2025-06-15");
        create(&conn, "HBO", "5.00", "usd", "2025-06-16");

        let summary = summarize(&conn, &session(), None, today()).unwrap();
        assert_eq!(summary.current_month.cents, 1499);
        assert!(summary.mixed_currency);
        assert_eq!(summary.currencies, vec!["EUR", "USD"]);
        assert_eq!(summary.total_active_display, "14.99");
    }

    #[test]
    fn test_summary_rejects_invalid_month() {
        let conn = create_in_memory_connection().unwrap();
        assert!(summarize(&conn, &session(), Some("June"), today()).is_err());
    }
}
