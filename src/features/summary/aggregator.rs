//! 月ごとの費用集計
//!
//! すべての集計は [`month_cost`] を基にする。通貨換算は行わない。

use crate::features::subscriptions::Subscription;
use crate::shared::utils::{
    add_months, cents_to_major, month_key, month_label_de, start_of_month, sum_cents,
};
use chrono::NaiveDate;
use serde::Serialize;

/// 月選択肢の数（当月を含む）
pub const MONTH_OPTION_COUNT: i32 = 12;

/// グラフに表示する月数
pub const CHART_MONTHS: i32 = 6;

/// グラフの最大バー高さ（px）
pub const BAR_MAX_HEIGHT: f64 = 48.0;

/// グラフの最小バー高さ（px）
pub const BAR_MIN_HEIGHT: f64 = 4.0;

/// 月の選択肢
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthOption {
    /// YYYY-MM
    pub value: String,
    /// 例: "September 2025"
    pub label: String,
}

/// グラフの1本分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    /// YYYY-MM
    pub month: String,
    /// 月のみ（例: "09"）
    pub label: String,
    pub cents: i64,
    pub bar_height: f64,
}

/// 指定月に更新される、アクティブかつお試しではないサブスクリプションの合計
///
/// # 引数
/// * `subscriptions` - 対象のサブスクリプション
/// * `month_start` - 対象月の月初日
///
/// # 戻り値
/// 合計金額（セント）
pub fn month_cost(subscriptions: &[Subscription], month_start: NaiveDate) -> i64 {
    let month_start = start_of_month(month_start);
    let next_month = add_months(month_start, 1);

    sum_cents(
        subscriptions
            .iter()
            .filter(|s| s.is_billable())
            .filter(|s| s.renews_within(month_start, next_month))
            .map(|s| s.price_cents),
    )
}

/// 日付に関係なく、アクティブかつお試しではないサブスクリプションの合計
pub fn total_active_cents(subscriptions: &[Subscription]) -> i64 {
    sum_cents(
        subscriptions
            .iter()
            .filter(|s| s.is_billable())
            .map(|s| s.price_cents),
    )
}

/// 当月と過去11か月の選択肢（新しい順）
pub fn month_options(current_month: NaiveDate) -> Vec<MonthOption> {
    (0..MONTH_OPTION_COUNT)
        .map(|offset| {
            let month = add_months(current_month, -offset);
            MonthOption {
                value: month_key(month),
                label: month_label_de(month),
            }
        })
        .collect()
}

/// 直近6か月のグラフデータ（古い順）
pub fn chart(subscriptions: &[Subscription], current_month: NaiveDate) -> Vec<ChartBar> {
    let months: Vec<(NaiveDate, i64)> = (0..CHART_MONTHS)
        .rev()
        .map(|offset| {
            let month = add_months(current_month, -offset);
            (month, month_cost(subscriptions, month))
        })
        .collect();

    let max_value = months
        .iter()
        .map(|(_, cents)| cents_to_major(*cents))
        .fold(0.0_f64, f64::max);

    months
        .into_iter()
        .map(|(month, cents)| ChartBar {
            month: month_key(month),
            label: month.format("%m").to_string(),
            cents,
            bar_height: bar_height(cents_to_major(cents), max_value),
        })
        .collect()
}

/// バーの高さ。0の月も最小高さを保つ
pub fn bar_height(value: f64, max_value: f64) -> f64 {
    (value / max_value.max(1.0) * BAR_MAX_HEIGHT).max(BAR_MIN_HEIGHT)
}

/// 費用集計の対象となるサブスクリプションの通貨一覧（重複なし、昇順）
pub fn billable_currencies(subscriptions: &[Subscription]) -> Vec<String> {
    let mut currencies: Vec<String> = subscriptions
        .iter()
        .filter(|s| s.is_billable())
        .map(|s| s.currency.clone())
        .collect();
    currencies.sort();
    currencies.dedup();
    currencies
}
