use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use chrono_tz::Europe::Berlin;
use chrono_tz::Tz;

/// 日付計算の基準となる暦のタイムゾーン
pub const CIVIL_TIMEZONE: Tz = Berlin;

const MONTH_NAMES_DE: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// 現在時刻をベルリン時間のRFC3339文字列で取得する
pub fn now_rfc3339() -> String {
    Utc::now().with_timezone(&CIVIL_TIMEZONE).to_rfc3339()
}

/// ベルリン時間での今日の日付を取得する
pub fn today_in_berlin() -> NaiveDate {
    civil_date_at(Utc::now())
}

/// 指定したUTC時刻をベルリン時間の暦日に変換する
pub fn civil_date_at(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&CIVIL_TIMEZONE).date_naive()
}

/// 日付に日数を加算する（月・年の繰り上がりを含む）
pub fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// YYYY-MM-DD形式の文字列を日付に変換する
pub fn parse_iso_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("日付はYYYY-MM-DD形式で入力してください: {value}")))
}

/// 日付をYYYY-MM-DD形式に変換する
pub fn to_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// 月初日を取得する
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// 月初日に月数を加減算する
pub fn add_months(month_start: NaiveDate, delta: i32) -> NaiveDate {
    let month_start = start_of_month(month_start);
    let shifted = if delta >= 0 {
        month_start.checked_add_months(Months::new(delta.unsigned_abs()))
    } else {
        month_start.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    shifted.unwrap_or(month_start)
}

/// 月をYYYY-MM形式のキーに変換する
pub fn month_key(month_start: NaiveDate) -> String {
    month_start.format("%Y-%m").to_string()
}

/// YYYY-MM（またはYYYY-MM-DD）形式の文字列から月初日を取得する
pub fn parse_month_key(value: &str) -> AppResult<NaiveDate> {
    let value = value.trim();
    let candidate = if value.len() == 7 {
        format!("{value}-01")
    } else {
        value.to_string()
    };

    NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
        .map(start_of_month)
        .map_err(|_| AppError::validation(format!("月はYYYY-MM形式で指定してください: {value}")))
}

/// 日付をドイツ式の短い形式（DD.MM.YY）に変換する。日付が無い場合は「—」
pub fn format_date_de(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%d.%m.%y").to_string(),
        None => "—".to_string(),
    }
}

/// 月のドイツ語ラベル（例: "September 2025"）を取得する
pub fn month_label_de(month_start: NaiveDate) -> String {
    let name = MONTH_NAMES_DE[month_start.month0() as usize];
    format!("{name} {}", month_start.year())
}
