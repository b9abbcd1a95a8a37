/// 暦日の計算（ベルリン時間）
pub mod dates;

/// 金額の変換と表示
pub mod money;

pub use dates::{
    add_days, add_months, civil_date_at, format_date_de, month_key, month_label_de, now_rfc3339,
    parse_iso_date, parse_month_key, start_of_month, to_iso_date, today_in_berlin,
};
pub use money::{
    cents_to_major, format_major, format_price, parse_price_to_cents, sum_cents, MAX_PRICE_CENTS,
};
