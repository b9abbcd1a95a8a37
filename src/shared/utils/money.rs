//! 金額（最小通貨単位）の変換と表示

/// セントを主通貨単位に変換する
pub fn cents_to_major(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// セントを小数点以下2桁の文字列に変換する（例: 999 -> "9.99"）
pub fn format_major(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// 通貨コード付きの金額表示（例: "9.99 EUR"）
pub fn format_price(cents: i64, currency: &str) -> String {
    format!("{} {currency}", format_major(cents))
}

/// 1件あたりの価格上限（セント）
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// 入力された価格文字列をセントに変換する
///
/// 小数点にはカンマも使用できる。先頭の数値部分だけを読み取り（"9.99 €" -> 999）、
/// 数値として解釈できない入力は0になる。
pub fn parse_price_to_cents(input: &str) -> i64 {
    let normalized = input.trim().replace(',', ".");
    match leading_number(&normalized) {
        Some(value) => (value * 100.0).round() as i64,
        None => 0,
    }
}

/// 文字列先頭から解釈できる最長の有限な数値を取り出す
fn leading_number(input: &str) -> Option<f64> {
    let prefix_len = input
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E')))
        .unwrap_or(input.len());
    let candidate = &input[..prefix_len];

    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// 金額を合計する（i64の範囲を超える場合は上限で止める）
pub fn sum_cents<I: IntoIterator<Item = i64>>(amounts: I) -> i64 {
    amounts.into_iter().fold(0, i64::saturating_add)
}
