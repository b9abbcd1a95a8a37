//! リマインダーメールの件名と本文（ドイツ語）

use crate::features::subscriptions::Subscription;
use crate::shared::utils::{format_major, to_iso_date};

/// 何日前に通知するか
pub const REMINDER_LEAD_DAYS: u64 = 3;

/// 件名（例: "Erinnerung: Netflix in 3 Tagen"）
pub fn subject(name: &str) -> String {
    format!("Erinnerung: {name} in {REMINDER_LEAD_DAYS} Tagen")
}

/// HTML本文
pub fn html_body(subscription: &Subscription) -> String {
    let renewal = subscription
        .next_renewal_date
        .map(to_iso_date)
        .unwrap_or_default();

    format!(
        "<p>Hallo,</p>\n\
         <p>dein Abo <b>{name}</b> verlängert sich am <b>{renewal}</b>.</p>\n\
         <p>Betrag: <b>{price} {currency}</b></p>\n\
         <p>— Deine AboApp</p>",
        name = escape_html(&subscription.name),
        price = format_major(subscription.price_cents),
        currency = escape_html(&subscription.currency),
    )
}

/// HTMLの特殊文字をエスケープする
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
