use super::icons::infer_icon_key;
use super::models::{
    BillingCycle, CreateSubscriptionDto, NewSubscription, ReactivateSubscriptionDto,
    SubscriptionListing, SubscriptionStatus,
};
use super::repository;
use crate::features::auth::models::Session;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{format_major, parse_iso_date, parse_price_to_cents, MAX_PRICE_CENTS};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;

/// 名前の最大文字数
pub const MAX_NAME_LENGTH: usize = 100;

/// 通貨コードが未指定の場合の既定値
pub const DEFAULT_CURRENCY: &str = "EUR";

static CURRENCY_PATTERN: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[A-Z]{3}$"));

/// ログインユーザーのサブスクリプション一覧を取得する
pub fn list(conn: &Connection, session: &Session) -> AppResult<SubscriptionListing> {
    let subscriptions = repository::find_all_for_user(conn, &session.user_id)?;
    Ok(SubscriptionListing::from_subscriptions(subscriptions))
}

/// サブスクリプションを作成し、再取得した一覧を返す
///
/// # 引数
/// * `conn` - データベース接続
/// * `session` - ログインセッション
/// * `dto` - 作成用DTO
///
/// # 戻り値
/// 作成後の一覧、またはバリデーション・保存エラー
pub fn create(
    conn: &Connection,
    session: &Session,
    dto: CreateSubscriptionDto,
) -> AppResult<SubscriptionListing> {
    let new = validate_create_dto(dto)?;
    let created = repository::insert(conn, &session.user_id, &new)?;

    log::info!(
        "サブスクリプションを作成しました: id={}, status={}, icon={}",
        created.id,
        created.status.as_str(),
        created.icon_key.as_str()
    );

    list(conn, session)
}

/// サブスクリプションを削除し、再取得した一覧を返す
pub fn delete(conn: &Connection, session: &Session, id: &str) -> AppResult<SubscriptionListing> {
    repository::delete(conn, &session.user_id, id)?;

    log::info!("サブスクリプションを削除しました: id={id}");

    list(conn, session)
}

/// 一時停止中のサブスクリプションを再開し、再取得した一覧を返す
///
/// 保存済みの更新日があればそれを使う。無い場合は `dto.next_renewal_date` が必須で、
/// 指定が無ければ書き込み前にバリデーションエラーを返す。
pub fn reactivate(
    conn: &Connection,
    session: &Session,
    id: &str,
    dto: ReactivateSubscriptionDto,
) -> AppResult<SubscriptionListing> {
    let existing = repository::find_by_id(conn, &session.user_id, id)?;

    if existing.status != SubscriptionStatus::Paused {
        return Err(AppError::validation(format!(
            "一時停止中のサブスクリプションのみ再開できます: status={}",
            existing.status.as_str()
        )));
    }

    let supplied = parse_optional_date(dto.next_renewal_date.as_deref(), "次回更新日")?;
    let renewal_date = existing.next_renewal_date.or(supplied).ok_or_else(|| {
        AppError::validation("再開するには次回更新日を指定してください")
    })?;

    repository::update_status_and_date(
        conn,
        &session.user_id,
        id,
        SubscriptionStatus::Active,
        Some(renewal_date),
    )?;

    log::info!("サブスクリプションを再開しました: id={id}, next_renewal_date={renewal_date}");

    list(conn, session)
}

/// 作成用DTOを検証し、保存可能な形に正規化する
pub fn validate_create_dto(dto: CreateSubscriptionDto) -> AppResult<NewSubscription> {
    let name = dto.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::validation("サービス名は必須です"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "サービス名は{MAX_NAME_LENGTH}文字以内で入力してください"
        )));
    }

    let provider = non_empty(dto.provider);

    let price_cents = parse_price_to_cents(&dto.price);
    if price_cents < 0 {
        return Err(AppError::validation("金額は0以上である必要があります"));
    }
    if price_cents > MAX_PRICE_CENTS {
        return Err(AppError::validation(format!(
            "金額は{}以下である必要があります",
            format_major(MAX_PRICE_CENTS)
        )));
    }

    let currency = match non_empty(dto.currency) {
        Some(code) => code.to_uppercase(),
        None => DEFAULT_CURRENCY.to_string(),
    };
    let pattern = CURRENCY_PATTERN
        .as_ref()
        .map_err(|e| AppError::configuration(format!("正規表現エラー: {e}")))?;
    if !pattern.is_match(&currency) {
        return Err(AppError::validation(format!(
            "通貨コードは3文字の英字である必要があります: {currency}"
        )));
    }

    let custom_days = match dto.cycle {
        BillingCycle::CustomDays => match dto.custom_days {
            Some(days) if days > 0 => Some(days),
            _ => {
                return Err(AppError::validation(
                    "custom_daysサイクルには1以上の日数が必要です",
                ))
            }
        },
        BillingCycle::Monthly | BillingCycle::Yearly => None,
    };

    let start_date = parse_optional_date(dto.start_date.as_deref(), "開始日")?;
    let renewal_date = parse_optional_date(dto.next_renewal_date.as_deref(), "次回更新日")?;

    let (status, next_renewal_date) = if dto.is_active {
        let date = renewal_date
            .ok_or_else(|| AppError::validation("アクティブなサブスクリプションには次回更新日が必要です"))?;
        (SubscriptionStatus::Active, Some(date))
    } else {
        // 一時停止で作成する場合、更新日は保存しない
        (SubscriptionStatus::Paused, None)
    };

    Ok(NewSubscription {
        icon_key: infer_icon_key(provider.as_deref()),
        name,
        provider,
        price_cents,
        currency,
        cycle: dto.cycle,
        custom_days,
        start_date,
        next_renewal_date,
        status,
        is_trial: dto.is_trial,
        notes: non_empty(dto.notes),
    })
}

/// 空文字列の日付は未指定として扱う
fn parse_optional_date(value: Option<&str>, label: &str) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_iso_date(v)
            .map(Some)
            .map_err(|_| AppError::validation(format!("{label}の形式が正しくありません: {v}"))),
        None => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
