use super::icons::IconKey;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{format_date_de, format_major, format_price, sum_cents};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 支払いサイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Monthly,
    Yearly,
    CustomDays,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
            BillingCycle::CustomDays => "custom_days",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "monthly" => Ok(BillingCycle::Monthly),
            "yearly" => Ok(BillingCycle::Yearly),
            "custom_days" => Ok(BillingCycle::CustomDays),
            other => Err(AppError::validation(format!(
                "支払いサイクルは'monthly'、'yearly'、'custom_days'のいずれかである必要があります: {other}"
            ))),
        }
    }
}

/// サブスクリプションの状態
///
/// `Canceled` は読み取り専用。どの操作もこの状態へ遷移させない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "active" => Ok(SubscriptionStatus::Active),
            "paused" => Ok(SubscriptionStatus::Paused),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(AppError::Database(format!("不明なステータスです: {other}"))),
        }
    }
}

/// サブスクリプションデータモデル
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub provider: Option<String>,
    pub icon_key: IconKey,
    /// 最小通貨単位（セント）、0以上
    pub price_cents: i64,
    pub currency: String,
    pub cycle: BillingCycle,
    /// cycle が custom_days の場合のみ設定される
    pub custom_days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    /// active の場合は必ず設定される
    pub next_renewal_date: Option<NaiveDate>,
    pub status: SubscriptionStatus,
    pub is_trial: bool,
    pub notes: Option<String>,
    pub created_at: String, // RFC3339形式（ベルリン時間）
    pub updated_at: String, // RFC3339形式（ベルリン時間）
}

impl Subscription {
    /// 費用集計の対象か（アクティブかつ無料お試しではない）
    pub fn is_billable(&self) -> bool {
        self.status == SubscriptionStatus::Active && !self.is_trial
    }

    /// 次回更新日が [start, end) に含まれるか
    pub fn renews_within(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.next_renewal_date
            .map(|date| date >= start && date < end)
            .unwrap_or(false)
    }
}

/// サブスクリプション作成用DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscriptionDto {
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    /// 価格（例: "9.99"）
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default = "default_cycle")]
    pub cycle: BillingCycle,
    #[serde(default)]
    pub custom_days: Option<u32>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub next_renewal_date: Option<String>,
    /// false の場合は一時停止として作成される
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_trial: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_price() -> String {
    "0.00".to_string()
}

fn default_cycle() -> BillingCycle {
    BillingCycle::Monthly
}

fn default_true() -> bool {
    true
}

/// 再開（paused → active）用DTO
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactivateSubscriptionDto {
    /// 保存済みの更新日が無い場合は必須
    #[serde(default)]
    pub next_renewal_date: Option<String>,
}

/// バリデーション済みの新規サブスクリプション
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub name: String,
    pub provider: Option<String>,
    pub icon_key: IconKey,
    pub price_cents: i64,
    pub currency: String,
    pub cycle: BillingCycle,
    pub custom_days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub next_renewal_date: Option<NaiveDate>,
    pub status: SubscriptionStatus,
    pub is_trial: bool,
    pub notes: Option<String>,
}

/// 表示用のサブスクリプション
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub icon_emoji: &'static str,
    /// 例: "9.99 EUR"
    pub price_display: String,
    /// 例: "15.06.25"、未設定なら "—"
    pub renewal_display: String,
}

impl From<Subscription> for SubscriptionView {
    fn from(subscription: Subscription) -> Self {
        let icon_emoji = subscription.icon_key.emoji();
        let price_display = format_price(subscription.price_cents, &subscription.currency);
        let renewal_display = format_date_de(subscription.next_renewal_date);
        Self {
            subscription,
            icon_emoji,
            price_display,
            renewal_display,
        }
    }
}

/// 状態別に分類したサブスクリプション一覧
///
/// 変更操作のたびに全件を再取得して作り直す。
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionListing {
    /// アクティブ（お試しを除く）
    pub active: Vec<SubscriptionView>,
    /// アクティブなお試し
    pub trial: Vec<SubscriptionView>,
    pub paused: Vec<SubscriptionView>,
    pub canceled: Vec<SubscriptionView>,
    /// アクティブ（お試しを除く）の合計（通貨換算なし）
    pub total_active_cents: i64,
    pub total_active_display: String,
    pub count: usize,
}

impl SubscriptionListing {
    /// 次回更新日順に並んだ一覧から分類を作成する
    pub fn from_subscriptions(subscriptions: Vec<Subscription>) -> Self {
        let count = subscriptions.len();
        let total_active_cents = sum_cents(
            subscriptions
                .iter()
                .filter(|s| s.is_billable())
                .map(|s| s.price_cents),
        );

        let mut listing = Self {
            active: Vec::new(),
            trial: Vec::new(),
            paused: Vec::new(),
            canceled: Vec::new(),
            total_active_cents,
            total_active_display: format_major(total_active_cents),
            count,
        };

        for subscription in subscriptions {
            let bucket = match (subscription.status, subscription.is_trial) {
                (SubscriptionStatus::Active, false) => &mut listing.active,
                (SubscriptionStatus::Active, true) => &mut listing.trial,
                (SubscriptionStatus::Paused, _) => &mut listing.paused,
                (SubscriptionStatus::Canceled, _) => &mut listing.canceled,
            };
            bucket.push(subscription.into());
        }

        listing
    }

    /// IDで一覧内のサブスクリプションを探す
    pub fn find(&self, id: &str) -> Option<&Subscription> {
        self.active
            .iter()
            .chain(&self.trial)
            .chain(&self.paused)
            .chain(&self.canceled)
            .map(|view| &view.subscription)
            .find(|s| s.id == id)
    }
}
