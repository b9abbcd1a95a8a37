/// サブスクリプション機能モジュール
///
/// このモジュールは、サブスクリプション管理に関連するすべての機能を提供します：
/// - サブスクリプションの作成、一覧取得、削除
/// - 一時停止中のサブスクリプションの再開
/// - プロバイダー名からのアイコン推定
pub mod icons;
pub mod models;
pub mod repository;
pub mod service;

// 公開インターフェース
pub use icons::{infer_icon_key, IconKey};

pub use models::{
    BillingCycle, CreateSubscriptionDto, NewSubscription, ReactivateSubscriptionDto,
    Subscription, SubscriptionListing, SubscriptionStatus, SubscriptionView,
};
