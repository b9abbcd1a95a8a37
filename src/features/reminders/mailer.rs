//! トランザクションメール送信（Resend互換API）

use super::models::ReminderEmail;
use crate::shared::api_client::{ApiClient, ApiClientConfig};
use crate::shared::config::EmailConfig;
use crate::shared::errors::AppResult;
use futures::future::BoxFuture;

/// メール送信
///
/// 戻り値はメールAPIのHTTPステータス。2xx以外もエラーにはしない。
/// 通信自体に失敗した場合のみエラーになる。
pub trait Mailer: Send + Sync {
    fn send<'a>(&'a self, email: &'a ReminderEmail) -> BoxFuture<'a, AppResult<u16>>;
}

/// Resend互換のHTTPメール送信
pub struct ResendMailer {
    api: ApiClient,
    api_key: String,
}

impl ResendMailer {
    /// メール設定から作成する
    pub fn new(config: &EmailConfig, timeout_seconds: u64) -> AppResult<Self> {
        let api = ApiClient::new_with_config(ApiClientConfig {
            service_name: "メール送信API".to_string(),
            base_url: config.api_url.clone(),
            timeout_seconds,
        })?;

        Ok(Self {
            api,
            api_key: config.api_key.clone(),
        })
    }
}

impl Mailer for ResendMailer {
    fn send<'a>(&'a self, email: &'a ReminderEmail) -> BoxFuture<'a, AppResult<u16>> {
        Box::pin(async move {
            let bearer = format!("Bearer {}", self.api_key);
            let response = self
                .api
                .post_raw("", email, &[("Authorization", bearer.as_str())])
                .await?;

            if !response.is_success() {
                log::warn!(
                    "メール送信APIがエラーを返しました: status={}, body={}",
                    response.status,
                    response.body
                );
            }

            Ok(response.status)
        })
    }
}
