//! ワンタイムコード認証プロバイダーとの通信
//!
//! プロバイダーはGoTrue互換のREST APIを想定する。

use crate::features::auth::models::{AuthError, User};
use crate::shared::api_client::{extract_error_message, ApiClient, ApiClientConfig, RawResponse};
use crate::shared::config::AuthConfig;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;

/// 認証プロバイダー
///
/// ホスト型の認証サービスを抽象化する。テストでは偽の実装に差し替える。
pub trait AuthProvider: Send + Sync {
    /// メールアドレスにワンタイムコードを送信する
    fn send_code<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<(), AuthError>>;

    /// ワンタイムコードを検証し、ユーザーを返す
    fn verify_code<'a>(
        &'a self,
        email: &'a str,
        code: &'a str,
    ) -> BoxFuture<'a, Result<User, AuthError>>;

    /// ユーザーIDからメールアドレスを取得する（管理API）
    ///
    /// ユーザーが存在してもメールアドレスが無い場合は `Ok(None)`。
    fn lookup_email<'a>(&'a self, user_id: &'a str)
        -> BoxFuture<'a, Result<Option<String>, AuthError>>;
}

/// コード検証APIのレスポンス
#[derive(Debug, Deserialize)]
struct VerifyResponse {
    user: User,
}

/// HTTP経由の認証プロバイダー実装
pub struct HttpAuthProvider {
    api: ApiClient,
    anon_key: String,
    service_role_key: String,
}

impl HttpAuthProvider {
    /// 認証設定からプロバイダーを作成する
    pub fn new(config: &AuthConfig, timeout_seconds: u64) -> Result<Self, AuthError> {
        let api = ApiClient::new_with_config(ApiClientConfig {
            service_name: "認証プロバイダー".to_string(),
            base_url: config.base_url.clone(),
            timeout_seconds,
        })
        .map_err(|e| AuthError::ConfigError(e.to_string()))?;

        Ok(Self {
            api,
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn anon_headers(&self) -> [(&str, &str); 1] {
        [("apikey", self.anon_key.as_str())]
    }
}

impl AuthProvider for HttpAuthProvider {
    fn send_code<'a>(&'a self, email: &'a str) -> BoxFuture<'a, Result<(), AuthError>> {
        Box::pin(async move {
            let body = json!({ "email": email, "create_user": true });
            let response = self
                .api
                .post_raw("/auth/v1/otp", &body, &self.anon_headers())
                .await
                .map_err(|e| AuthError::NetworkError(e.user_message()))?;

            ensure_success(&response, AuthError::ProviderError)?;
            log::info!("ワンタイムコードを送信しました");
            Ok(())
        })
    }

    fn verify_code<'a>(
        &'a self,
        email: &'a str,
        code: &'a str,
    ) -> BoxFuture<'a, Result<User, AuthError>> {
        Box::pin(async move {
            let body = json!({ "email": email, "token": code, "type": "email" });
            let response = self
                .api
                .post_raw("/auth/v1/verify", &body, &self.anon_headers())
                .await
                .map_err(|e| AuthError::NetworkError(e.user_message()))?;

            ensure_success(&response, AuthError::InvalidCode)?;

            let parsed: VerifyResponse = serde_json::from_str(&response.body)
                .map_err(|e| AuthError::ProviderError(format!("レスポンス解析エラー: {e}")))?;

            log::info!("ワンタイムコードを検証しました: user_id={}", parsed.user.id);
            Ok(parsed.user)
        })
    }

    fn lookup_email<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, AuthError>> {
        Box::pin(async move {
            let bearer = format!("Bearer {}", self.service_role_key);
            let headers = [
                ("apikey", self.service_role_key.as_str()),
                ("Authorization", bearer.as_str()),
            ];

            let user: User = self
                .api
                .get_json(&format!("/auth/v1/admin/users/{user_id}"), &headers)
                .await
                .map_err(|e| AuthError::ProviderError(e.user_message()))?;

            Ok(user.email.filter(|email| !email.trim().is_empty()))
        })
    }
}

/// 2xx以外のレスポンスをエラーに変換する
///
/// 5xxはネットワーク側の障害、それ以外は `client_error` で包む。
fn ensure_success(
    response: &RawResponse,
    client_error: fn(String) -> AuthError,
) -> Result<(), AuthError> {
    if response.is_success() {
        return Ok(());
    }

    let message = extract_error_message(&response.body)
        .unwrap_or_else(|| format!("status={}", response.status));
    log::warn!(
        "認証プロバイダーがリクエストを拒否しました: status={}, message={message}",
        response.status
    );

    if response.status >= 500 {
        Err(AuthError::NetworkError(message))
    } else {
        Err(client_error(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_ensure_success() {
        assert!(ensure_success(&raw(200, "{}"), AuthError::InvalidCode).is_ok());

        let result = ensure_success(
            &raw(403, r#"{"msg":"Token has expired or is invalid"}"#),
            AuthError::InvalidCode,
        );
        assert!(
            matches!(result, Err(AuthError::InvalidCode(msg)) if msg == "Token has expired or is invalid")
        );

        let result = ensure_success(&raw(503, ""), AuthError::InvalidCode);
        assert!(matches!(result, Err(AuthError::NetworkError(msg)) if msg == "status=503"));
    }

    #[test]
    fn test_verify_response_parsing() {
        let body = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "user": {"id": "7c0e", "email": "anna@example.com", "aud": "authenticated"}
        }"#;
        let parsed: VerifyResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.user.id, "7c0e");
        assert_eq!(parsed.user.email.as_deref(), Some("anna@example.com"));
    }

    #[test]
    fn test_provider_construction() {
        let config = AuthConfig {
            base_url: "https://auth.example.com".to_string(),
            anon_key: "anon-key".to_string(),
            service_role_key: "service-key".to_string(),
            session_encryption_key: "0123456789abcdef".to_string(),
        };
        let provider = HttpAuthProvider::new(&config, 5).unwrap();
        assert_eq!(provider.anon_headers(), [("apikey", "anon-key")]);
    }
}
