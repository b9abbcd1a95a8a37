//! 汎用APIクライアント
//!
//! 外部サービス（認証プロバイダー、メール送信API）とのJSON通信を行う。
//! リトライは行わない。失敗した操作は呼び出し側が再実行する。
use crate::shared::errors::AppError;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// APIクライアント設定
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// 外部サービス名（ログ・エラーメッセージ用）
    pub service_name: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// 生のHTTPレスポンス（ステータスと本文）
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    /// 2xxかどうか
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 汎用APIクライアント
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
}

impl ApiClient {
    /// 設定を指定してAPIクライアントを作成
    pub fn new_with_config(config: ApiClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self { client, config })
    }

    /// エンドポイントの完全なURLを組み立てる
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.is_empty() {
            return self.config.base_url.clone();
        }
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// GETリクエストを送信し、JSONレスポンスを返す
    pub async fn get_json<T>(&self, endpoint: &str, headers: &[(&str, &str)]) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        info!("GETリクエスト送信: service={}, endpoint={endpoint}", self.config.service_name);

        let request = with_headers(self.client.get(self.url_for(endpoint)), headers);
        self.send_json(request, "GET", endpoint).await
    }

    /// POSTリクエストを送信し、JSONレスポンスを返す
    pub async fn post_json<B, T>(
        &self,
        endpoint: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<T, AppError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        info!("POSTリクエスト送信: service={}, endpoint={endpoint}", self.config.service_name);

        let request = with_headers(self.client.post(self.url_for(endpoint)).json(body), headers);
        self.send_json(request, "POST", endpoint).await
    }

    /// POSTリクエストを送信し、ステータスを問わず生のレスポンスを返す
    ///
    /// 2xx以外もエラーにしない。通信自体の失敗のみエラーになる。
    pub async fn post_raw<B>(
        &self,
        endpoint: &str,
        body: &B,
        headers: &[(&str, &str)],
    ) -> Result<RawResponse, AppError>
    where
        B: Serialize,
    {
        let request = with_headers(self.client.post(self.url_for(endpoint)).json(body), headers);
        let response = request.send().await.map_err(|e| {
            AppError::ExternalService(format!(
                "{}への接続に失敗しました: {e}",
                self.config.service_name
            ))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!(
            "POSTレスポンス受信: service={}, endpoint={endpoint}, status={status}",
            self.config.service_name
        );

        Ok(RawResponse { status, body })
    }

    /// リクエストを送信し、成功時はJSONを解析する
    async fn send_json<T>(
        &self,
        request: RequestBuilder,
        method: &str,
        endpoint: &str,
    ) -> Result<T, AppError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await.map_err(|e| {
            AppError::ExternalService(format!(
                "{}への接続に失敗しました: {e}",
                self.config.service_name
            ))
        })?;

        if !response.status().is_success() {
            return Err(self.handle_error_response(response).await);
        }

        let result: T = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("レスポンス解析エラー: {e}")))?;

        info!(
            "{method}リクエスト成功: service={}, endpoint={endpoint}",
            self.config.service_name
        );
        Ok(result)
    }

    /// エラーレスポンスからメッセージを取り出してエラーに変換する
    async fn handle_error_response(&self, response: Response) -> AppError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "レスポンス読み取り失敗".to_string());

        let message = extract_error_message(&text).unwrap_or_else(|| match status {
            400 => "リクエストの形式が正しくありません".to_string(),
            401 | 403 => "認証に失敗しました".to_string(),
            404 => "指定されたリソースが見つかりません".to_string(),
            429 => "リクエストが多すぎます。しばらく待ってから再試行してください".to_string(),
            _ => format!("不明なエラーが発生しました (status={status})"),
        });

        warn!(
            "{}からエラーレスポンス: status={status}, message={message}",
            self.config.service_name
        );

        AppError::ExternalService(message)
    }
}

/// ヘッダーをまとめて付与する
fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request
}

/// 外部サービスのJSONエラー本文からメッセージを取り出す
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new_with_config(ApiClientConfig {
            service_name: "test".to_string(),
            base_url: base_url.to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_url_for() {
        let api = client("https://auth.example.com/");
        assert_eq!(
            api.url_for("/auth/v1/otp"),
            "https://auth.example.com/auth/v1/otp"
        );
        assert_eq!(api.url_for(""), "https://auth.example.com/");

        let api = client("https://api.resend.com/emails");
        assert_eq!(api.url_for(""), "https://api.resend.com/emails");
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"msg":"Token has expired or is invalid"}"#),
            Some("Token has expired or is invalid".to_string())
        );
        assert_eq!(
            extract_error_message(r#"{"error":"invalid_grant","error_description":"bad code"}"#),
            Some("bad code".to_string())
        );
        assert_eq!(extract_error_message("not json"), None);
        assert_eq!(extract_error_message(r#"{"code":400}"#), None);
    }

    #[test]
    fn test_raw_response_is_success() {
        let ok = RawResponse {
            status: 200,
            body: String::new(),
        };
        let failed = RawResponse {
            status: 422,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!failed.is_success());
    }
}
