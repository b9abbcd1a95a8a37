use super::response::{error_response, json_response, not_found};
use crate::features::auth::{SendCodeRequest, Session, SessionUser, VerifyCodeRequest};
use crate::features::reminders::ReminderDispatcher;
use crate::features::subscriptions::{service as subscriptions, CreateSubscriptionDto, ReactivateSubscriptionDto};
use crate::features::summary;
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::MutexGuard;
use url::Url;

/// ルーティング対象のリクエスト
///
/// hyperのリクエストから必要な部分だけを取り出したもの。
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// `Authorization: Bearer` のトークン
    pub bearer: Option<String>,
    pub body: Bytes,
}

impl ApiRequest {
    /// テストや内部呼び出し用の簡易コンストラクタ
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            bearer: None,
            body: Bytes::new(),
        }
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self
    }

    /// クエリパラメータの値を取得する
    fn query_param(&self, key: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        let url = Url::parse(&format!("http://localhost/?{query}")).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// JSON本文を解析する。本文が空なら既定値
    fn json_or_default<T: DeserializeOwned + Default>(&self) -> AppResult<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        self.json()
    }

    fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// リクエストを処理してJSONレスポンスを返す
pub async fn route(state: &AppState, request: ApiRequest) -> Response<String> {
    log::debug!("リクエストを受信: {} {}", request.method, request.path);

    match dispatch(state, &request).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    }
}

async fn dispatch(state: &AppState, request: &ApiRequest) -> AppResult<Response<String>> {
    let segments: Vec<&str> = request
        .path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let method = &request.method;

    match segments.as_slice() {
        ["health"] => match *method {
            Method::GET => Ok(json_response(StatusCode::OK, &json!({ "status": "ok" }))),
            _ => Err(AppError::MethodNotAllowed),
        },

        ["auth", "otp"] => match *method {
            Method::POST => {
                let body: SendCodeRequest = request.json()?;
                state.auth.send_code(&body.email).await?;
                Ok(json_response(StatusCode::OK, &json!({ "ok": true })))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["auth", "verify"] => match *method {
            Method::POST => {
                let body: VerifyCodeRequest = request.json()?;
                let signed_in = state.auth.verify_code(&body.email, &body.code).await?;
                Ok(json_response(StatusCode::OK, &signed_in))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["auth", "logout"] => match *method {
            Method::POST => {
                let session = authenticate(state, request)?;
                state.auth.sign_out(&session)?;
                Ok(json_response(StatusCode::OK, &json!({ "ok": true })))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["auth", "session"] => match *method {
            Method::GET => {
                let session = authenticate(state, request)?;
                Ok(json_response(StatusCode::OK, &SessionUser::from(&session)))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["subscriptions"] => match *method {
            Method::GET => {
                let session = authenticate(state, request)?;
                let listing = subscriptions::list(&*lock(state)?, &session)?;
                Ok(json_response(StatusCode::OK, &listing))
            }
            Method::POST => {
                let session = authenticate(state, request)?;
                let dto: CreateSubscriptionDto = request.json()?;
                let listing = subscriptions::create(&*lock(state)?, &session, dto)?;
                Ok(json_response(StatusCode::CREATED, &listing))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["subscriptions", id] => match *method {
            Method::DELETE => {
                let session = authenticate(state, request)?;
                let listing = subscriptions::delete(&*lock(state)?, &session, id)?;
                Ok(json_response(StatusCode::OK, &listing))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["subscriptions", id, "reactivate"] => match *method {
            Method::POST => {
                let session = authenticate(state, request)?;
                let dto: ReactivateSubscriptionDto = request.json_or_default()?;
                let listing = subscriptions::reactivate(&*lock(state)?, &session, id, dto)?;
                Ok(json_response(StatusCode::OK, &listing))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["summary"] => match *method {
            Method::GET => {
                let session = authenticate(state, request)?;
                let month = request.query_param("month");
                let cost = summary::summarize(
                    &*lock(state)?,
                    &session,
                    month.as_deref(),
                    (state.today)(),
                )?;
                Ok(json_response(StatusCode::OK, &cost))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        ["api", "reminder-run"] => match *method {
            Method::GET => {
                let provider = state.auth.provider();
                let dispatcher = ReminderDispatcher {
                    db: &state.db,
                    provider: provider.as_ref(),
                    mailer: state.mailer.as_ref(),
                    from_email: &state.from_email,
                };
                let report = dispatcher.run((state.today)()).await?;
                Ok(json_response(StatusCode::OK, &report))
            }
            _ => Err(AppError::MethodNotAllowed),
        },

        _ => {
            log::debug!("未対応のリクエスト: {} {}", request.method, request.path);
            Ok(not_found())
        }
    }
}

/// ベアラートークンからセッションを解決する
fn authenticate(state: &AppState, request: &ApiRequest) -> AppResult<Session> {
    Ok(state.auth.authenticate(request.bearer.as_deref())?)
}

fn lock(state: &AppState) -> AppResult<MutexGuard<'_, Connection>> {
    state
        .db
        .lock()
        .map_err(|e| AppError::Database(format!("データベースロックエラー: {e}")))
}
