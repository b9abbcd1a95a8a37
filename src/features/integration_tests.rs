//! ルーター経由のエンドツーエンドテスト（インメモリDB、偽の外部サービス）

use crate::features::auth::service::fakes::FakeAuthProvider;
use crate::features::reminders::{Mailer, ReminderEmail};
use crate::features::server::{route, ApiRequest};
use crate::shared::database::create_in_memory_connection;
use crate::shared::errors::AppResult;
use crate::AppState;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use hyper::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const EMAIL: &str = "anna@example.com";

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<ReminderEmail>>,
}

impl Mailer for RecordingMailer {
    fn send<'a>(&'a self, email: &'a ReminderEmail) -> BoxFuture<'a, AppResult<u16>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(email.clone());
            Ok(200)
        })
    }
}

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

fn setup() -> (AppState, Arc<RecordingMailer>) {
    let db = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
    let provider = Arc::new(
        FakeAuthProvider::default().with_user(&FakeAuthProvider::user_id_for(EMAIL), Some(EMAIL)),
    );
    let mailer = Arc::new(RecordingMailer::default());

    let mut state = AppState::new(
        db,
        provider,
        mailer.clone(),
        "integration_test_encryption_key".to_string(),
        "reminder@example.com".to_string(),
    );
    state.today = fixed_today;
    (state, mailer)
}

async fn call(state: &AppState, request: ApiRequest) -> (StatusCode, Value) {
    let response = route(state, request).await;
    let status = response.status();
    let body = serde_json::from_str(response.body()).unwrap();
    (status, body)
}

async fn sign_in(state: &AppState) -> String {
    let (status, _) = call(
        state,
        ApiRequest::new(Method::POST, "/auth/otp").with_json(json!({ "email": EMAIL })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        state,
        ApiRequest::new(Method::POST, "/auth/verify")
            .with_json(json!({ "email": EMAIL, "code": "123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn create_request(token: &str, body: Value) -> ApiRequest {
    ApiRequest::new(Method::POST, "/subscriptions")
        .with_bearer(token)
        .with_json(body)
}

#[tokio::test]
async fn test_health_and_unknown_route() {
    let (state, _) = setup();

    let (status, body) = call(&state, ApiRequest::new(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = call(&state, ApiRequest::new(Method::GET, "/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (state, _) = setup();

    let (status, _) = call(&state, ApiRequest::new(Method::GET, "/auth/session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &state,
        ApiRequest::new(Method::POST, "/auth/verify")
            .with_json(json!({ "email": EMAIL, "code": "999999" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let token = sign_in(&state).await;
    let (status, body) = call(
        &state,
        ApiRequest::new(Method::GET, "/auth/session").with_bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], EMAIL);

    let (status, _) = call(
        &state,
        ApiRequest::new(Method::POST, "/auth/logout").with_bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &state,
        ApiRequest::new(Method::GET, "/subscriptions").with_bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let (state, _) = setup();
    let (status, _) = call(
        &state,
        ApiRequest::new(Method::POST, "/auth/otp").with_json(json!({ "email": "anna" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_crud_flow() {
    let (state, _) = setup();
    let token = sign_in(&state).await;

    let (status, _) = call(&state, ApiRequest::new(Method::GET, "/subscriptions")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &state,
        create_request(
            &token,
            json!({
                "name": "Netflix",
                "provider": "Netflix",
                "price": "9.99",
                "next_renewal_date": "2025-03-15"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["count"], 1);
    assert_eq!(body["active"][0]["icon_key"], "netflix");
    assert_eq!(body["active"][0]["price_display"], "9.99 EUR");
    assert_eq!(body["active"][0]["renewal_display"], "15.03.25");
    let netflix_id = body["active"][0]["id"].as_str().unwrap().to_string();

    // アクティブなのに更新日が無い
    let (status, _) = call(
        &state,
        create_request(&token, json!({ "name": "Spotify", "price": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &state,
        create_request(
            &token,
            json!({ "name": "Gym", "price": "30", "is_active": false, "next_renewal_date": "2025-03-20" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["paused"][0]["next_renewal_date"], Value::Null);
    let gym_id = body["paused"][0]["id"].as_str().unwrap().to_string();

    // 保存済みの更新日が無いので日付が必要
    let path = format!("/subscriptions/{gym_id}/reactivate");
    let (status, _) = call(
        &state,
        ApiRequest::new(Method::POST, &path).with_bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &state,
        ApiRequest::new(Method::POST, &path)
            .with_bearer(&token)
            .with_json(json!({ "next_renewal_date": "2025-03-20" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"].as_array().unwrap().len(), 2);
    assert_eq!(body["total_active_display"], "39.99");

    let (status, body) = call(
        &state,
        ApiRequest::new(Method::GET, "/summary?month=2025-03").with_bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selected_month"]["display"], "39.99");
    assert_eq!(body["current_month"]["month"], "2025-03");
    assert_eq!(body["mixed_currency"], false);

    let (status, body) = call(
        &state,
        ApiRequest::new(Method::DELETE, &format!("/subscriptions/{netflix_id}")).with_bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = call(
        &state,
        ApiRequest::new(Method::DELETE, &format!("/subscriptions/{netflix_id}")).with_bearer(&token),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reminder_run() {
    let (state, mailer) = setup();
    let token = sign_in(&state).await;

    for (name, date) in [("Netflix", "2025-03-04"), ("Spotify", "2025-03-05")] {
        let (status, _) = call(
            &state,
            create_request(
                &token,
                json!({ "name": name, "price": "9.99", "next_renewal_date": date }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(&state, ApiRequest::new(Method::POST, "/api/reminder-run")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "Method not allowed" }));

    let (status, body) = call(&state, ApiRequest::new(Method::GET, "/api/reminder-run")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["target"], "2025-03-04");
    assert_eq!(body["count"], 1);
    assert_eq!(body["sent"][0]["status"], 200);

    {
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, EMAIL);
        assert_eq!(sent[0].subject, "Erinnerung: Netflix in 3 Tagen");
    }

    // 2回目は送信済みとしてスキップされる
    let (_, body) = call(&state, ApiRequest::new(Method::GET, "/api/reminder-run")).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["sent"][0]["skipped"], "already_sent");
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
}
