use crate::shared::errors::{AppError, ErrorSeverity};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;

/// JSONレスポンスを作成する
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<String> {
    match serde_json::to_string(body) {
        Ok(body) => build(status, body),
        Err(e) => {
            log::error!("レスポンスのシリアライズに失敗しました: {e}");
            build(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "レスポンスの作成に失敗しました" }).to_string(),
            )
        }
    }
}

/// エラーを `{error: message}` 形式のレスポンスに変換する
pub fn error_response(error: &AppError) -> Response<String> {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match error.severity() {
        ErrorSeverity::High => log::error!("リクエスト処理エラー: {}", error.details()),
        ErrorSeverity::Medium => log::warn!("リクエスト処理エラー: {}", error.details()),
        ErrorSeverity::Low => log::debug!("リクエスト処理エラー: {}", error.details()),
    }

    json_response(status, &json!({ "error": error.user_message() }))
}

/// 未定義のルート
pub fn not_found() -> Response<String> {
    json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not Found" }))
}

fn build(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let response = error_response(&AppError::MethodNotAllowed);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.body(), r#"{"error":"Method not allowed"}"#);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/json; charset=utf-8"
        );

        let response = error_response(&AppError::validation("金額が不正です"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.body().contains("金額が不正です"));
    }

    #[test]
    fn test_not_found() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
