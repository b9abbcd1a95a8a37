//! JSON APIサーバー
//!
//! 接続ごとにタスクを起動し、リクエストを [`router::route`] に渡す。

pub mod response;
pub mod router;

pub use router::{route, ApiRequest};

use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::AUTHORIZATION;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// リクエスト本文の上限（バイト）
const MAX_BODY_BYTES: usize = 64 * 1024;

/// サーバーを起動し、接続を受け付け続ける
///
/// # 引数
/// * `state` - アプリケーション状態
/// * `addr` - 待ち受けアドレス
pub async fn serve(
    state: Arc<AppState>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("APIサーバーを開始しました: http://{addr}");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state).await {
                        log::error!("接続処理エラー: peer={peer}, error={e}");
                    }
                });
            }
            Err(e) => {
                // 受け付けエラー後も待ち受けを続ける
                log::error!("接続受け入れエラー: {e}");
            }
        }
    }
}

/// TCP接続を処理する
async fn handle_connection(
    stream: TcpStream,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| handle_request(req, Arc::clone(&state)));

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        log::error!("HTTP接続処理エラー: {err}");
    }

    Ok(())
}

/// HTTPリクエストを処理する
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<String>, Infallible> {
    let (parts, body) = req.into_parts();

    let body = match read_body(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => return Ok(response::error_response(&e)),
    };

    let bearer = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    let request = ApiRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        bearer,
        body,
    };

    Ok(route(&state, request).await)
}

/// リクエスト本文を上限サイズまで読み込む
async fn read_body<B>(body: B, limit: usize) -> AppResult<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            log::warn!("リクエスト本文が大きすぎます: limit={limit}");
            Err(AppError::PayloadTooLarge)
        }
        Err(e) => {
            log::warn!("リクエスト本文の読み取りに失敗しました: {e}");
            Err(AppError::validation("リクエスト本文を読み取れません"))
        }
    }
}

/// `Bearer <token>` からトークンを取り出す
fn bearer_token(header: &str) -> Option<String> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
