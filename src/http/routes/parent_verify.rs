//! 家长 PIN 校验路由
//!
//! 路由：POST /api/parent-verify
//!
//! 与聊天限流互相独立；PIN 与配置密钥都不允许出现在日志里。

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ServerError;
use crate::http::HttpServerState;
use crate::infra::metrics;

/// 创建校验路由
pub fn create_route() -> Router<HttpServerState> {
    Router::new().route("/api/parent-verify", post(parent_verify_handler))
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    pin: String,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    ok: bool,
}

/// PIN 校验处理器
async fn parent_verify_handler(
    State(state): State<HttpServerState>,
    Json(request): Json<VerifyRequest>,
) -> Response {
    let expected = state.config.parent.pin.trim();
    if expected.is_empty() {
        return ServerError::Configuration("Server missing PARENT_PIN".to_string())
            .into_response();
    }

    if request.pin.trim() != expected {
        metrics::record_pin_rejected();
        info!("🔐 PIN 校验失败");
        return (StatusCode::UNAUTHORIZED, Json(VerifyResponse { ok: false })).into_response();
    }

    info!("🔓 PIN 校验通过");
    Json(VerifyResponse { ok: true }).into_response()
}
