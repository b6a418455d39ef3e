//! 聊天中介路由
//!
//! 路由：POST /api/chat

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::post,
    Router,
};
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::http::client_ip;
use crate::http::HttpServerState;
use crate::service::{MediationReply, MediationRequest};

/// 创建聊天路由
pub fn create_route() -> Router<HttpServerState> {
    Router::new().route("/api/chat", post(chat_handler))
}

/// 聊天中介处理器
///
/// 凭证缺失是该请求的致命配置错误（500），但不会导致进程退出。
async fn chat_handler(
    State(state): State<HttpServerState>,
    headers: HeaderMap,
    Json(request): Json<MediationRequest>,
) -> Result<Json<MediationReply>> {
    if state.config.upstream.api_key.trim().is_empty() {
        return Err(ServerError::Configuration(
            "Server is missing OPENAI_API_KEY".to_string(),
        ));
    }

    let client_id = client_ip::derive_client_id(&headers);
    debug!("💬 收到聊天请求: client_id={}", client_id);

    let reply = state.mediation_service.mediate(&client_id, request).await?;
    Ok(Json(reply))
}
