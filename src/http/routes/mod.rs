//! HTTP 路由模块
//!
//! 路由结构：
//! - `POST /api/chat` - 聊天中介端点（完整安全管线）
//! - `POST /api/parent-verify` - 家长 PIN 校验（独立于聊天限流）
//! - `GET /metrics` - Prometheus 抓取端点

pub mod chat;
pub mod metrics;
pub mod parent_verify;

use axum::{routing::get, Router};

use crate::http::HttpServerState;

/// 创建所有路由
pub fn create_routes() -> Router<HttpServerState> {
    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .merge(chat::create_route())
        .merge(parent_verify::create_route())
}
