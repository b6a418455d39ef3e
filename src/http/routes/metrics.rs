//! Prometheus 抓取端点
//!
//! 路由：GET /metrics

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::infra::metrics;

/// 指标处理器：返回 Prometheus 文本格式。
/// 指标未初始化（init 未调用）时返回 503。
pub async fn metrics_handler() -> Response {
    match metrics::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}
