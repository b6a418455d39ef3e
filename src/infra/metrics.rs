//! Prometheus 指标：请求量、拒答量、限流拒绝量、上游错误与耗时
//!
//! 通过 `init()` 安装全局 Recorder，通过 HTTP GET `/metrics` 暴露抓取端点。

use std::sync::OnceLock;

use metrics_exporter_prometheus::PrometheusHandle;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 指标名称
const COUNTER_CHAT_REQUESTS: &str = "kidgate_chat_requests_total";
const COUNTER_CHAT_REFUSALS: &str = "kidgate_chat_refusals_total";
const COUNTER_RATE_LIMITED: &str = "kidgate_rate_limited_total";
const COUNTER_UPSTREAM_ERRORS: &str = "kidgate_upstream_errors_total";
const COUNTER_PIN_REJECTED: &str = "kidgate_pin_rejected_total";
const HISTOGRAM_CHAT_DURATION: &str = "kidgate_chat_duration_seconds";

/// 初始化 Prometheus 指标（安装全局 Recorder）。
/// 仅需在进程内调用一次；重复调用会返回 Err。
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    HANDLE
        .set(handle)
        .map_err(|_| "metrics already initialized")?;
    Ok(())
}

/// 渲染当前指标为 Prometheus 文本格式，供 GET /metrics 使用。
pub fn render_metrics() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// 记录一次聊天请求：总次数 + 耗时直方图。
pub fn record_chat_request(duration_secs: f64) {
    metrics::counter!(COUNTER_CHAT_REQUESTS).increment(1);
    metrics::histogram!(HISTOGRAM_CHAT_DURATION).record(duration_secs);
}

/// 记录一次拒答（source: "lexical" / "moderation"）。
pub fn record_refusal(source: &'static str) {
    metrics::counter!(COUNTER_CHAT_REFUSALS, "source" => source).increment(1);
}

/// 记录一次限流拒绝。
pub fn record_rate_limited() {
    metrics::counter!(COUNTER_RATE_LIMITED).increment(1);
}

/// 记录一次上游调用失败。
pub fn record_upstream_error() {
    metrics::counter!(COUNTER_UPSTREAM_ERRORS).increment(1);
}

/// 记录一次 PIN 校验失败。
pub fn record_pin_rejected() {
    metrics::counter!(COUNTER_PIN_REJECTED).increment(1);
}
