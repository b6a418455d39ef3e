use std::error::Error as StdError;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// 服务器错误类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerError {
    /// 内部错误
    Internal(String),
    /// 验证错误
    Validation(String),
    /// 错误请求
    BadRequest(String),
    /// 配置错误（缺少凭证 / 密钥）
    Configuration(String),
    /// 限流错误
    RateLimit(String),
    /// 网络错误（传输层失败）
    Network(String),
    /// 超时错误
    Timeout(String),
    /// 未授权（PIN 校验失败等）
    Unauthorized(String),
    /// 上游服务返回非成功状态
    Upstream { status: u16, message: String },
    /// 序列化错误
    Serialization(String),
    /// 重复的操作
    Duplicate(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ServerError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ServerError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ServerError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ServerError::Network(msg) => write!(f, "Network error: {}", msg),
            ServerError::Timeout(msg) => write!(f, "Timeout error: {}", msg),
            ServerError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServerError::Upstream { status, message } => {
                write!(f, "Upstream error (status {}): {}", status, message)
            }
            ServerError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ServerError::Duplicate(msg) => write!(f, "Duplicate operation: {}", msg),
        }
    }
}

impl StdError for ServerError {}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ServerError::Validation(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Duplicate(_) => StatusCode::CONFLICT,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Network(_) => StatusCode::BAD_GATEWAY,
            // 上游错误按上游状态透传
            ServerError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error_response = ErrorResponse::new(&self);
        (status_code, Json(error_response)).into_response()
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Serialization(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ServerError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ServerError::Timeout(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServerError>;

/// 错误代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// 内部错误
    Internal = 1000,
    /// 验证错误
    Validation = 1001,
    /// 错误请求
    BadRequest = 1002,
    /// 配置错误
    Configuration = 2000,
    /// 限流错误
    RateLimit = 3000,
    /// 网络错误
    Network = 4000,
    /// 超时错误
    Timeout = 4001,
    /// 上游错误
    Upstream = 4002,
    /// 未授权
    Unauthorized = 5000,
    /// 序列化错误
    Serialization = 6000,
    /// 重复的操作
    Duplicate = 6001,
}

impl From<&ServerError> for ErrorCode {
    fn from(error: &ServerError) -> Self {
        match error {
            ServerError::Internal(_) => ErrorCode::Internal,
            ServerError::Validation(_) => ErrorCode::Validation,
            ServerError::BadRequest(_) => ErrorCode::BadRequest,
            ServerError::Configuration(_) => ErrorCode::Configuration,
            ServerError::RateLimit(_) => ErrorCode::RateLimit,
            ServerError::Network(_) => ErrorCode::Network,
            ServerError::Timeout(_) => ErrorCode::Timeout,
            ServerError::Upstream { .. } => ErrorCode::Upstream,
            ServerError::Unauthorized(_) => ErrorCode::Unauthorized,
            ServerError::Serialization(_) => ErrorCode::Serialization,
            ServerError::Duplicate(_) => ErrorCode::Duplicate,
        }
    }
}

/// 错误响应体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误描述
    pub error: String,
    /// 错误代码
    pub code: ErrorCode,
    /// 时间戳
    pub timestamp: u64,
}

impl ErrorResponse {
    pub fn new(error: &ServerError) -> Self {
        Self {
            error: error.to_string(),
            code: ErrorCode::from(error),
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }
}
