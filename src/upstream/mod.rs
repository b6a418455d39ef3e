//! 上游模型调用
//!
//! 这一层不做重试：盲目重试会重复消耗限流与审核配额，还可能给用户
//! 产生重复回答；是否重试由调用方决定。

pub mod openai;

use async_trait::async_trait;

use crate::error::ServerError;
use crate::model::ChatTurn;

pub use openai::OpenAiCompletionProvider;

/// 上游调用错误
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// 传输层失败（连接 / 超时）
    #[error("upstream request failed: {0}")]
    Network(String),
    /// 上游返回非成功状态
    #[error("upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    /// 成功响应但没有可用内容
    #[error("upstream returned an empty completion")]
    EmptyCompletion,
}

impl From<UpstreamError> for ServerError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Network(msg) => ServerError::Network(msg),
            UpstreamError::Upstream { status, message } => {
                // 截断上游错误体，避免响应体过大
                let message: String = message.chars().take(500).collect();
                ServerError::Upstream { status, message }
            }
            UpstreamError::EmptyCompletion => ServerError::Upstream {
                status: 502,
                message: "upstream returned an empty completion".to_string(),
            },
        }
    }
}

/// 上游补全接口
///
/// 输入是已通过全部安全检查的系统提示词与对话消息，输出为助手回复文本。
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        system_text: &str,
        turns: &[ChatTurn],
    ) -> std::result::Result<String, UpstreamError>;
}
