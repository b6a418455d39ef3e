//! 远程内容审核
//!
//! 审核结论只有一个布尔位；上游分类器的具体类目永远不出这一层，
//! 也不会出现在任何给用户的响应里。

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use openai::OpenAiModerationProvider;

/// 审核结论
///
/// 每段送审文本只发起一次分类调用；结论不缓存、不持久化。
#[derive(Debug, Clone, Copy, Default)]
pub struct ModerationVerdict {
    pub flagged: bool,
}

/// 审核调用错误
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    /// 传输层失败
    #[error("moderation request failed: {0}")]
    Network(String),
    /// 审核服务返回非成功状态
    #[error("moderation service returned status {status}")]
    Upstream { status: u16 },
}

/// 审核服务接口
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    async fn classify(&self, text: &str) -> std::result::Result<ModerationVerdict, ModerationError>;
}

/// 审核配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// 是否启用远程审核
    pub enabled: bool,
    /// 审核服务不可用时是否按违规处理
    ///
    /// false（fail-open）：第三方瞬时故障不拦全站，是有意的风险取舍；
    /// true（fail-closed）：更严格的部署可以打开。
    pub fail_closed: bool,
    /// 送审文本的最大字符数（控制成本与延迟）
    pub max_chars: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fail_closed: false,
            max_chars: 4000,
        }
    }
}

/// 审核客户端
///
/// 负责截断送审文本，并按配置把服务故障折算成 fail-open / fail-closed
/// 的结论；调用方拿到的永远是一个明确的 `ModerationVerdict`。
pub struct ModerationClient {
    provider: Arc<dyn ModerationProvider>,
    config: ModerationConfig,
}

impl ModerationClient {
    pub fn new(provider: Arc<dyn ModerationProvider>, config: ModerationConfig) -> Self {
        Self { provider, config }
    }

    /// 审核用户文本（只取前 max_chars 个字符）
    pub async fn classify(&self, text: &str) -> ModerationVerdict {
        if !self.config.enabled {
            return ModerationVerdict::default();
        }

        let bounded: String = text.chars().take(self.config.max_chars).collect();
        match self.provider.classify(&bounded).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!("⚠️ 审核服务调用失败: {}", e);
                ModerationVerdict {
                    flagged: self.config.fail_closed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use parking_lot::Mutex;

    /// 记录调用并返回预设结果的假 Provider
    struct FakeProvider {
        calls: AtomicUsize,
        last_input_chars: Mutex<usize>,
        result: std::result::Result<bool, ()>,
    }

    impl FakeProvider {
        fn flagging(flagged: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_input_chars: Mutex::new(0),
                result: Ok(flagged),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                last_input_chars: Mutex::new(0),
                result: Err(()),
            }
        }
    }

    #[async_trait]
    impl ModerationProvider for FakeProvider {
        async fn classify(
            &self,
            text: &str,
        ) -> std::result::Result<ModerationVerdict, ModerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_input_chars.lock() = text.chars().count();
            match self.result {
                Ok(flagged) => Ok(ModerationVerdict { flagged }),
                Err(()) => Err(ModerationError::Network("connection refused".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_classify_passes_through_verdict() {
        let provider = Arc::new(FakeProvider::flagging(true));
        let client = ModerationClient::new(provider.clone(), ModerationConfig::default());
        assert!(client.classify("some text").await.flagged);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_input_is_bounded() {
        let provider = Arc::new(FakeProvider::flagging(false));
        let config = ModerationConfig {
            max_chars: 100,
            ..Default::default()
        };
        let client = ModerationClient::new(provider.clone(), config);
        let long_text = "x".repeat(5000);
        client.classify(&long_text).await;
        assert_eq!(*provider.last_input_chars.lock(), 100);
    }

    #[tokio::test]
    async fn test_fail_open_by_default() {
        let provider = Arc::new(FakeProvider::failing());
        let client = ModerationClient::new(provider, ModerationConfig::default());
        assert!(!client.classify("anything").await.flagged);
    }

    #[tokio::test]
    async fn test_fail_closed_when_configured() {
        let provider = Arc::new(FakeProvider::failing());
        let config = ModerationConfig {
            fail_closed: true,
            ..Default::default()
        };
        let client = ModerationClient::new(provider, config);
        assert!(client.classify("anything").await.flagged);
    }

    #[tokio::test]
    async fn test_disabled_skips_provider() {
        let provider = Arc::new(FakeProvider::flagging(true));
        let config = ModerationConfig {
            enabled: false,
            ..Default::default()
        };
        let client = ModerationClient::new(provider.clone(), config);
        assert!(!client.classify("anything").await.flagged);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
