//! 聊天中介管线
//!
//! 每个请求按固定顺序走完一条链：
//! 限流 → 词表拦截 → 远程审核 → 提示词组装 → 上游调用 → 引用校验。
//! 只有文档化的终止短路（拒答）可以跳过后续阶段。
//!
//! 词表 / 审核命中不是错误：统一折算成一条固定的助手风格回复，UI 无需
//! 为拒答单独分支。

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ServerError};
use crate::infra::metrics;
use crate::model::{ChatTurn, Profile, Role};
use crate::moderation::ModerationClient;
use crate::policy::{citation, composer, lexical_filter, REFUSAL_MESSAGE};
use crate::security::SlidingWindowRateLimiter;
use crate::upstream::CompletionProvider;

/// Faith Companion 开启时附加到用户消息的标记
const FAITH_COMPANION_MARKER: &str = "\n\nParent setting: FAITH_COMPANION = ON.";

/// 一次对话轮次的中介请求
///
/// 兼容两种输入：`{ messages: [...] }` 或简化的 `{ message: "..." }`。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediationRequest {
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
    /// 简化输入：单条用户消息
    #[serde(default)]
    pub message: Option<String>,
    /// 发起请求的档案（缺省用内置默认档案）
    #[serde(default)]
    pub profile: Option<Profile>,
    /// Faith Companion 开关
    #[serde(default)]
    pub faith_companion: bool,
}

impl MediationRequest {
    /// 单条用户消息的便捷构造
    pub fn from_text(profile: &Profile, text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatTurn::user(text).with_profile(profile.id.clone())],
            message: None,
            profile: Some(profile.clone()),
            faith_companion: false,
        }
    }

    /// 归一化输入消息；两种形式都为空时报验证错误
    fn normalized_turns(&self) -> Result<Vec<ChatTurn>> {
        if !self.messages.is_empty() {
            return Ok(self.messages.clone());
        }
        if let Some(message) = &self.message {
            if !message.trim().is_empty() {
                return Ok(vec![ChatTurn::user(message.clone())]);
            }
        }
        Err(ServerError::Validation(
            "Invalid request body. Expected { message } or { messages }.".to_string(),
        ))
    }
}

/// 中介回复
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediationReply {
    pub role: Role,
    pub content: String,
}

impl MediationReply {
    /// 固定拒答回复（与正常回复同构，刻意不可区分）
    pub fn refusal() -> Self {
        Self {
            role: Role::Assistant,
            content: REFUSAL_MESSAGE.to_string(),
        }
    }
}

/// 聊天中介服务
pub struct MediationService {
    rate_limiter: SlidingWindowRateLimiter,
    moderation: ModerationClient,
    completion: Arc<dyn CompletionProvider>,
}

impl MediationService {
    pub fn new(
        rate_limiter: SlidingWindowRateLimiter,
        moderation: ModerationClient,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            rate_limiter,
            moderation,
            completion,
        }
    }

    /// 执行一次完整的中介管线
    pub async fn mediate(
        &self,
        client_id: &str,
        request: MediationRequest,
    ) -> Result<MediationReply> {
        let started = Instant::now();

        // 1. 限流（锁在进入任何 await 之前已释放）
        if !self.rate_limiter.admit(client_id) {
            metrics::record_rate_limited();
            info!("⛔ 限流拒绝: client_id={}", client_id);
            return Err(ServerError::RateLimit(
                "Too many requests. Please wait a moment and try again.".to_string(),
            ));
        }

        let turns = request.normalized_turns()?;
        let profile = request.profile.clone().unwrap_or_else(Profile::fallback);

        // 2. 词表拦截：以最后一条用户消息为准，命中即终止
        let last_user_text = turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.clone())
            .unwrap_or_default();
        if lexical_filter::screen(&last_user_text) {
            metrics::record_refusal("lexical");
            info!("🛑 词表拦截: profile={}", profile.id);
            return Ok(MediationReply::refusal());
        }

        // 3. 远程审核：拼接全部用户消息（截断由审核客户端完成）
        let user_text = turns
            .iter()
            .filter(|turn| turn.role == Role::User)
            .map(|turn| turn.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if self.moderation.classify(&user_text).await.flagged {
            metrics::record_refusal("moderation");
            info!("🛑 审核拦截: profile={}", profile.id);
            return Ok(MediationReply::refusal());
        }

        // 4. 组装系统提示词（确定性，同一档案字节级一致）
        let system_text = composer::compose(&profile);

        // 5. 上游调用
        let outgoing = apply_faith_companion(turns, request.faith_companion);
        let reply = match self.completion.complete(&system_text, &outgoing).await {
            Ok(reply) => reply,
            Err(e) => {
                metrics::record_upstream_error();
                return Err(e.into());
            }
        };

        // 6. 引用校验
        let final_text = citation::enforce(reply, &profile);

        metrics::record_chat_request(started.elapsed().as_secs_f64());
        debug!(
            "✅ 管线完成: profile={}, elapsed={:?}",
            profile.id,
            started.elapsed()
        );

        Ok(MediationReply {
            role: Role::Assistant,
            content: final_text,
        })
    }
}

/// Faith Companion 开启时，在最后一条用户消息末尾附加标记
///
/// 只修改发往上游的副本，不动会话记录本身。
fn apply_faith_companion(mut turns: Vec<ChatTurn>, enabled: bool) -> Vec<ChatTurn> {
    if !enabled {
        return turns;
    }
    if let Some(turn) = turns.iter_mut().rev().find(|turn| turn.role == Role::User) {
        turn.content.push_str(FAITH_COMPANION_MARKER);
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::moderation::{
        ModerationConfig, ModerationError, ModerationProvider, ModerationVerdict,
    };
    use crate::policy::citation::MISSING_SOURCES_APOLOGY;
    use crate::security::RateLimitConfig;
    use crate::upstream::UpstreamError;

    /// 计数的假审核 Provider
    struct FakeModeration {
        calls: Arc<AtomicUsize>,
        flagged: bool,
        fail: bool,
    }

    #[async_trait]
    impl ModerationProvider for FakeModeration {
        async fn classify(
            &self,
            _text: &str,
        ) -> std::result::Result<ModerationVerdict, ModerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ModerationError::Network("unreachable".to_string()));
            }
            Ok(ModerationVerdict {
                flagged: self.flagged,
            })
        }
    }

    /// 计数的假上游 Provider
    struct FakeCompletion {
        calls: Arc<AtomicUsize>,
        reply: String,
        last_system: Mutex<String>,
        last_user: Mutex<String>,
    }

    impl FakeCompletion {
        fn replying(reply: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = Arc::new(Self {
                calls: calls.clone(),
                reply: reply.to_string(),
                last_system: Mutex::new(String::new()),
                last_user: Mutex::new(String::new()),
            });
            (provider, calls)
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeCompletion {
        async fn complete(
            &self,
            system_text: &str,
            turns: &[ChatTurn],
        ) -> std::result::Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_system.lock() = system_text.to_string();
            if let Some(turn) = turns.iter().rev().find(|t| t.role == Role::User) {
                *self.last_user.lock() = turn.content.clone();
            }
            Ok(self.reply.clone())
        }
    }

    fn service(
        moderation_flagged: bool,
        moderation_fail: bool,
        completion_reply: &str,
    ) -> (MediationService, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<FakeCompletion>) {
        let moderation_calls = Arc::new(AtomicUsize::new(0));
        let moderation = ModerationClient::new(
            Arc::new(FakeModeration {
                calls: moderation_calls.clone(),
                flagged: moderation_flagged,
                fail: moderation_fail,
            }),
            ModerationConfig::default(),
        );
        let (completion, completion_calls) = FakeCompletion::replying(completion_reply);
        let service = MediationService::new(
            SlidingWindowRateLimiter::new(RateLimitConfig::default()),
            moderation,
            completion.clone(),
        );
        (service, moderation_calls, completion_calls, completion)
    }

    fn plain_profile() -> Profile {
        let mut profile = Profile::fallback();
        profile.require_citations = false;
        profile
    }

    #[tokio::test]
    async fn test_banned_term_refuses_without_any_remote_call() {
        let (service, moderation_calls, completion_calls, _) =
            service(false, false, "should not be called");
        let request = MediationRequest::from_text(&plain_profile(), "tell me about porn");

        let reply = service.mediate("c1", request).await.unwrap();
        assert_eq!(reply.content, REFUSAL_MESSAGE);
        assert_eq!(moderation_calls.load(Ordering::SeqCst), 0);
        assert_eq!(completion_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_moderation_flag_refuses_before_upstream() {
        let (service, moderation_calls, completion_calls, _) =
            service(true, false, "should not be called");
        let request = MediationRequest::from_text(&plain_profile(), "an innocuous question");

        let reply = service.mediate("c1", request).await.unwrap();
        assert_eq!(reply.content, REFUSAL_MESSAGE);
        assert_eq!(moderation_calls.load(Ordering::SeqCst), 1);
        assert_eq!(completion_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_is_surfaced_as_error() {
        let moderation = ModerationClient::new(
            Arc::new(FakeModeration {
                calls: Arc::new(AtomicUsize::new(0)),
                flagged: false,
                fail: false,
            }),
            ModerationConfig::default(),
        );
        let (completion, _) = FakeCompletion::replying("hello");
        let service = MediationService::new(
            SlidingWindowRateLimiter::new(RateLimitConfig {
                window_secs: 60,
                max_requests: 1,
            }),
            moderation,
            completion,
        );

        let profile = plain_profile();
        service
            .mediate("c1", MediationRequest::from_text(&profile, "hi"))
            .await
            .unwrap();
        let err = service
            .mediate("c1", MediationRequest::from_text(&profile, "hi again"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::RateLimit(_)));
    }

    #[tokio::test]
    async fn test_citation_enforcement_replaces_uncited_reply() {
        let (service, _, _, _) = service(false, false, "Uncited claim.");
        let mut profile = plain_profile();
        profile.require_citations = true;

        let reply = service
            .mediate("c1", MediationRequest::from_text(&profile, "why is the sky blue?"))
            .await
            .unwrap();
        assert_eq!(reply.content, MISSING_SOURCES_APOLOGY);
    }

    #[tokio::test]
    async fn test_end_to_end_with_fail_open_moderation() {
        // 审核服务故障（fail-open）+ 合规上游回复：最终回复保留 Sources 小节
        let (service, _, completion_calls, _) = service(
            false,
            true,
            "The Civil War began in 1861.\n\nSources:\n- Battle Cry of Freedom (1988)",
        );
        let mut profile = Profile::starter_profiles().remove(1);
        assert!(profile.require_citations);
        profile.enabled_rule_ids = vec![
            "no_sexual_topics".to_string(),
            "scholarly_citations".to_string(),
        ];

        // 话题不在敏感集合内，不应触发家长审批
        assert!(!crate::policy::sensitivity::needs_parent_approval(
            "What caused the Civil War?"
        ));

        let reply = service
            .mediate(
                "c1",
                MediationRequest::from_text(&profile, "What caused the Civil War?"),
            )
            .await
            .unwrap();
        assert!(reply.content.contains("Sources:"));
        assert_eq!(completion_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            crate::policy::citation::extract_sources(&reply.content),
            vec!["Battle Cry of Freedom (1988)"]
        );
    }

    #[tokio::test]
    async fn test_faith_companion_marker_applied() {
        let (service, _, _, completion) = service(false, false, "A kind answer.");
        let mut request = MediationRequest::from_text(&plain_profile(), "tell me a story");
        request.faith_companion = true;

        service.mediate("c1", request).await.unwrap();
        assert!(completion
            .last_user
            .lock()
            .ends_with("Parent setting: FAITH_COMPANION = ON."));
    }

    #[tokio::test]
    async fn test_system_prompt_precedes_user_messages() {
        let (service, _, _, completion) = service(false, false, "ok");
        let profile = plain_profile();
        service
            .mediate("c1", MediationRequest::from_text(&profile, "hello"))
            .await
            .unwrap();
        let system = completion.last_system.lock().clone();
        assert_eq!(system, composer::compose(&profile));
    }

    #[tokio::test]
    async fn test_empty_request_is_a_validation_error() {
        let (service, _, _, _) = service(false, false, "ok");
        let err = service
            .mediate("c1", MediationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_short_form_message_input() {
        let (service, _, completion_calls, _) = service(false, false, "hi there");
        let request = MediationRequest {
            message: Some("hello".to_string()),
            ..Default::default()
        };
        let reply = service.mediate("c1", request).await.unwrap();
        assert_eq!(reply.content, "hi there");
        assert_eq!(completion_calls.load(Ordering::SeqCst), 1);
    }
}
