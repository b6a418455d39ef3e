//! 家长审批门
//!
//! 状态机：`Idle → PendingApproval → (Approved | Cancelled)`。
//! Approved 会从头重新走完整管线（限流 / 词表 / 审核一个不少，豁免的
//! 只有关键词预触发本身）；Cancelled 丢弃挂起文本回到 Idle，纯本地
//! 动作，无任何网络调用。
//!
//! 审批门位于管线之前的发起端，属于体验层；真正的安全边界始终是
//! 服务端的词表与审核检查。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, ServerError};
use crate::model::Profile;
use crate::policy::{lexical_filter, sensitivity};
use crate::service::mediation::{MediationReply, MediationRequest, MediationService};

/// 审批门可观测状态
///
/// Approved / Cancelled 是瞬时出口（分别对应重新提交与丢弃），
/// 不作为驻留状态存在。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    PendingApproval,
}

/// 挂起的审批请求
///
/// 只存在于发起端的临时状态，随审批通过 / 取消一起销毁，永不持久化。
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub request_id: Uuid,
    pub text: String,
    pub reason: String,
    /// 挂起时的档案快照（审批通过后按它重新提交）
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

/// 管线提交接口（审批通过后重新走完整管线）
#[async_trait]
pub trait TurnSubmitter: Send + Sync {
    async fn submit(&self, profile: &Profile, text: &str) -> Result<MediationReply>;
}

/// PIN 校验接口
///
/// 独立于聊天限流的带外验证边界；校验失败（false）与网络失败（Err)
/// 必须可区分，UI 据此决定是保持门开着还是提示重试。
#[async_trait]
pub trait PinVerifier: Send + Sync {
    async fn verify(&self, pin: &str) -> Result<bool>;
}

/// 提交结果
#[derive(Debug)]
pub enum SubmitOutcome {
    /// 已走完管线，拿到回复
    Completed(MediationReply),
    /// 已挂起等待家长审批
    Held { reason: String },
}

/// 家长审批门
pub struct ApprovalGate {
    /// 同一发起端同一时刻至多一个挂起请求
    pending: tokio::sync::Mutex<Option<ApprovalRequest>>,
    submitter: Arc<dyn TurnSubmitter>,
    verifier: Arc<dyn PinVerifier>,
}

impl ApprovalGate {
    pub fn new(submitter: Arc<dyn TurnSubmitter>, verifier: Arc<dyn PinVerifier>) -> Self {
        Self {
            pending: tokio::sync::Mutex::new(None),
            submitter,
            verifier,
        }
    }

    /// 提交一条用户输入
    ///
    /// 档案要求家长审批且原始文本命中敏感话题时挂起，否则直接走管线。
    /// 已有挂起请求时拒绝新提交。
    pub async fn submit(&self, profile: &Profile, text: &str) -> Result<SubmitOutcome> {
        {
            let mut pending = self.pending.lock().await;
            if pending.is_some() {
                return Err(ServerError::Duplicate(
                    "An approval request is already pending.".to_string(),
                ));
            }
            if profile.require_parent_for_sensitive && sensitivity::needs_parent_approval(text) {
                let request = ApprovalRequest {
                    request_id: Uuid::new_v4(),
                    text: text.to_string(),
                    reason: "Sensitive keywords detected".to_string(),
                    profile: profile.clone(),
                    created_at: Utc::now(),
                };
                info!("⏸️ 消息挂起等待家长审批: request_id={}", request.request_id);
                let reason = request.reason.clone();
                *pending = Some(request);
                return Ok(SubmitOutcome::Held { reason });
            }
        }

        // 本地词表预检（与服务端同一份词表）：命中直接返回固定拒答，
        // 不发起任何网络调用。服务端的同名检查才是权威边界。
        if lexical_filter::screen(text) {
            return Ok(SubmitOutcome::Completed(MediationReply::refusal()));
        }

        let reply = self.submitter.submit(profile, text).await?;
        Ok(SubmitOutcome::Completed(reply))
    }

    /// 用家长 PIN 审批挂起的请求
    ///
    /// PIN 错误时保持 PendingApproval 并返回 Unauthorized；校验通过则
    /// 销毁挂起请求，把原文重新提交一次（且仅一次）完整管线。
    pub async fn approve(&self, pin: &str) -> Result<MediationReply> {
        let request = {
            let mut pending = self.pending.lock().await;
            if pending.is_none() {
                return Err(ServerError::Validation(
                    "No approval request is pending.".to_string(),
                ));
            }

            match self.verifier.verify(pin).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("❌ PIN 校验失败，请求保持挂起");
                    return Err(ServerError::Unauthorized("Incorrect PIN.".to_string()));
                }
                // 网络失败原样上抛，请求保持挂起
                Err(e) => return Err(e),
            }

            match pending.take() {
                Some(request) => request,
                None => {
                    return Err(ServerError::Validation(
                        "No approval request is pending.".to_string(),
                    ))
                }
            }
        };

        info!("✅ 家长审批通过: request_id={}", request.request_id);

        // 审批只豁免关键词预触发；重新提交仍先过本地词表预检
        if lexical_filter::screen(&request.text) {
            return Ok(MediationReply::refusal());
        }
        self.submitter.submit(&request.profile, &request.text).await
    }

    /// 取消挂起的审批请求（纯本地动作）
    ///
    /// 返回是否真的取消了一个请求。
    pub async fn cancel(&self) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.take() {
            Some(request) => {
                info!("🚫 审批请求已取消: request_id={}", request.request_id);
                true
            }
            None => false,
        }
    }

    /// 当前状态
    pub async fn state(&self) -> GateState {
        if self.pending.lock().await.is_some() {
            GateState::PendingApproval
        } else {
            GateState::Idle
        }
    }

    /// 当前挂起的请求（快照）
    pub async fn pending_request(&self) -> Option<ApprovalRequest> {
        self.pending.lock().await.clone()
    }
}

/// 把中介服务接到审批门后面的适配器
///
/// 发起端固定一个客户端标识（服务端限流仍按它计数）。
pub struct PipelineSubmitter {
    service: Arc<MediationService>,
    client_id: String,
}

impl PipelineSubmitter {
    pub fn new(service: Arc<MediationService>, client_id: impl Into<String>) -> Self {
        Self {
            service,
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl TurnSubmitter for PipelineSubmitter {
    async fn submit(&self, profile: &Profile, text: &str) -> Result<MediationReply> {
        self.service
            .mediate(&self.client_id, MediationRequest::from_text(profile, text))
            .await
    }
}

/// 通过 HTTP 带外端点校验 PIN
pub struct HttpPinVerifier {
    client: Client,
    verify_url: String,
}

impl HttpPinVerifier {
    pub fn new(verify_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            verify_url: verify_url.into(),
        }
    }
}

#[async_trait]
impl PinVerifier for HttpPinVerifier {
    async fn verify(&self, pin: &str) -> Result<bool> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&json!({ "pin": pin }))
            .send()
            .await
            .map_err(|e| ServerError::Network(format!("PIN verification failed: {}", e)))?;

        // 401 是明确的「PIN 不对」，不是网络失败
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(ServerError::Network(format!(
                "PIN verification returned status {}",
                response.status()
            )));
        }

        #[derive(Deserialize)]
        struct VerifyResponse {
            #[serde(default)]
            ok: bool,
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| ServerError::Network(format!("PIN verification failed: {}", e)))?;
        Ok(body.ok)
    }
}
