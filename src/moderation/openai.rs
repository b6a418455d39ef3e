//! OpenAI 内容审核 Provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ModerationError, ModerationProvider, ModerationVerdict};

const MODERATION_URL: &str = "https://api.openai.com/v1/moderations";

/// OpenAI Moderation API Provider
pub struct OpenAiModerationProvider {
    client: Client,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
}

impl OpenAiModerationProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl ModerationProvider for OpenAiModerationProvider {
    async fn classify(
        &self,
        text: &str,
    ) -> std::result::Result<ModerationVerdict, ModerationError> {
        let response = self
            .client
            .post(MODERATION_URL)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "input": text }))
            .send()
            .await
            .map_err(|e| ModerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModerationError::Upstream {
                status: status.as_u16(),
            });
        }

        let body: ModerationResponse = response
            .json()
            .await
            .map_err(|e| ModerationError::Network(e.to_string()))?;

        // 只取 flagged 布尔位，分类类目不外传
        let flagged = body.results.iter().any(|result| result.flagged);
        Ok(ModerationVerdict { flagged })
    }
}
