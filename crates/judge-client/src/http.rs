//! 基于 HTTP 的评测服务客户端。
//!
//! 提交：`POST {base}/submissions?base64_encoded=..&wait=false`，
//! 查询：`GET {base}/submissions/{token}?base64_encoded=..&fields=*`。

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::{JudgeApi, RawExecution, SubmissionRequest, SubmissionToken};
use crate::config::JudgeConfig;
use crate::error::{JudgeError, Result};

const API_KEY_HEADER: &str = "X-RapidAPI-Key";
const API_HOST_HEADER: &str = "X-RapidAPI-Host";

/// 提交请求体。
#[derive(Debug, Serialize)]
struct CreateSubmissionBody {
    language_id: i32,
    source_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<String>,
}

/// 提交响应。
#[derive(Debug, Deserialize)]
struct CreateSubmissionResponse {
    token: String,
}

/// 通过 HTTP API 访问评测服务。
#[derive(Debug, Clone)]
pub struct HttpJudgeApi {
    client: Client,
    base_url: String,
    encode_payloads: bool,
}

impl HttpJudgeApi {
    /// 根据配置创建客户端；未配置 API 密钥时返回 `NotConfigured`。
    pub fn new(config: &JudgeConfig) -> Result<Self> {
        let api_key = config.api_key().ok_or(JudgeError::NotConfigured)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(api_key)
                .map_err(|e| JudgeError::Config(format!("invalid api key: {e}")))?,
        );
        if let Some(host) = config.api_host.as_deref().filter(|h| !h.trim().is_empty()) {
            headers.insert(
                API_HOST_HEADER,
                HeaderValue::from_str(host)
                    .map_err(|e| JudgeError::Config(format!("invalid api host: {e}")))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| JudgeError::Config(format!("failed to build http client: {e}")))?;

        info!(base_url = %config.base_url, "judge client configured");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            encode_payloads: config.encode_payloads,
        })
    }

    fn encoded_flag(&self) -> &'static str {
        if self.encode_payloads { "true" } else { "false" }
    }

    fn encode(&self, value: &str) -> String {
        if self.encode_payloads {
            STANDARD.encode(value.as_bytes())
        } else {
            value.to_string()
        }
    }
}

#[async_trait]
impl JudgeApi for HttpJudgeApi {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionToken> {
        let body = CreateSubmissionBody {
            language_id: request.language.judge_id(),
            source_code: self.encode(&request.source_code),
            stdin: request.stdin.as_deref().map(|stdin| self.encode(stdin)),
        };

        let response = self
            .client
            .post(format!("{}/submissions", self.base_url))
            .query(&[("base64_encoded", self.encoded_flag()), ("wait", "false")])
            .json(&body)
            .send()
            .await
            .map_err(|e| JudgeError::SubmissionFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| JudgeError::SubmissionFailed(e.to_string()))?;

        let created: CreateSubmissionResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::SubmissionFailed(format!("invalid response: {e}")))?;

        if created.token.trim().is_empty() {
            return Err(JudgeError::SubmissionFailed(
                "judge returned an empty token".to_string(),
            ));
        }

        debug!(token = %created.token, "submission accepted");
        Ok(SubmissionToken::new(created.token))
    }

    async fn fetch(&self, token: &SubmissionToken) -> Result<RawExecution> {
        let response = self
            .client
            .get(format!("{}/submissions/{}", self.base_url, token))
            .query(&[("base64_encoded", self.encoded_flag()), ("fields", "*")])
            .send()
            .await
            .map_err(|e| JudgeError::PollFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| JudgeError::PollFailed(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| JudgeError::PollFailed(format!("invalid response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_not_configured() {
        let err = HttpJudgeApi::new(&JudgeConfig::default())
            .expect_err("client should require an api key");

        assert!(matches!(err, JudgeError::NotConfigured));
    }

    #[test]
    fn payloads_are_encoded_when_enabled() {
        let config = JudgeConfig {
            api_key: Some("secret".to_string()),
            base_url: "https://judge.example.com/".to_string(),
            ..JudgeConfig::default()
        };
        let api = HttpJudgeApi::new(&config).expect("client should build");

        assert_eq!(api.base_url, "https://judge.example.com");
        assert_eq!(api.encoded_flag(), "true");
        assert_eq!(api.encode("print(1)"), "cHJpbnQoMSk=");
    }

    #[test]
    fn payloads_pass_through_when_disabled() {
        let config = JudgeConfig {
            api_key: Some("secret".to_string()),
            encode_payloads: false,
            ..JudgeConfig::default()
        };
        let api = HttpJudgeApi::new(&config).expect("client should build");

        assert_eq!(api.encoded_flag(), "false");
        assert_eq!(api.encode("print(1)"), "print(1)");
    }
}
