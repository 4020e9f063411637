use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

/// 评测服务连接配置，对应配置文件中的 `[judge]` 段。
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_host: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_encode_payloads")]
    pub encode_payloads: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl JudgeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read judge config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse judge config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).context("failed to deserialize judge config")?;
        config.validate()?;
        Ok(config)
    }

    /// 轮询间隔与请求超时必须大于 0。
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("judge.poll_interval_ms must be greater than 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("judge.request_timeout_secs must be greater than 0");
        }
        Ok(())
    }

    /// 使用环境变量覆盖配置文件中的连接信息。
    ///
    /// 支持 `JUDGE_API_KEY`、`JUDGE_API_HOST` 与 `JUDGE_BASE_URL`。
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("JUDGE_API_KEY") {
            self.api_key = Some(key);
        }
        if let Ok(host) = std::env::var("JUDGE_API_HOST") {
            self.api_host = Some(host);
        }
        if let Ok(url) = std::env::var("JUDGE_BASE_URL") {
            self.base_url = url;
        }
        self
    }

    /// 返回非空的 API 密钥。
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// 未配置密钥时代码执行被禁用。
    pub fn is_enabled(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            api_host: None,
            poll_interval_ms: default_poll_interval_ms(),
            encode_payloads: default_encode_payloads(),
            request_timeout_secs: default_request_timeout_secs(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://judge0-ce.p.rapidapi.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_encode_payloads() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_buffer_size() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::JudgeConfig;

    #[test]
    fn test_parse_config() {
        let raw = r#"
base_url = "https://judge.example.com"
api_key = "secret"
api_host = "judge.example.com"
poll_interval_ms = 250
encode_payloads = false
"#;

        let config = JudgeConfig::from_str(raw).expect("config should parse");
        assert_eq!(config.base_url, "https://judge.example.com");
        assert_eq!(config.api_key(), Some("secret"));
        assert_eq!(config.api_host.as_deref(), Some("judge.example.com"));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert!(!config.encode_payloads);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.is_enabled());
    }

    #[test]
    fn test_defaults_poll_every_second() {
        let config = JudgeConfig::from_str("").expect("empty config should parse");

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert!(config.encode_payloads);
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = JudgeConfig::from_str("poll_interval_ms = 0").expect_err("zero interval");
        assert!(format!("{err:#}").contains("poll_interval_ms"));

        assert!(JudgeConfig::from_str("request_timeout_secs = 0").is_err());
        assert!(JudgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_blank_api_key_disables_execution() {
        let config = JudgeConfig::from_str(r#"api_key = "   ""#).expect("config should parse");

        assert_eq!(config.api_key(), None);
        assert!(!config.is_enabled());
    }
}
