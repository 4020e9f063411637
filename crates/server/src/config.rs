//! 服务配置。
//!
//! 从 `realtime.toml` 读取；文件不存在时使用默认值。
//! 评测服务的凭据可由环境变量覆盖。

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use axum::http::HeaderName;
use judge_client::JudgeConfig;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// 认证代理写入用户标识的请求头名称。
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            identity_header: default_identity_header(),
        }
    }
}

impl ServerConfig {
    pub fn identity_header(&self) -> anyhow::Result<HeaderName> {
        HeaderName::from_bytes(self.identity_header.to_ascii_lowercase().as_bytes())
            .with_context(|| format!("invalid identity header name: {}", self.identity_header))
    }
}

impl AppConfig {
    /// 加载配置文件，文件缺失时退回默认配置。
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("failed to deserialize server config")?;
        config.judge.validate()?;
        Ok(config)
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn default_identity_header() -> String {
    "x-user-subject".to_string()
}
