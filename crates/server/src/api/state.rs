//! 统一的应用状态。

use std::sync::Arc;

use axum::http::HeaderName;
use judge_client::{JudgeApi, JudgeConfig};

use crate::service::DocumentService;

/// 统一的应用状态，包含所有服务共享的数据。
#[derive(Clone)]
pub struct AppState {
    /// 文档服务。
    pub documents: DocumentService,
    /// 评测服务客户端；未配置 API 密钥时为 `None`，代码执行被禁用。
    pub judge: Option<Arc<dyn JudgeApi>>,
    /// 评测配置，每个执行会话据此设置轮询间隔。
    pub judge_config: JudgeConfig,
    /// 上游认证代理写入用户标识的请求头。
    pub identity_header: HeaderName,
}

impl AppState {
    /// 创建新的应用状态。
    pub fn new(
        documents: DocumentService,
        judge: Option<Arc<dyn JudgeApi>>,
        judge_config: JudgeConfig,
        identity_header: HeaderName,
    ) -> Self {
        Self {
            documents,
            judge,
            judge_config,
            identity_header,
        }
    }
}
