//! Relay HTTP Client 统一错误类型
//!
//! 按照错误来源分类：服务发现、地址解析、传输层、应用层（非 2xx 响应）
//! 所有失败都直接上抛给调用方，核心层不做任何自动重试

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Relay HTTP Client 统一错误类型
#[derive(Error, Debug)]
pub enum RelayError {
    /// 服务发现失败（初始拉取或 watch 建立失败）
    #[error("discovery {service} err: {reason}")]
    Discovery { service: String, reason: String },

    /// 目标服务未注册任何 Resolver
    #[error("resolver {0} not found")]
    ResolverNotFound(String),

    /// 当前地址快照为空，无可用实例
    #[error("no addresses available for {0}")]
    NoAddress(String),

    /// 请求构造失败（非法 URI、非法 Header 等）
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 请求超过配置的超时时间
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// 传输层错误（连接失败、中间件抛出的错误等）
    #[error("transport error: {0}")]
    Transport(String),

    /// 响应体解码失败
    #[error("decode error: {0}")]
    Decode(String),

    /// 服务端返回非 2xx，响应体解码出的结构化错误
    #[error("server error [{}] {}: {}", .0.code, .0.reason, .0.message)]
    Status(ErrorPayload),
}

impl RelayError {
    /// 创建服务发现错误
    pub fn discovery(service: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        RelayError::Discovery {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建传输层错误
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        RelayError::Transport(reason.to_string())
    }

    /// 创建解码错误
    pub fn decode(reason: impl std::fmt::Display) -> Self {
        RelayError::Decode(reason.to_string())
    }

    /// 获取服务端错误负载（仅 `Status` 变体）
    pub fn as_status(&self) -> Option<&ErrorPayload> {
        match self {
            RelayError::Status(payload) => Some(payload),
            _ => None,
        }
    }
}

/// 服务端错误负载
///
/// 非 2xx 响应的响应体按 Content-Type 解码为该结构后，作为
/// [`RelayError::Status`] 返回给调用方，与传输层错误严格区分
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    /// 业务错误码
    #[serde(default)]
    pub code: i32,

    /// 错误原因（机器可读）
    #[serde(default)]
    pub reason: String,

    /// 错误描述（人类可读）
    #[serde(default)]
    pub message: String,

    /// 附加元数据
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RelayError>;
