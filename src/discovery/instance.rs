//! 服务实例定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 服务实例
///
/// 由注册中心持有并上报，本客户端只读不写。
/// `endpoints` 为有序的候选端点 URI 列表，每个端点携带 scheme
/// （如 `http://10.0.0.1:8080`、`grpc://10.0.0.1:9000`）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceInstance {
    /// 实例 ID（唯一标识）
    pub id: String,

    /// 服务名（逻辑名，与发现目标一致）
    pub name: String,

    /// 版本
    pub version: Option<String>,

    /// 候选端点 URI 列表（有序）
    pub endpoints: Vec<String>,

    /// 元数据（键值对，顺序无关）
    pub metadata: HashMap<String, String>,
}

impl ServiceInstance {
    /// 创建新的服务实例
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: None,
            endpoints: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// 设置版本
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 追加候选端点
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
