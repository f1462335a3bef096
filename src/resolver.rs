//! 地址解析器
//!
//! 每个逻辑服务名对应一个 [`Resolver`]：首次构建时同步拉取实例列表，
//! 之后由后台 watch 任务在注册中心上报变化时整体替换地址快照。
//! 快照只会被原子替换，读方要么看到旧的、要么看到新的完整列表

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::discovery::{Discovery, ServiceInstance};
use crate::error::{RelayError, Result};

/// 已解析的网络地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// 网络位置（host:port）
    pub addr: String,

    /// 服务名标签（来自实例名）
    pub server_name: String,

    /// 属性集（来自实例元数据）
    pub attributes: HashMap<String, String>,
}

/// 地址快照
///
/// 不可变，整体替换；读方 clone Arc 即持有完整快照
pub type AddressSet = Arc<Vec<Address>>;

/// 地址解析器
///
/// 生命周期：随 `Client::add_discovery` 创建，`build` 成功后启动后台
/// watch 任务，`shutdown`（或 Drop）时取消该任务
pub struct Resolver {
    service_name: String,
    discovery: Arc<dyn Discovery>,
    state: Arc<RwLock<AddressSet>>,
    cancel: CancellationToken,
}

impl Resolver {
    /// 创建尚未构建的解析器
    pub(crate) fn new(discovery: Arc<dyn Discovery>, service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            discovery,
            state: Arc::new(RwLock::new(Arc::new(Vec::new()))),
            cancel: CancellationToken::new(),
        }
    }

    /// 同步执行首次解析并启动后台 watch 任务
    ///
    /// 首次拉取失败时返回发现错误，解析器不可用（无残留状态）
    pub(crate) async fn build(&self) -> Result<()> {
        let instances = self
            .discovery
            .get_instances(&self.service_name)
            .await
            .map_err(|e| RelayError::discovery(&self.service_name, e))?;
        let addrs = resolve_addresses(&instances);
        *self.state.write().await = Arc::new(addrs);

        let mut watcher = self
            .discovery
            .watch(&self.service_name)
            .await
            .map_err(|e| RelayError::discovery(&self.service_name, e))?;

        let state = self.state.clone();
        let token = self.cancel.clone();
        let service_name = self.service_name.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::debug!(service = %service_name, "resolver watch cancelled");
                        break;
                    }
                    next = watcher.next() => match next {
                        Ok(instances) => {
                            let addrs = resolve_addresses(&instances);
                            tracing::debug!(
                                service = %service_name,
                                addresses = addrs.len(),
                                "service instances updated"
                            );
                            *state.write().await = Arc::new(addrs);
                        }
                        Err(e) => {
                            tracing::warn!(
                                service = %service_name,
                                error = %e,
                                "service watch failed, stopping watch loop"
                            );
                            break;
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// 获取当前地址快照
    ///
    /// 可与后台替换并发调用，读方拿到的永远是完整快照
    pub async fn get_state(&self) -> AddressSet {
        self.state.read().await.clone()
    }

    /// 解析器绑定的逻辑服务名
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// 停止后台 watch 任务
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        // 被覆盖或随 Client 析构时，watch 任务一并结束
        self.cancel.cancel();
    }
}

/// 从实例列表计算地址快照
///
/// 每个实例取端点列表中第一个 http scheme 的端点；没有匹配端点的
/// 实例不产出地址；端点解析失败的实例记录日志后跳过，不影响整体解析
pub(crate) fn resolve_addresses(instances: &[ServiceInstance]) -> Vec<Address> {
    let mut addrs = Vec::with_capacity(instances.len());
    for instance in instances {
        match pick_http_endpoint(instance) {
            Some(addr) => addrs.push(Address {
                addr,
                server_name: instance.name.clone(),
                attributes: instance.metadata.clone(),
            }),
            None => continue,
        }
    }
    addrs
}

/// 按顺序扫描实例端点，返回第一个 http scheme 端点的 host:port
fn pick_http_endpoint(instance: &ServiceInstance) -> Option<String> {
    for endpoint in &instance.endpoints {
        let uri = match endpoint.parse::<http::Uri>() {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(
                    instance = %instance.id,
                    endpoint = %endpoint,
                    error = %e,
                    "failed to parse discovery endpoint, skipping instance"
                );
                return None;
            }
        };
        if uri.scheme_str() == Some("http") {
            if let Some(authority) = uri.authority() {
                return Some(authority.to_string());
            }
        }
    }
    tracing::debug!(
        instance = %instance.id,
        "instance has no http endpoint, skipped"
    );
    None
}
