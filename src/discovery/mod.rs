//! 服务发现抽象
//!
//! 注册中心本身（etcd、consul、nacos 等）不在本 crate 范围内，
//! 通过 [`Discovery`] / [`Watcher`] 两个窄接口消费

pub mod instance;
pub mod memory;

pub use instance::ServiceInstance;
pub use memory::MemoryDiscovery;

use crate::error::Result;
use async_trait::async_trait;

/// 服务发现接口
///
/// 注意：需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait Discovery: Send + Sync {
    /// 拉取指定服务当前的全部实例
    ///
    /// # 参数
    /// * `service_name` - 逻辑服务名
    ///
    /// # 返回
    /// 返回服务实例列表
    async fn get_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>>;

    /// 监听服务变化
    ///
    /// 返回的 [`Watcher`] 在每次注册中心上报变化时产出一份完整的实例列表
    async fn watch(&self, service_name: &str) -> Result<Box<dyn Watcher>>;
}

/// 服务变化监听器
#[async_trait]
pub trait Watcher: Send {
    /// 阻塞直到注册中心有变化上报，返回变化后的完整实例列表
    async fn next(&mut self) -> Result<Vec<ServiceInstance>>;
}
