//! 内存服务发现后端
//!
//! 进程内的注册中心实现，变化通过 mpsc channel 推送给 watcher。
//! 用于本地开发和测试，不依赖外部注册中心

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::discovery::{Discovery, ServiceInstance, Watcher};
use crate::error::{RelayError, Result};

/// watcher channel 缓冲大小
const WATCH_BUFFER: usize = 16;

/// 内存服务发现后端
#[derive(Clone, Default)]
pub struct MemoryDiscovery {
    /// service_name -> 实例列表
    services: Arc<RwLock<HashMap<String, Vec<ServiceInstance>>>>,
    /// service_name -> 活跃的 watcher 发送端
    watchers: Arc<RwLock<HashMap<String, Vec<mpsc::Sender<Vec<ServiceInstance>>>>>>,
}

impl MemoryDiscovery {
    /// 创建空的内存后端
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换某个服务的实例列表，并推送给所有 watcher
    ///
    /// 已关闭的 watcher 会在推送时被清理
    pub async fn set_instances(&self, service_name: &str, instances: Vec<ServiceInstance>) {
        {
            let mut services = self.services.write().await;
            services.insert(service_name.to_string(), instances.clone());
        }

        let mut watchers = self.watchers.write().await;
        if let Some(senders) = watchers.get_mut(service_name) {
            let mut alive = Vec::with_capacity(senders.len());
            for tx in senders.drain(..) {
                if tx.send(instances.clone()).await.is_ok() {
                    alive.push(tx);
                }
            }
            *senders = alive;
        }
    }

    /// 移除某个服务（watcher 随 channel 关闭而终止）
    pub async fn remove_service(&self, service_name: &str) {
        self.services.write().await.remove(service_name);
        self.watchers.write().await.remove(service_name);
    }

    /// 当前活跃的 watcher 数量（测试用）
    pub async fn watcher_count(&self, service_name: &str) -> usize {
        self.watchers
            .read()
            .await
            .get(service_name)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn get_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        let services = self.services.read().await;
        services
            .get(service_name)
            .cloned()
            .ok_or_else(|| RelayError::discovery(service_name, "service not registered"))
    }

    async fn watch(&self, service_name: &str) -> Result<Box<dyn Watcher>> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let mut watchers = self.watchers.write().await;
        watchers
            .entry(service_name.to_string())
            .or_default()
            .push(tx);
        Ok(Box::new(MemoryWatcher {
            service_name: service_name.to_string(),
            rx,
        }))
    }
}

/// 内存后端的 watcher
struct MemoryWatcher {
    service_name: String,
    rx: mpsc::Receiver<Vec<ServiceInstance>>,
}

#[async_trait]
impl Watcher for MemoryWatcher {
    async fn next(&mut self) -> Result<Vec<ServiceInstance>> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| RelayError::discovery(&self.service_name, "watch channel closed"))
    }
}
