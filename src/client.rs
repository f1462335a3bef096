//! 发现驱动的 HTTP 客户端
//!
//! Client 组合传输层与解析器表：构造请求时把逻辑服务名替换为
//! 当前快照中随机选出的一个具体地址，执行后按 Content-Type 解码
//! 类型化响应

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Response};
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::discovery::Discovery;
use crate::encoding::{Codec, CodecRegistry};
use crate::error::{ErrorPayload, RelayError, Result};
use crate::resolver::{Address, Resolver};
use crate::transport::{Middleware, ReqwestTransport, RoundTrip, Transport};

/// 默认单次请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// 客户端配置
pub struct ClientOptions {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub transport: Option<Arc<dyn RoundTrip>>,
    pub middleware: Option<Middleware>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            transport: None,
            middleware: None,
        }
    }
}

/// 客户端构建器
pub struct ClientBuilder {
    options: ClientOptions,
    codecs: CodecRegistry,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            options: ClientOptions::default(),
            codecs: CodecRegistry::new(),
        }
    }

    /// 设置单次请求超时（默认 500ms）
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// 设置默认 User-Agent（仅在请求未携带时注入）
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = Some(user_agent.into());
        self
    }

    /// 覆盖基础传输
    pub fn transport(mut self, transport: Arc<dyn RoundTrip>) -> Self {
        self.options.transport = Some(transport);
        self
    }

    /// 设置中间件链
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.options.middleware = Some(middleware);
        self
    }

    /// 注册额外的响应解码器（`json` 已预注册）
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.register(codec);
        self
    }

    pub fn build(self) -> Result<Client> {
        let user_agent = self
            .options
            .user_agent
            .map(|ua| {
                ua.parse::<http::HeaderValue>()
                    .map_err(|e| RelayError::InvalidRequest(format!("invalid user agent: {}", e)))
            })
            .transpose()?;

        let base = match self.options.transport {
            Some(base) => base,
            None => Arc::new(ReqwestTransport::new()?),
        };

        Ok(Client {
            transport: Transport::new(
                base,
                self.options.timeout,
                user_agent,
                self.options.middleware,
            ),
            resolvers: RwLock::new(HashMap::new()),
            codecs: self.codecs,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 发现驱动的 HTTP 客户端
pub struct Client {
    transport: Transport,
    /// service_name -> Resolver，添加与请求路径可能并发
    resolvers: RwLock<HashMap<String, Resolver>>,
    codecs: CodecRegistry,
}

impl Client {
    /// 使用默认配置创建客户端
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// 注册发现目标
    ///
    /// 同步执行首次解析，成功后才写入解析器表；失败时不注册。
    /// 重复注册同名服务为 last-write-wins，被替换的解析器的
    /// watch 任务随之取消，不会泄漏
    pub async fn add_discovery(
        &self,
        discovery: Arc<dyn Discovery>,
        service_name: impl Into<String>,
    ) -> Result<()> {
        let service_name = service_name.into();
        let resolver = Resolver::new(discovery, service_name.clone());
        resolver.build().await?;

        let mut resolvers = self.resolvers.write().await;
        if resolvers.insert(service_name.clone(), resolver).is_some() {
            tracing::debug!(service = %service_name, "superseded resolver cancelled");
        }
        Ok(())
    }

    /// 构造指向逻辑服务的请求
    ///
    /// 从当前快照中均匀随机选择一个地址，目标为
    /// `http://<host:port><path>`
    pub async fn new_request(
        &self,
        method: Method,
        service_name: &str,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<Request<Bytes>> {
        let addr = self.select_address(service_name).await?;
        let uri = format!("http://{}{}", addr.addr, path);
        Request::builder()
            .method(method)
            .uri(uri)
            .body(body.unwrap_or_default())
            .map_err(|e| RelayError::InvalidRequest(e.to_string()))
    }

    async fn select_address(&self, service_name: &str) -> Result<Address> {
        let resolvers = self.resolvers.read().await;
        let resolver = resolvers
            .get(service_name)
            .ok_or_else(|| RelayError::ResolverNotFound(service_name.to_string()))?;
        let state = resolver.get_state().await;
        state
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| RelayError::NoAddress(service_name.to_string()))
    }

    /// 执行请求并解码类型化响应
    ///
    /// 非 2xx 时响应体被解码为 [`ErrorPayload`] 并作为
    /// [`RelayError::Status`] 返回；2xx 时按 Content-Type 选择解码器
    /// 解码为 `T`，未知子类型回退 JSON
    pub async fn call<T: DeserializeOwned>(&self, req: Request<Bytes>) -> Result<T> {
        let response = self.transport.round_trip(req).await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.into_body();

        if !status.is_success() {
            let payload: ErrorPayload = self.codecs.decode(&content_type, &body)?;
            return Err(RelayError::Status(payload));
        }
        self.codecs.decode(&content_type, &body)
    }

    /// 执行请求并返回原始响应
    ///
    /// 不检查状态码、不解码，响应体已完整缓冲
    pub async fn send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        self.transport.round_trip(req).await
    }
}
