//! HTTP 传输层
//!
//! [`Transport`] 包装一个基础 round-tripper：注入默认 User-Agent、
//! 施加单次请求超时、把实际网络调用穿过可选的中间件链。
//! 核心层不做重试，一次失败就是一次错误；重试策略属于中间件

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::USER_AGENT;
use http::{HeaderValue, Request, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{RelayError, Result};

/// 请求扩展中携带的传输类型标记，供中间件识别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
}

/// 一次完整的请求处理函数
///
/// 中间件收到的就是这个形状：输入请求、产出响应或错误
pub type Handler =
    Arc<dyn Fn(Request<Bytes>) -> BoxFuture<'static, Result<Response<Bytes>>> + Send + Sync>;

/// 中间件：包装一个 [`Handler`]，返回同形状的新 [`Handler`]
///
/// 中间件可以短路、重试、记录日志或改写请求；每个请求最多被
/// 中间件链包装一次
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// 基础 round-tripper 接口
///
/// 执行一次 HTTP 请求/响应交换，响应体完整缓冲为 [`Bytes`]
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(&self, req: Request<Bytes>) -> Result<Response<Bytes>>;
}

/// 默认基础传输（reqwest）
///
/// 连接池等由 reqwest 自身提供，本层不再额外池化
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// 创建默认基础传输
    pub fn new() -> Result<Self> {
        let inner = reqwest::Client::builder()
            .build()
            .map_err(RelayError::transport)?;
        Ok(Self { inner })
    }

    /// 复用已有的 reqwest Client
    pub fn from_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl RoundTrip for ReqwestTransport {
    async fn round_trip(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = req.into_parts();
        let url = reqwest::Url::parse(&parts.uri.to_string())
            .map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        let request = self
            .inner
            .request(parts.method, url)
            .headers(parts.headers)
            .body(body)
            .build()
            .map_err(RelayError::transport)?;

        let response = self
            .inner
            .execute(request)
            .await
            .map_err(RelayError::transport)?;

        let mut builder = Response::builder().status(response.status());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }
        let body = response.bytes().await.map_err(RelayError::transport)?;
        builder.body(body).map_err(RelayError::transport)
    }
}

/// HTTP 传输层
pub struct Transport {
    user_agent: Option<HeaderValue>,
    timeout: Duration,
    base: Arc<dyn RoundTrip>,
    middleware: Option<Middleware>,
}

impl Transport {
    pub(crate) fn new(
        base: Arc<dyn RoundTrip>,
        timeout: Duration,
        user_agent: Option<HeaderValue>,
        middleware: Option<Middleware>,
    ) -> Self {
        Self {
            user_agent,
            timeout,
            base,
            middleware,
        }
    }

    /// 执行一次请求
    ///
    /// 超时与底层调用同时计时，先到者为准；超时后在途的 future 被
    /// 丢弃，取消随之传播到底层网络调用和等待中的中间件
    pub async fn round_trip(&self, mut req: Request<Bytes>) -> Result<Response<Bytes>> {
        if let Some(ua) = &self.user_agent {
            if !req.headers().contains_key(USER_AGENT) {
                req.headers_mut().insert(USER_AGENT, ua.clone());
            }
        }
        req.extensions_mut().insert(TransportKind::Http);

        let base = self.base.clone();
        let handler: Handler = Arc::new(move |req| {
            let base = base.clone();
            Box::pin(async move { base.round_trip(req).await })
        });
        let handler = match &self.middleware {
            Some(middleware) => middleware(handler),
            None => handler,
        };

        match tokio::time::timeout(self.timeout, handler(req)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::Timeout(self.timeout)),
        }
    }
}
