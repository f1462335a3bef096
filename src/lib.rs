//! Relay HTTP Client Library
//!
//! Provides a discovery-backed HTTP client: logical service names are
//! resolved through a pluggable registry, kept fresh by background watch
//! tasks, and outgoing requests are routed to one of the live instances.
//!
//! # 使用示例
//!
//! ```no_run
//! use std::sync::Arc;
//! use relay_http_client::{ClientBuilder, MemoryDiscovery, ServiceInstance};
//!
//! # async fn run() -> relay_http_client::Result<()> {
//! // 注册中心（此处为内存实现，生产环境替换为真实注册中心适配）
//! let registry = Arc::new(MemoryDiscovery::new());
//! registry
//!     .set_instances(
//!         "user-service",
//!         vec![ServiceInstance::new("node-1", "user-service")
//!             .with_endpoint("http://10.0.0.1:8080")
//!             .with_metadata("zone", "us-east-1a")],
//!     )
//!     .await;
//!
//! let client = ClientBuilder::new().user_agent("relay/0.2").build()?;
//! client.add_discovery(registry, "user-service").await?;
//!
//! let req = client
//!     .new_request(http::Method::GET, "user-service", "/v1/profile", None)
//!     .await?;
//! let profile: serde_json::Value = client.call(req).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod discovery;
pub mod encoding;
pub mod error;
pub mod resolver;
pub mod transport;

// Re-exports
pub use client::{Client, ClientBuilder, ClientOptions, DEFAULT_TIMEOUT};
pub use discovery::{Discovery, MemoryDiscovery, ServiceInstance, Watcher};
pub use encoding::{content_subtype, Codec, CodecRegistry, JsonCodec};
pub use error::{ErrorPayload, RelayError, Result};
pub use resolver::{Address, AddressSet, Resolver};
pub use transport::{Handler, Middleware, ReqwestTransport, RoundTrip, Transport, TransportKind};
