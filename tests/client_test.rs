//! Client 传输与解码集成测试
//!
//! 用 mock round-tripper 替代真实网络，覆盖解码选择、结构化错误、
//! 超时、User-Agent 注入和中间件链

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{HeaderValue, Request, Response, StatusCode};
use relay_http_client::{
    Client, ClientBuilder, Handler, Middleware, RelayError, RoundTrip, TransportKind,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

/// 固定应答的 mock 传输，记录收到的最后一个请求
struct MockTransport {
    status: StatusCode,
    content_type: &'static str,
    body: Bytes,
    last_request: Mutex<Option<Request<Bytes>>>,
}

impl MockTransport {
    fn new(status: StatusCode, content_type: &'static str, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            content_type,
            body: Bytes::from(body.to_string()),
            last_request: Mutex::new(None),
        })
    }

    fn last_request(&self) -> Option<Request<Bytes>> {
        self.last_request.lock().unwrap().take()
    }
}

#[async_trait]
impl RoundTrip for MockTransport {
    async fn round_trip(
        &self,
        req: Request<Bytes>,
    ) -> relay_http_client::Result<Response<Bytes>> {
        *self.last_request.lock().unwrap() = Some(req);
        let response = Response::builder()
            .status(self.status)
            .header(CONTENT_TYPE, self.content_type)
            .body(self.body.clone())
            .expect("Failed to build mock response");
        Ok(response)
    }
}

/// 永不应答的传输，用于超时场景
struct NeverTransport;

#[async_trait]
impl RoundTrip for NeverTransport {
    async fn round_trip(
        &self,
        _req: Request<Bytes>,
    ) -> relay_http_client::Result<Response<Bytes>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Err(RelayError::transport("unreachable"))
    }
}

fn client_with(transport: Arc<dyn RoundTrip>) -> Client {
    ClientBuilder::new()
        .transport(transport)
        .build()
        .expect("Failed to build client")
}

fn get_request(path: &str) -> Request<Bytes> {
    Request::builder()
        .method(http::Method::GET)
        .uri(format!("http://10.0.0.1:8080{}", path))
        .body(Bytes::new())
        .expect("Failed to build request")
}

#[derive(Debug, Deserialize, PartialEq)]
struct Profile {
    name: String,
    zone: String,
}

/// 测试：2xx 响应按 Content-Type 解码为目标类型
#[tokio::test]
async fn test_call_decodes_success_body() {
    let mock = MockTransport::new(
        StatusCode::OK,
        "application/json; charset=utf-8",
        r#"{"name":"alice","zone":"a"}"#,
    );
    let client = client_with(mock);

    let profile: Profile = client
        .call(get_request("/v1/profile"))
        .await
        .expect("Failed to call");
    assert_eq!(
        profile,
        Profile {
            name: "alice".to_string(),
            zone: "a".to_string()
        }
    );
}

/// 测试：未注册的子类型回退到 JSON 解码
#[tokio::test]
async fn test_call_falls_back_to_json_for_unknown_subtype() {
    let mock = MockTransport::new(
        StatusCode::OK,
        "application/x-custom",
        r#"{"name":"bob","zone":"b"}"#,
    );
    let client = client_with(mock);

    let profile: Profile = client
        .call(get_request("/v1/profile"))
        .await
        .expect("Failed to call");
    assert_eq!(profile.name, "bob");
}

/// 测试：非 2xx 响应体解码为结构化错误
#[tokio::test]
async fn test_call_returns_structured_error_on_non_2xx() {
    let mock = MockTransport::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "application/json",
        r#"{"code":500,"reason":"INTERNAL","message":"boom","metadata":{"trace":"t-1"}}"#,
    );
    let client = client_with(mock);

    let err = client
        .call::<Profile>(get_request("/v1/profile"))
        .await
        .expect_err("call should fail");
    let payload = err.as_status().expect("expected a status error");
    assert_eq!(payload.code, 500);
    assert_eq!(payload.reason, "INTERNAL");
    assert_eq!(payload.metadata.get("trace").map(String::as_str), Some("t-1"));
}

/// 测试：错误负载本身解码失败时上抛解码错误，不吞掉
#[tokio::test]
async fn test_call_surfaces_error_payload_decode_failure() {
    let mock = MockTransport::new(
        StatusCode::BAD_GATEWAY,
        "application/json",
        "<html>bad gateway</html>",
    );
    let client = client_with(mock);

    let err = client
        .call::<Profile>(get_request("/v1/profile"))
        .await
        .expect_err("call should fail");
    assert!(matches!(err, RelayError::Decode(_)));
}

/// 测试：send 返回原始响应，不做状态码解释
#[tokio::test]
async fn test_send_returns_raw_response() {
    let mock = MockTransport::new(StatusCode::NOT_FOUND, "application/json", r#"{"x":1}"#);
    let client = client_with(mock);

    let response = client
        .send(get_request("/v1/profile"))
        .await
        .expect("send should not interpret status");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.body().as_ref(), br#"{"x":1}"#);
}

/// 测试：超时内无应答时返回 Timeout
#[tokio::test]
async fn test_round_trip_times_out() {
    let client = ClientBuilder::new()
        .transport(Arc::new(NeverTransport))
        .timeout(Duration::from_millis(50))
        .build()
        .expect("Failed to build client");

    let err = client
        .send(get_request("/slow"))
        .await
        .expect_err("request should time out");
    assert!(matches!(err, RelayError::Timeout(_)));
}

/// 测试：默认 User-Agent 仅在请求未携带时注入
#[tokio::test]
async fn test_default_user_agent_injection() {
    let mock = MockTransport::new(StatusCode::OK, "application/json", "{}");
    let client = ClientBuilder::new()
        .transport(mock.clone())
        .user_agent("relay/0.2")
        .build()
        .expect("Failed to build client");

    client
        .send(get_request("/v1/a"))
        .await
        .expect("Failed to send");
    let seen = mock.last_request().expect("request not recorded");
    assert_eq!(
        seen.headers().get(USER_AGENT),
        Some(&HeaderValue::from_static("relay/0.2"))
    );

    // 已携带 User-Agent 的请求保持原样
    let mut req = get_request("/v1/b");
    req.headers_mut()
        .insert(USER_AGENT, HeaderValue::from_static("custom/1.0"));
    client.send(req).await.expect("Failed to send");
    let seen = mock.last_request().expect("request not recorded");
    assert_eq!(
        seen.headers().get(USER_AGENT),
        Some(&HeaderValue::from_static("custom/1.0"))
    );
}

/// 测试：中间件可改写请求并观察传输类型标记
#[tokio::test]
async fn test_middleware_wraps_the_call() {
    let mock = MockTransport::new(StatusCode::OK, "application/json", "{}");
    let saw_http_kind = Arc::new(AtomicBool::new(false));

    let flag = saw_http_kind.clone();
    let middleware: Middleware = Arc::new(move |next: Handler| {
        let flag = flag.clone();
        let wrapped: Handler = Arc::new(move |mut req: Request<Bytes>| {
            let next = next.clone();
            let flag = flag.clone();
            Box::pin(async move {
                if req.extensions().get::<TransportKind>() == Some(&TransportKind::Http) {
                    flag.store(true, Ordering::SeqCst);
                }
                req.headers_mut()
                    .insert("x-trace-id", HeaderValue::from_static("t-42"));
                next(req).await
            })
        });
        wrapped
    });

    let client = ClientBuilder::new()
        .transport(mock.clone())
        .middleware(middleware)
        .build()
        .expect("Failed to build client");

    client
        .send(get_request("/v1/a"))
        .await
        .expect("Failed to send");

    assert!(saw_http_kind.load(Ordering::SeqCst));
    let seen = mock.last_request().expect("request not recorded");
    assert_eq!(
        seen.headers().get("x-trace-id"),
        Some(&HeaderValue::from_static("t-42"))
    );
}

/// 测试：中间件可短路，基础传输完全不被调用
#[tokio::test]
async fn test_middleware_short_circuit() {
    let middleware: Middleware = Arc::new(|_next: Handler| {
        let wrapped: Handler = Arc::new(|_req: Request<Bytes>| {
            Box::pin(async {
                let response = Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Bytes::from_static(br#"{"name":"cached","zone":"z"}"#))
                    .expect("Failed to build response");
                Ok(response)
            })
        });
        wrapped
    });

    // 基础传输永不应答；只有短路生效时 call 才能成功
    let client = ClientBuilder::new()
        .transport(Arc::new(NeverTransport))
        .middleware(middleware)
        .build()
        .expect("Failed to build client");

    let profile: Profile = client
        .call(get_request("/v1/profile"))
        .await
        .expect("middleware should short-circuit");
    assert_eq!(profile.name, "cached");
}
