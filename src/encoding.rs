//! 响应体解码
//!
//! 按响应的 Content-Type 子类型选择解码器；子类型未注册或缺失时
//! 一律回退到 JSON，而不是报错

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{RelayError, Result};

/// Content-Type 主类型前缀
const BASE_CONTENT_TYPE: &str = "application";

/// 解码器接口
///
/// 解码为 `serde_json::Value` 中间表示，使注册表可以对象安全地
/// 持有任意解码器，同时泛型的 [`CodecRegistry::decode`] 保持类型化
pub trait Codec: Send + Sync {
    /// 解码器对应的 Content-Type 子类型（如 `json`）
    fn name(&self) -> &'static str;

    /// 解码字节流
    fn unmarshal(&self, data: &[u8]) -> Result<serde_json::Value>;
}

/// JSON 解码器（默认）
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn unmarshal(&self, data: &[u8]) -> Result<serde_json::Value> {
        serde_json::from_slice(data).map_err(RelayError::decode)
    }
}

/// 解码器注册表
///
/// Client 持有，按子类型精确匹配查找；`json` 始终预注册
pub struct CodecRegistry {
    codecs: HashMap<&'static str, Arc<dyn Codec>>,
    fallback: Arc<dyn Codec>,
}

impl CodecRegistry {
    /// 创建注册表并预注册 JSON 解码器
    pub fn new() -> Self {
        let json: Arc<dyn Codec> = Arc::new(JsonCodec);
        let mut registry = Self {
            codecs: HashMap::new(),
            fallback: json.clone(),
        };
        registry.register(json);
        registry
    }

    /// 注册解码器（同名覆盖）
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.insert(codec.name(), codec);
    }

    /// 按子类型查找解码器
    pub fn get(&self, subtype: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(subtype).cloned()
    }

    /// 按 Content-Type 解码响应体
    ///
    /// 子类型未注册或缺失时回退到 JSON
    pub fn decode<T: DeserializeOwned>(&self, content_type: &str, data: &[u8]) -> Result<T> {
        let codec = content_subtype(content_type)
            .and_then(|subtype| self.get(subtype))
            .unwrap_or_else(|| self.fallback.clone());
        let value = codec.unmarshal(data)?;
        serde_json::from_value(value).map_err(RelayError::decode)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 提取 Content-Type 的子类型
///
/// 仅接受 `application/<subtype>[;params]` 形式，子类型取到可选的
/// `;` 参数分隔符为止
pub fn content_subtype(content_type: &str) -> Option<&str> {
    let rest = content_type.strip_prefix(BASE_CONTENT_TYPE)?;
    let rest = rest.strip_prefix('/')?;
    match rest.find(';') {
        Some(i) => Some(&rest[..i]),
        None => Some(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_extraction() {
        assert_eq!(content_subtype("application/json"), Some("json"));
        assert_eq!(
            content_subtype("application/json; charset=utf-8"),
            Some("json")
        );
        assert_eq!(content_subtype("application/grpc+proto"), Some("grpc+proto"));
        assert_eq!(content_subtype("application"), None);
        assert_eq!(content_subtype("text/plain"), None);
        assert_eq!(content_subtype(""), None);
    }

    #[test]
    fn unknown_subtype_falls_back_to_json() {
        let registry = CodecRegistry::new();
        let value: serde_json::Value = registry
            .decode("application/x-unknown", br#"{"ok":true}"#)
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn missing_content_type_falls_back_to_json() {
        let registry = CodecRegistry::new();
        let value: serde_json::Value = registry.decode("", br#"{"n":1}"#).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn invalid_body_is_a_decode_error() {
        let registry = CodecRegistry::new();
        let err = registry
            .decode::<serde_json::Value>("application/json", b"not json")
            .unwrap_err();
        assert!(matches!(err, RelayError::Decode(_)));
    }
}
