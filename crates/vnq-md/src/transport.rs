//! Transport boundary for provider requests.
//!
//! This module defines **only** the request shape, proxy configuration and the
//! [`Transport`] trait. The adapter builds a [`TransportRequest`] and hands it
//! over; headers, retries, proxy selection and request logging are the
//! transport's business. See `http.rs` for the default implementation.

use std::fmt;

use serde_json::Value;

// ---------------------------------------------------------------------------
// Proxy configuration
// ---------------------------------------------------------------------------

/// How a proxy is picked from [`ProxyConfig::proxy_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyMode {
    /// Each proxy in order until one succeeds.
    #[default]
    Try,
    /// Round-robin across calls.
    Rotate,
    /// Always the first proxy.
    Single,
}

impl ProxyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "try" => Some(ProxyMode::Try),
            "rotate" => Some(ProxyMode::Rotate),
            "single" => Some(ProxyMode::Single),
            _ => None,
        }
    }
}

/// Route taken by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    #[default]
    Direct,
    /// Through one of the configured HTTP(S)/SOCKS proxies.
    Proxy,
    /// Wrapped in an envelope and posted to a relay endpoint.
    HfProxy,
}

impl RequestMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(RequestMode::Direct),
            "proxy" => Some(RequestMode::Proxy),
            "hf_proxy" | "hf-proxy" | "relay" => Some(RequestMode::HfProxy),
            _ => None,
        }
    }
}

/// Proxy bundle forwarded with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    pub proxy_list: Vec<String>,
    pub proxy_mode: ProxyMode,
    pub request_mode: RequestMode,
    /// Relay endpoint used when `request_mode == HfProxy`.
    pub hf_proxy_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Everything a transport needs for one exchange.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub method: HttpMethod,
    /// JSON body for POST, query parameters for GET.
    pub payload: Option<Value>,
    /// Log the exchange at `info` instead of `debug`.
    pub show_log: bool,
    pub proxy: ProxyConfig,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that a [`Transport`] implementation may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network failure, timeout, or a proxy that could not be reached.
    Request(String),
    /// The upstream answered with a non-success HTTP status.
    Status { status: u16, body: String },
    /// A response body could not be decoded as JSON.
    Decode(String),
    /// The transport or proxy configuration is unusable.
    Config(String),
}

impl TransportError {
    /// Worth another attempt: network failures, throttling and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request(_) => true,
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Decode(_) | TransportError::Config(_) => false,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Request(msg) => write!(f, "transport error: {msg}"),
            TransportError::Status { status, body } if body.is_empty() => {
                write!(f, "provider http error status={status}")
            }
            TransportError::Status { status, body } => {
                write!(f, "provider http error status={status}: {body}")
            }
            TransportError::Decode(msg) => write!(f, "decode error: {msg}"),
            TransportError::Config(msg) => write!(f, "transport config error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Network collaborator used by the adapter.
///
/// `Ok(None)` means the provider had nothing to return. Implementations must
/// be object-safe and `Send + Sync` so a `Quote` can hold a `Box<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn send_request(&self, req: &TransportRequest) -> Result<Option<Value>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_request(&self, req: &TransportRequest) -> Result<Option<Value>, TransportError> {
        (**self).send_request(req)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send_request(&self, req: &TransportRequest) -> Result<Option<Value>, TransportError> {
        (**self).send_request(req)
    }
}

/// `null`, `[]`, `{}` and `""` all mean "no data".
pub fn is_empty_payload(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
