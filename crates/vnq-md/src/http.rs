//! Blocking HTTP transport (reqwest).
//!
//! Owns retries, proxy selection and request logging for the adapter. One
//! `HttpTransport` keeps a direct client for its lifetime; proxied clients
//! are built per exchange because each proxy needs its own client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::transport::{
    is_empty_payload, HttpMethod, ProxyConfig, ProxyMode, RequestMode, Transport, TransportError,
    TransportRequest,
};

/// Upper bound on how much of an error body is kept in [`TransportError::Status`].
const ERROR_BODY_PREVIEW: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Extra attempts after the first one for retryable failures.
    pub max_retries: u32,
    /// Linear backoff step: attempt `n` sleeps `n * retry_delay`.
    pub retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub struct HttpTransport {
    settings: HttpSettings,
    direct: Client,
    rotate_cursor: AtomicUsize,
}

impl HttpTransport {
    pub fn new(settings: HttpSettings) -> Result<Self, TransportError> {
        let direct = build_client(&settings, None)?;
        Ok(Self {
            settings,
            direct,
            rotate_cursor: AtomicUsize::new(0),
        })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    fn send_via_proxy(&self, req: &TransportRequest) -> Result<Option<Value>, TransportError> {
        let list = &req.proxy.proxy_list;
        if list.is_empty() {
            return Err(TransportError::Config(
                "request_mode=proxy requires a non-empty proxy list".to_string(),
            ));
        }

        match req.proxy.proxy_mode {
            ProxyMode::Single => {
                let client = build_client(&self.settings, Some(&list[0]))?;
                self.send_with_retries(&client, req)
            }
            ProxyMode::Rotate => {
                let idx = self.rotate_cursor.fetch_add(1, Ordering::Relaxed) % list.len();
                debug!(proxy_index = idx, "rotating proxy");
                let client = build_client(&self.settings, Some(&list[idx]))?;
                self.send_with_retries(&client, req)
            }
            ProxyMode::Try => {
                let mut last_err = None;
                for (idx, proxy) in list.iter().enumerate() {
                    let attempt = build_client(&self.settings, Some(proxy))
                        .and_then(|client| self.send_with_retries(&client, req));
                    match attempt {
                        Ok(v) => return Ok(v),
                        // The provider answered; another proxy will not change that.
                        Err(e) if !e.is_retryable() && !matches!(e, TransportError::Config(_)) => {
                            return Err(e)
                        }
                        Err(e) => {
                            warn!(proxy_index = idx, error = %e, "proxy failed, trying next");
                            last_err = Some(e);
                        }
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    TransportError::Request("all proxies failed".to_string())
                }))
            }
        }
    }

    fn send_via_relay(&self, req: &TransportRequest) -> Result<Option<Value>, TransportError> {
        let relay = req
            .proxy
            .hf_proxy_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                TransportError::Config("request_mode=hf_proxy requires hf_proxy_url".to_string())
            })?;

        let envelope = TransportRequest {
            url: relay.to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            method: HttpMethod::Post,
            payload: Some(relay_envelope(req)),
            show_log: req.show_log,
            proxy: ProxyConfig::default(),
        };
        self.send_with_retries(&self.direct, &envelope)
    }

    fn send_with_retries(
        &self,
        client: &Client,
        req: &TransportRequest,
    ) -> Result<Option<Value>, TransportError> {
        let mut attempt: u32 = 0;
        loop {
            match send_once(client, req) {
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.settings.max_retries,
                        error = %e,
                        "retrying provider request"
                    );
                    thread::sleep(self.settings.retry_delay * attempt);
                }
                other => return other,
            }
        }
    }
}

impl Transport for HttpTransport {
    fn send_request(&self, req: &TransportRequest) -> Result<Option<Value>, TransportError> {
        if req.show_log {
            info!(method = req.method.as_str(), url = %req.url, payload = ?req.payload, "provider request");
        } else {
            debug!(method = req.method.as_str(), url = %req.url, payload = ?req.payload, "provider request");
        }

        let out = match req.proxy.request_mode {
            RequestMode::Direct => self.send_with_retries(&self.direct, req),
            RequestMode::Proxy => self.send_via_proxy(req),
            RequestMode::HfProxy => self.send_via_relay(req),
        };

        if req.show_log {
            match &out {
                Ok(Some(_)) => info!(url = %req.url, "provider response received"),
                Ok(None) => info!(url = %req.url, "provider returned no data"),
                Err(e) => info!(url = %req.url, error = %e, "provider request failed"),
            }
        }
        out
    }
}

fn build_client(settings: &HttpSettings, proxy: Option<&str>) -> Result<Client, TransportError> {
    let mut builder = Client::builder().timeout(settings.timeout);
    builder = match proxy {
        Some(url) => {
            let p = reqwest::Proxy::all(url)
                .map_err(|e| TransportError::Config(format!("invalid proxy '{url}': {e}")))?;
            builder.proxy(p)
        }
        // Direct means direct: ignore HTTP(S)_PROXY from the environment.
        None => builder.no_proxy(),
    };
    builder
        .build()
        .map_err(|e| TransportError::Config(format!("http client build failed: {e}")))
}

fn send_once(client: &Client, req: &TransportRequest) -> Result<Option<Value>, TransportError> {
    let mut rb = match req.method {
        HttpMethod::Get => client.get(&req.url),
        HttpMethod::Post => client.post(&req.url),
    };
    for (k, v) in &req.headers {
        rb = rb.header(k.as_str(), v.as_str());
    }
    if let Some(payload) = &req.payload {
        rb = match req.method {
            HttpMethod::Post => rb.json(payload),
            HttpMethod::Get => rb.query(&query_pairs(payload)),
        };
    }

    let resp = rb
        .send()
        .map_err(|e| TransportError::Request(e.to_string()))?;
    let status = resp.status();
    let body = resp
        .text()
        .map_err(|e| TransportError::Request(format!("reading response body failed: {e}")))?;

    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
            body: body.trim().chars().take(ERROR_BODY_PREVIEW).collect(),
        });
    }

    decode_body(&body)
}

/// Empty bodies and empty JSON containers both decode to "no data".
pub(crate) fn decode_body(body: &str) -> Result<Option<Value>, TransportError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let v: Value = serde_json::from_str(body)
        .map_err(|e| TransportError::Decode(format!("response json decode failed: {e}")))?;
    if is_empty_payload(&v) {
        Ok(None)
    } else {
        Ok(Some(v))
    }
}

/// Body posted to the relay: the original request, described as data.
fn relay_envelope(req: &TransportRequest) -> Value {
    let headers: Map<String, Value> = req
        .headers
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    json!({
        "url": req.url,
        "method": req.method.as_str(),
        "headers": headers,
        "payload": req.payload,
    })
}

fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    let Some(obj) = payload.as_object() else {
        return Vec::new();
    };
    obj.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_body_treats_blank_and_empty_as_no_data() {
        assert_eq!(decode_body("").unwrap(), None);
        assert_eq!(decode_body("  \n").unwrap(), None);
        assert_eq!(decode_body("[]").unwrap(), None);
        assert_eq!(decode_body("null").unwrap(), None);
        assert_eq!(decode_body("[1]").unwrap(), Some(json!([1])));
    }

    #[test]
    fn decode_body_rejects_html() {
        let err = decode_body("<html>blocked</html>").unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[test]
    fn query_pairs_skip_nulls_and_unquote_strings() {
        let pairs = query_pairs(&json!({"symbol": "ACB", "limit": 100, "truncTime": null}));
        assert_eq!(
            pairs,
            vec![
                ("limit".to_string(), "100".to_string()),
                ("symbol".to_string(), "ACB".to_string()),
            ]
        );
    }

    #[test]
    fn relay_envelope_carries_original_request() {
        let req = TransportRequest {
            url: "https://trading.example/api/x".to_string(),
            headers: vec![("Referer".to_string(), "https://trading.example/".to_string())],
            method: HttpMethod::Post,
            payload: Some(json!({"symbol": "ACB"})),
            show_log: false,
            proxy: ProxyConfig::default(),
        };
        let env = relay_envelope(&req);
        assert_eq!(env["url"], "https://trading.example/api/x");
        assert_eq!(env["method"], "POST");
        assert_eq!(env["headers"]["Referer"], "https://trading.example/");
        assert_eq!(env["payload"]["symbol"], "ACB");
    }
}
