//! Typed adapter settings read from canonical config JSON (as produced by
//! `vnq-config`).
//!
//! Every key is optional; a missing key keeps its default. A key that is
//! present but malformed is an error naming the key.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde_json::Value;

use crate::estimator::TradingCalendar;
use crate::http::HttpSettings;
use crate::schema::{DEFAULT_USER_AGENT, VCI_BASE_URL};
use crate::transport::{ProxyConfig, ProxyMode, RequestMode};

/// Intraday page sizes above this log a warning.
pub const DEFAULT_PAGE_SIZE_WARN_THRESHOLD: u32 = 30_000;

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSettings {
    pub base_url: String,
    pub user_agent: String,
    pub http: HttpSettings,
    pub proxy: ProxyConfig,
    pub calendar: TradingCalendar,
    pub page_size_warn_threshold: u32,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            base_url: VCI_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http: HttpSettings::default(),
            proxy: ProxyConfig::default(),
            calendar: TradingCalendar::default(),
            page_size_warn_threshold: DEFAULT_PAGE_SIZE_WARN_THRESHOLD,
        }
    }
}

fn str_at<'a>(cfg: &'a Value, ptr: &str) -> Result<Option<&'a str>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(anyhow!("config {ptr} must be a string (got {other})")),
    }
}

/// Numbers may be written as JSON numbers or numeric strings (env overrides).
fn u64_at(cfg: &Value, ptr: &str) -> Result<Option<u64>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .with_context(|| format!("config {ptr} must be a non-negative integer (got {n})")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("config {ptr} must be a non-negative integer (got '{s}')")),
        Some(other) => Err(anyhow!("config {ptr} must be a non-negative integer (got {other})")),
    }
}

fn u32_at(cfg: &Value, ptr: &str) -> Result<Option<u32>> {
    u64_at(cfg, ptr)?
        .map(|v| u32::try_from(v).with_context(|| format!("config {ptr} is too large ({v})")))
        .transpose()
}

fn f64_at(cfg: &Value, ptr: &str) -> Result<Option<f64>> {
    match cfg.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("config {ptr} must be a number (got '{s}')")),
        Some(other) => Err(anyhow!("config {ptr} must be a number (got {other})")),
    }
}

impl QuoteSettings {
    /// Build from canonical config JSON.
    ///
    /// Optional (defaults in brackets):
    /// - provider.base_url [VCI]
    /// - network.timeout_secs [30], network.max_retries [3],
    ///   network.retry_delay_ms [1000], network.user_agent [browser UA]
    /// - proxy.list [], proxy.mode [try], proxy.request_mode [direct],
    ///   proxy.hf_proxy_url
    /// - calendar.session_hours [6.5], calendar.fallback_count [1000],
    ///   calendar.timezone [Asia/Ho_Chi_Minh]
    /// - intraday.page_size_warn_threshold [30000]
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let mut s = Self::default();

        if let Some(url) = str_at(cfg, "/provider/base_url")? {
            if url.trim().is_empty() {
                return Err(anyhow!("config /provider/base_url must not be empty"));
            }
            s.base_url = url.trim().to_string();
        }

        if let Some(secs) = u64_at(cfg, "/network/timeout_secs")? {
            if secs == 0 {
                return Err(anyhow!("config /network/timeout_secs must be > 0"));
            }
            s.http.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = u32_at(cfg, "/network/max_retries")? {
            s.http.max_retries = n;
        }
        if let Some(ms) = u64_at(cfg, "/network/retry_delay_ms")? {
            s.http.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ua) = str_at(cfg, "/network/user_agent")? {
            s.user_agent = ua.to_string();
        }

        match cfg.pointer("/proxy/list") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                s.proxy.proxy_list = items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(|p| p.trim().to_string())
                            .context("config /proxy/list entries must be strings")
                    })
                    .collect::<Result<Vec<_>>>()?;
            }
            Some(other) => return Err(anyhow!("config /proxy/list must be a list (got {other})")),
        }
        if let Some(mode) = str_at(cfg, "/proxy/mode")? {
            s.proxy.proxy_mode = ProxyMode::parse(mode)
                .with_context(|| format!("config /proxy/mode: unknown value '{mode}' (try|rotate|single)"))?;
        }
        if let Some(mode) = str_at(cfg, "/proxy/request_mode")? {
            s.proxy.request_mode = RequestMode::parse(mode).with_context(|| {
                format!("config /proxy/request_mode: unknown value '{mode}' (direct|proxy|hf_proxy)")
            })?;
        }
        if let Some(url) = str_at(cfg, "/proxy/hf_proxy_url")? {
            let url = url.trim();
            s.proxy.hf_proxy_url = (!url.is_empty()).then(|| url.to_string());
        }

        if let Some(h) = f64_at(cfg, "/calendar/session_hours")? {
            if !(h > 0.0 && h <= 24.0) {
                return Err(anyhow!("config /calendar/session_hours must be in (0, 24] (got {h})"));
            }
            s.calendar.session_hours = h;
        }
        if let Some(n) = u32_at(cfg, "/calendar/fallback_count")? {
            s.calendar.fallback_count = n;
        }
        if let Some(name) = str_at(cfg, "/calendar/timezone")? {
            s.calendar.tz = name
                .parse::<Tz>()
                .map_err(|e| anyhow!("config /calendar/timezone: {e}"))?;
        }

        if let Some(n) = u32_at(cfg, "/intraday/page_size_warn_threshold")? {
            s.page_size_warn_threshold = n;
        }

        s.check()?;
        Ok(s)
    }

    /// Cross-field checks.
    fn check(&self) -> Result<()> {
        match self.proxy.request_mode {
            RequestMode::Proxy if self.proxy.proxy_list.is_empty() => Err(anyhow!(
                "config /proxy/request_mode=proxy requires a non-empty /proxy/list"
            )),
            RequestMode::HfProxy if self.proxy.hf_proxy_url.is_none() => Err(anyhow!(
                "config /proxy/request_mode=hf_proxy requires /proxy/hf_proxy_url"
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_gives_defaults() {
        let s = QuoteSettings::from_config_json(&json!({})).unwrap();
        assert_eq!(s, QuoteSettings::default());
        assert_eq!(s.calendar.fallback_count, 1000);
        assert_eq!(s.page_size_warn_threshold, 30_000);
    }

    #[test]
    fn reads_all_sections() {
        let cfg = json!({
            "provider": {"base_url": "http://127.0.0.1:8080/api/"},
            "network": {"timeout_secs": 5, "max_retries": "1", "retry_delay_ms": 10, "user_agent": "ua"},
            "proxy": {"list": ["http://10.0.0.1:3128"], "mode": "rotate", "request_mode": "proxy"},
            "calendar": {"session_hours": 4.5, "fallback_count": 200, "timezone": "Asia/Bangkok"},
            "intraday": {"page_size_warn_threshold": 500}
        });
        let s = QuoteSettings::from_config_json(&cfg).unwrap();
        assert_eq!(s.base_url, "http://127.0.0.1:8080/api/");
        assert_eq!(s.http.timeout, Duration::from_secs(5));
        assert_eq!(s.http.max_retries, 1);
        assert_eq!(s.http.retry_delay, Duration::from_millis(10));
        assert_eq!(s.user_agent, "ua");
        assert_eq!(s.proxy.proxy_mode, ProxyMode::Rotate);
        assert_eq!(s.proxy.request_mode, RequestMode::Proxy);
        assert_eq!(s.calendar.session_hours, 4.5);
        assert_eq!(s.calendar.fallback_count, 200);
        assert_eq!(s.calendar.tz, chrono_tz::Asia::Bangkok);
        assert_eq!(s.page_size_warn_threshold, 500);
    }

    #[test]
    fn malformed_values_name_the_key() {
        let err = QuoteSettings::from_config_json(&json!({"network": {"timeout_secs": "soon"}}))
            .unwrap_err();
        assert!(format!("{err:#}").contains("/network/timeout_secs"));

        let err = QuoteSettings::from_config_json(&json!({"proxy": {"mode": "random"}})).unwrap_err();
        assert!(err.to_string().contains("/proxy/mode"));

        let err = QuoteSettings::from_config_json(&json!({"calendar": {"timezone": "Mars/Base"}}))
            .unwrap_err();
        assert!(err.to_string().contains("/calendar/timezone"));
    }

    #[test]
    fn relay_mode_requires_url() {
        let err = QuoteSettings::from_config_json(&json!({"proxy": {"request_mode": "hf_proxy"}}))
            .unwrap_err();
        assert!(err.to_string().contains("hf_proxy_url"));

        let ok = QuoteSettings::from_config_json(&json!({
            "proxy": {"request_mode": "hf_proxy", "hf_proxy_url": "https://relay.example/forward"}
        }))
        .unwrap();
        assert_eq!(ok.proxy.hf_proxy_url.as_deref(), Some("https://relay.example/forward"));
    }
}
