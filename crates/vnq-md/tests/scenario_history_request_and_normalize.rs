//! Scenario: history requests are built from the validated window and the
//! provider's columnar bars come back as a canonical table.
//!
//! Validates:
//! - date-only end advanced one day, count estimated from business days
//! - gap-chart payload shape (`timeFrame`, `symbols`, `to`, `countBack`)
//! - daily bars carry a Date column and rounded prices
//! - 5m bars are resampled from the provider's 1m bars
//! - validation failures never reach the transport
//! - empty provider answers are `NoData`, transport errors pass through

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use vnq_md::error::QuoteError;
use vnq_md::market::{MarketClock, MarketStatus, VnMarketClock};
use vnq_md::schema::{IntervalCode, IntervalMap, ProviderSchema};
use vnq_md::table::{ColumnData, Dtype};
use vnq_md::transport::{HttpMethod, Transport, TransportError, TransportRequest};
use vnq_md::{BarTime, HistoryQuery, OhlcRecord, Quote, Timeframe};

struct Recording {
    response: Result<Option<Value>, TransportError>,
    seen: Mutex<Vec<TransportRequest>>,
}

impl Recording {
    fn answering(response: Option<Value>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(response),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: TransportError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(err),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for Recording {
    fn send_request(&self, req: &TransportRequest) -> Result<Option<Value>, TransportError> {
        self.seen.lock().unwrap().push(req.clone());
        self.response.clone()
    }
}

struct FixedClock(NaiveDateTime);

impl MarketClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }

    fn trading_hours(&self, at: NaiveDateTime) -> MarketStatus {
        VnMarketClock::default().trading_hours(at)
    }
}

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn quote(symbol: &str, transport: Arc<Recording>) -> Quote {
    Quote::builder(symbol)
        .transport(transport)
        .clock(Arc::new(FixedClock(dt("2024-01-08 10:00:00"))))
        .build()
        .unwrap()
}

/// Three daily bars at local midnight of 2024-01-02..04 (Asia/Ho_Chi_Minh).
fn daily_bars() -> Value {
    json!([{
        "symbol": "ACB",
        "t": ["1704128400", "1704214800", "1704301200"],
        "o": ["23.1", "23.2", "23.3"],
        "h": [23.5, 23.6, 23.7],
        "l": [22.9, 23.0, 23.1],
        "c": [23.456, 23.5, 23.62],
        "v": [1_000_000, "1200000", 900000]
    }])
}

#[test]
fn daily_history_builds_payload_and_date_table() {
    let t = Recording::answering(Some(daily_bars()));
    let q = quote("acb", t.clone());

    let table = q
        .history(&HistoryQuery::new("2024-01-01").end("2024-01-05"))
        .unwrap();

    let reqs = t.requests();
    assert_eq!(reqs.len(), 1);
    let req = &reqs[0];
    assert_eq!(req.method, HttpMethod::Post);
    assert_eq!(
        req.url,
        "https://trading.vietcap.com.vn/api/chart/OHLCChart/gap-chart"
    );
    // end 2024-01-05 (date only) -> 2024-01-06 00:00 local; 5 business days + 1.
    assert_eq!(
        req.payload,
        Some(json!({
            "timeFrame": "ONE_DAY",
            "symbols": ["ACB"],
            "to": 1_704_474_000,
            "countBack": 6
        }))
    );
    assert!(req
        .headers
        .iter()
        .any(|(k, v)| k == "Referer" && v == "https://trading.vietcap.com.vn/"));

    assert_eq!(table.dtype("time"), Some(Dtype::Date));
    assert_eq!(table.attr("source"), Some("VCI"));
    assert_eq!(table.attr("interval"), Some("1D"));

    let rows: Vec<OhlcRecord> = table.records().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0].time,
        BarTime::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    );
    assert_eq!(rows[0].open, 23.1);
    assert_eq!(rows[0].close, 23.46);
    assert_eq!(rows[1].volume, 1_200_000);
}

#[test]
fn history_without_end_uses_fallback_and_tomorrow() {
    let t = Recording::answering(Some(daily_bars()));
    let q = quote("ACB", t.clone());

    q.history(&HistoryQuery::new("2023-01-01")).unwrap();

    let payload = t.requests()[0].payload.clone().unwrap();
    assert_eq!(payload["countBack"], 1000);
    // clock 2024-01-08 10:00 local + 1 day == 2024-01-09 03:00 UTC
    assert_eq!(payload["to"], 1_704_769_200);
}

#[test]
fn explicit_count_back_and_floating_win() {
    let t = Recording::answering(Some(daily_bars()));
    let q = quote("ACB", t.clone());

    let table = q
        .history(
            &HistoryQuery::new("2024-01-01")
                .end("2024-01-05")
                .count_back(3)
                .floating(1),
        )
        .unwrap();

    assert_eq!(t.requests()[0].payload.as_ref().unwrap()["countBack"], 3);
    assert_eq!(
        table.column("close"),
        Some(&ColumnData::Float64(vec![Some(23.5), Some(23.5), Some(23.6)]))
    );
}

#[test]
fn five_minute_history_is_resampled_from_minute_bars() {
    // 09:00, 09:01 and 09:05 local on 2024-01-02.
    let bars = json!([{
        "t": [1_704_160_800, 1_704_160_860, 1_704_161_100],
        "o": [10.0, 10.5, 11.0],
        "h": [10.6, 10.9, 11.2],
        "l": [9.9, 10.4, 10.8],
        "c": [10.5, 10.8, 11.1],
        "v": [100, 200, 300]
    }]);
    let t = Recording::answering(Some(bars));
    let q = quote("ACB", t.clone());

    let table = q
        .history(
            &HistoryQuery::new("2024-01-02 09:00:00")
                .end("2024-01-02 10:00:00")
                .interval("5m"),
        )
        .unwrap();

    let payload = t.requests()[0].payload.clone().unwrap();
    assert_eq!(payload["timeFrame"], "ONE_MINUTE");
    // one business day * 6.5h * 60 + 1
    assert_eq!(payload["countBack"], 391);

    assert_eq!(table.dtype("time"), Some(Dtype::Datetime));
    assert_eq!(
        table.column("time"),
        Some(&ColumnData::Datetime(vec![
            Some(dt("2024-01-02 09:00:00")),
            Some(dt("2024-01-02 09:05:00")),
        ]))
    );
    assert_eq!(
        table.column("high"),
        Some(&ColumnData::Float64(vec![Some(10.9), Some(11.2)]))
    );
    assert_eq!(
        table.column("volume"),
        Some(&ColumnData::Int64(vec![Some(300), Some(300)]))
    );
}

#[test]
fn index_symbols_are_sent_with_provider_names() {
    let t = Recording::answering(Some(daily_bars()));
    let q = quote("hnxindex", t.clone());
    assert_eq!(q.symbol(), "HNXIndex");

    q.history(&HistoryQuery::new("2024-01-01").end("2024-01-05"))
        .unwrap();
    assert_eq!(
        t.requests()[0].payload.as_ref().unwrap()["symbols"],
        json!(["HNXIndex"])
    );
}

#[test]
fn validation_errors_do_not_reach_transport() {
    let t = Recording::answering(Some(daily_bars()));
    let q = quote("ACB", t.clone());

    let err = q
        .history(&HistoryQuery::new("2024-01-01").interval("2h"))
        .unwrap_err();
    assert!(matches!(err, QuoteError::InvalidInterval { .. }));

    let err = q
        .history(&HistoryQuery::new("2024-13-01"))
        .unwrap_err();
    assert!(matches!(err, QuoteError::InvalidDateFormat { .. }));

    let err = q
        .history(&HistoryQuery::new("2024-02-01").end("2024-01-01"))
        .unwrap_err();
    assert!(matches!(err, QuoteError::InvalidRange { .. }));

    assert!(t.requests().is_empty());
}

#[test]
fn interval_missing_from_configured_map_fails_before_network() {
    let t = Recording::answering(Some(daily_bars()));
    let mut schema = ProviderSchema::vci();
    schema.intervals = IntervalMap::new([(
        Timeframe::D1,
        IntervalCode {
            code: "ONE_DAY".to_string(),
            native: Timeframe::D1,
        },
    )]);
    let q = Quote::builder("ACB")
        .schema(schema)
        .transport(t.clone())
        .clock(Arc::new(FixedClock(dt("2024-01-08 10:00:00"))))
        .build()
        .unwrap();

    let err = q
        .history(&HistoryQuery::new("2024-01-01").interval("1H"))
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid interval '1H'. choose one of: 1D");
    assert!(t.requests().is_empty());
}

#[test]
fn empty_answers_are_no_data() {
    let q = quote("ACB", Recording::answering(None));
    let err = q.history(&HistoryQuery::new("2024-01-01")).unwrap_err();
    assert!(matches!(err, QuoteError::NoData { ref symbol } if symbol == "ACB"));

    // Injected transports may hand back empty JSON instead of `None`.
    for empty in [json!([]), json!(null), json!({})] {
        let t = Recording::answering(Some(empty.clone()));
        let q = quote("ACB", t.clone());
        let err = q.history(&HistoryQuery::new("2024-01-01")).unwrap_err();
        assert!(matches!(err, QuoteError::NoData { .. }), "{empty} -> {err}");
        assert_eq!(t.requests().len(), 1);
    }

    let empty_arrays = json!([{"t": [], "o": [], "h": [], "l": [], "c": [], "v": []}]);
    let q = quote("ACB", Recording::answering(Some(empty_arrays)));
    let err = q.history(&HistoryQuery::new("2024-01-01")).unwrap_err();
    assert!(matches!(err, QuoteError::NoData { .. }));
}

#[test]
fn transport_errors_pass_through_unmodified() {
    let q = quote(
        "ACB",
        Recording::failing(TransportError::Status {
            status: 503,
            body: "busy".to_string(),
        }),
    );
    let err = q.history(&HistoryQuery::new("2024-01-01")).unwrap_err();
    match err {
        QuoteError::Transport(TransportError::Status { status, .. }) => assert_eq!(status, 503),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_bars_are_decode_errors() {
    let q = quote("ACB", Recording::answering(Some(json!([{"t": [1]}]))));
    let err = q.history(&HistoryQuery::new("2024-01-01")).unwrap_err();
    assert!(matches!(err, QuoteError::Decode(_)));
}
