//! Raw provider JSON -> canonical [`Table`].
//!
//! Every function here is driven by injected lookup tables ([`FieldMap`],
//! [`DtypeMap`], [`ValueMap`]); nothing in this module knows a provider's
//! field names.
//!
//! It does **not**:
//! - issue requests (that is `transport.rs` / `http.rs`)
//! - decide which table a response needs (that is `quote.rs`)

use std::collections::BTreeMap;
use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
};
use chrono_tz::Tz;
use serde_json::{Map, Value};

use crate::table::{ColumnData, Dtype, Table};
use crate::{Granularity, Timeframe};

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

static NULL: Value = Value::Null;

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Ordered `raw field -> canonical column` pairs; order fixes column order.
pub type FieldMap = Vec<(String, String)>;
/// `canonical column -> dtype`; columns absent here are kept as `Utf8`.
pub type DtypeMap = BTreeMap<String, Dtype>;
/// `raw value -> display value` for categorical columns.
pub type ValueMap = BTreeMap<String, String>;

pub fn field_map(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(raw, canon)| ((*raw).to_string(), (*canon).to_string()))
        .collect()
}

pub fn dtype_map(pairs: &[(&str, Dtype)]) -> DtypeMap {
    pairs
        .iter()
        .map(|(name, dtype)| ((*name).to_string(), *dtype))
        .collect()
}

pub fn value_map(pairs: &[(&str, &str)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The payload is not the JSON shape the operation expects.
    UnexpectedShape(String),
    /// A mapped field / required column is absent.
    MissingField { field: String },
    /// A cell could not be coerced to its column dtype.
    BadValue {
        column: String,
        value: String,
        expected: Dtype,
    },
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
    DuplicateColumn(String),
    /// A row could not be deserialized into a typed record.
    Record(String),
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::UnexpectedShape(msg) => write!(f, "unexpected response shape: {msg}"),
            NormalizeError::MissingField { field } => {
                write!(f, "response is missing field '{field}'")
            }
            NormalizeError::BadValue {
                column,
                value,
                expected,
            } => write!(
                f,
                "column '{column}': cannot read {value} as {}",
                expected.as_str()
            ),
            NormalizeError::LengthMismatch {
                column,
                expected,
                got,
            } => write!(
                f,
                "column '{column}' has {got} values, expected {expected}"
            ),
            NormalizeError::DuplicateColumn(name) => write!(f, "duplicate column '{name}'"),
            NormalizeError::Record(msg) => write!(f, "record decode failed: {msg}"),
        }
    }
}

impl std::error::Error for NormalizeError {}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

fn number_of(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn int_of(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
        }
        _ => None,
    }
}

/// Epoch seconds (or millis) as wall-clock time in `tz`.
fn epoch_to_local(raw: i64, tz: Tz) -> Option<NaiveDateTime> {
    let utc = if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)?
    } else {
        DateTime::from_timestamp(raw, 0)?
    };
    Some(utc.with_timezone(&tz).naive_local())
}

fn datetime_of(v: &Value, tz: Tz) -> Option<NaiveDateTime> {
    if let Some(raw) = int_of(v) {
        return epoch_to_local(raw, tz);
    }
    let s = v.as_str()?.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&tz).naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce one cell; `Ok(None)` is a null, `Err(())` a type mismatch.
fn cell<T>(v: &Value, read: impl Fn(&Value) -> Option<T>) -> Result<Option<T>, ()> {
    if v.is_null() {
        return Ok(None);
    }
    read(v).map(Some).ok_or(())
}

/// Build one typed column from raw JSON cells.
pub fn build_column<'a>(
    column: &str,
    dtype: Dtype,
    values: impl IntoIterator<Item = &'a Value>,
    tz: Tz,
) -> Result<ColumnData, NormalizeError> {
    fn collect<'a, T>(
        column: &str,
        dtype: Dtype,
        values: impl IntoIterator<Item = &'a Value>,
        read: impl Fn(&Value) -> Option<T>,
    ) -> Result<Vec<Option<T>>, NormalizeError> {
        values
            .into_iter()
            .map(|v| {
                cell(v, &read).map_err(|_| NormalizeError::BadValue {
                    column: column.to_string(),
                    value: v.to_string(),
                    expected: dtype,
                })
            })
            .collect()
    }

    Ok(match dtype {
        Dtype::Float64 => ColumnData::Float64(collect(column, dtype, values, number_of)?),
        Dtype::Int64 => ColumnData::Int64(collect(column, dtype, values, int_of)?),
        Dtype::Utf8 => ColumnData::Utf8(collect(column, dtype, values, text_of)?),
        Dtype::Datetime => {
            ColumnData::Datetime(collect(column, dtype, values, |v| datetime_of(v, tz))?)
        }
        Dtype::Date => ColumnData::Date(collect(column, dtype, values, |v| {
            datetime_of(v, tz).map(|t| t.date())
        })?),
    })
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

/// Columnar payload: one object whose mapped fields are parallel arrays.
///
/// A list is accepted too; its first element is used (the chart endpoint
/// answers with one entry per requested symbol).
pub fn normalize_bars(
    payload: &Value,
    fields: &FieldMap,
    dtypes: &DtypeMap,
    tz: Tz,
) -> Result<Table, NormalizeError> {
    let obj = match payload {
        Value::Array(items) => items.first().and_then(Value::as_object),
        Value::Object(o) => Some(o),
        _ => None,
    }
    .ok_or_else(|| {
        NormalizeError::UnexpectedShape("expected an object of parallel arrays".to_string())
    })?;

    let mut table = Table::new();
    for (raw, canon) in fields {
        let values = obj
            .get(raw)
            .and_then(Value::as_array)
            .ok_or_else(|| NormalizeError::MissingField { field: raw.clone() })?;
        let dtype = dtypes.get(canon).copied().unwrap_or(Dtype::Utf8);
        table.push_column(canon.clone(), build_column(canon, dtype, values, tz)?)?;
    }
    Ok(table)
}

/// Row payload: a list of objects. Only mapped fields are kept, renamed and
/// coerced. A field absent from every row is an error; absent from some rows
/// it becomes null.
pub fn normalize_rows(
    payload: &Value,
    fields: &FieldMap,
    dtypes: &DtypeMap,
    tz: Tz,
) -> Result<Table, NormalizeError> {
    let rows = payload.as_array().ok_or_else(|| {
        NormalizeError::UnexpectedShape("expected a list of records".to_string())
    })?;
    let rows: Vec<&Map<String, Value>> = rows
        .iter()
        .map(|r| {
            r.as_object().ok_or_else(|| {
                NormalizeError::UnexpectedShape(format!("expected a record, got {r}"))
            })
        })
        .collect::<Result<_, _>>()?;

    let mut table = Table::new();
    for (raw, canon) in fields {
        if !rows.is_empty() && rows.iter().all(|r| !r.contains_key(raw)) {
            return Err(NormalizeError::MissingField { field: raw.clone() });
        }
        let dtype = dtypes.get(canon).copied().unwrap_or(Dtype::Utf8);
        let values = rows.iter().map(|r| r.get(raw).unwrap_or(&NULL));
        table.push_column(canon.clone(), build_column(canon, dtype, values, tz)?)?;
    }
    Ok(table)
}

/// Zero-row table carrying the canonical columns of `fields`.
pub fn empty_table(fields: &FieldMap, dtypes: &DtypeMap) -> Table {
    let layout: Vec<(&str, Dtype)> = fields
        .iter()
        .map(|(_, canon)| {
            (
                canon.as_str(),
                dtypes.get(canon).copied().unwrap_or(Dtype::Utf8),
            )
        })
        .collect();
    Table::empty_with_schema(&layout)
}

// ---------------------------------------------------------------------------
// Column transforms
// ---------------------------------------------------------------------------

/// Translate a `Utf8` column through `map`; unmapped values pass through.
pub fn map_values(table: &mut Table, column: &str, map: &ValueMap) -> Result<(), NormalizeError> {
    match table.column_mut(column) {
        Some(ColumnData::Utf8(cells)) => {
            for v in cells.iter_mut().flatten() {
                if let Some(mapped) = map.get(v.as_str()) {
                    *v = mapped.clone();
                }
            }
            Ok(())
        }
        Some(other) => Err(NormalizeError::UnexpectedShape(format!(
            "column '{column}' is {}, expected utf8",
            other.dtype().as_str()
        ))),
        None => Err(NormalizeError::MissingField {
            field: column.to_string(),
        }),
    }
}

/// Append a `Utf8` column holding `value` on every row.
pub fn stamp(table: &mut Table, column: &str, value: &str) -> Result<(), NormalizeError> {
    let cells = vec![Some(value.to_string()); table.height()];
    table.push_column(column, ColumnData::Utf8(cells))
}

/// Beyond this many decimals an f64 has nothing left to round.
const MAX_ROUNDING_DECIMALS: u32 = 15;

/// Round the named `Float64` columns to `decimals` places; others are skipped.
/// More than [`MAX_ROUNDING_DECIMALS`] places leaves values unchanged.
pub fn round_floats(table: &mut Table, columns: &[&str], decimals: u32) {
    if decimals > MAX_ROUNDING_DECIMALS {
        return;
    }
    let factor = 10f64.powi(decimals as i32);
    for name in columns {
        if let Some(ColumnData::Float64(cells)) = table.column_mut(name) {
            for x in cells.iter_mut().flatten() {
                let scaled = *x * factor;
                if scaled.is_finite() {
                    *x = scaled.round() / factor;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resampling
// ---------------------------------------------------------------------------

/// Start of the bucket that `t` falls into for `timeframe`.
fn bucket_start(t: NaiveDateTime, timeframe: Timeframe) -> NaiveDateTime {
    match timeframe.granularity() {
        Granularity::Minute | Granularity::Hour => {
            let width = timeframe.minutes().unwrap_or(1);
            let minute_of_day = t.hour() * 60 + t.minute();
            let floored = minute_of_day - minute_of_day % width;
            t.date().and_time(NaiveTime::MIN) + Duration::minutes(i64::from(floored))
        }
        Granularity::Day => t.date().and_time(NaiveTime::MIN),
        Granularity::Week => {
            let back = i64::from(t.weekday().num_days_from_monday());
            (t.date() - Duration::days(back)).and_time(NaiveTime::MIN)
        }
        Granularity::Month => t.date().with_day(1).unwrap_or(t.date()).and_time(NaiveTime::MIN),
    }
}

#[derive(Default)]
struct Agg {
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<i64>,
}

impl Agg {
    fn add(&mut self, o: Option<f64>, h: Option<f64>, l: Option<f64>, c: Option<f64>, v: Option<i64>) {
        if self.open.is_none() {
            self.open = o;
        }
        if let Some(h) = h {
            self.high = Some(self.high.map_or(h, |cur| cur.max(h)));
        }
        if let Some(l) = l {
            self.low = Some(self.low.map_or(l, |cur| cur.min(l)));
        }
        if c.is_some() {
            self.close = c;
        }
        if let Some(v) = v {
            self.volume = Some(self.volume.unwrap_or(0) + v);
        }
    }
}

fn float_col<'t>(table: &'t Table, name: &str) -> Result<&'t [Option<f64>], NormalizeError> {
    match table.column(name) {
        Some(ColumnData::Float64(v)) => Ok(v),
        _ => Err(NormalizeError::MissingField {
            field: name.to_string(),
        }),
    }
}

/// Aggregate OHLCV bars into `timeframe` buckets.
///
/// open=first, high=max, low=min, close=last, volume=sum; each bucket is
/// labelled by its start. Output is sorted by bucket and the `time` column is
/// a `Datetime`. Columns other than OHLCV are dropped.
pub fn resample(table: &Table, timeframe: Timeframe) -> Result<Table, NormalizeError> {
    let times: Vec<Option<NaiveDateTime>> = match table.column("time") {
        Some(ColumnData::Datetime(v)) => v.clone(),
        Some(ColumnData::Date(v)) => v.iter().map(|d| d.map(|d| d.and_time(NaiveTime::MIN))).collect(),
        _ => {
            return Err(NormalizeError::MissingField {
                field: "time".to_string(),
            })
        }
    };
    let open = float_col(table, "open")?;
    let high = float_col(table, "high")?;
    let low = float_col(table, "low")?;
    let close = float_col(table, "close")?;
    let volume = match table.column("volume") {
        Some(ColumnData::Int64(v)) => v.as_slice(),
        _ => {
            return Err(NormalizeError::MissingField {
                field: "volume".to_string(),
            })
        }
    };

    let mut buckets: BTreeMap<NaiveDateTime, Agg> = BTreeMap::new();
    for (i, t) in times.iter().enumerate() {
        // Bars without a timestamp cannot be placed.
        let Some(t) = t else { continue };
        buckets
            .entry(bucket_start(*t, timeframe))
            .or_default()
            .add(open[i], high[i], low[i], close[i], volume[i]);
    }

    let mut out = Table::new();
    out.push_column("time", ColumnData::Datetime(buckets.keys().map(|k| Some(*k)).collect()))?;
    out.push_column("open", ColumnData::Float64(buckets.values().map(|a| a.open).collect()))?;
    out.push_column("high", ColumnData::Float64(buckets.values().map(|a| a.high).collect()))?;
    out.push_column("low", ColumnData::Float64(buckets.values().map(|a| a.low).collect()))?;
    out.push_column("close", ColumnData::Float64(buckets.values().map(|a| a.close).collect()))?;
    out.push_column("volume", ColumnData::Int64(buckets.values().map(|a| a.volume).collect()))?;
    for (k, v) in table.attrs() {
        out.set_attr(k.clone(), v.clone());
    }
    Ok(out)
}

/// Wall-clock `t` in `tz` as epoch seconds; ambiguous times take the earlier
/// instant, nonexistent ones fall back to reading `t` as UTC.
pub fn local_to_epoch(t: NaiveDateTime, tz: Tz) -> i64 {
    tz.from_local_datetime(&t)
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| t.and_utc().timestamp())
}
