//! Column-oriented result container.
//!
//! A `Table` is a list of equally long, typed, uniquely named columns plus
//! string attributes. Every public adapter operation returns one.

use std::collections::BTreeMap;
use std::io;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::normalizer::NormalizeError;

/// Wire form of datetime cells in JSON rows (chrono's own serde format).
const JSON_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    Float64,
    Int64,
    Utf8,
    Datetime,
    Date,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Float64 => "float64",
            Dtype::Int64 => "int64",
            Dtype::Utf8 => "utf8",
            Dtype::Datetime => "datetime",
            Dtype::Date => "date",
        }
    }
}

/// Typed cells of one column; `None` is a null.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float64(Vec<Option<f64>>),
    Int64(Vec<Option<i64>>),
    Utf8(Vec<Option<String>>),
    Datetime(Vec<Option<NaiveDateTime>>),
    Date(Vec<Option<NaiveDate>>),
}

impl ColumnData {
    pub fn empty(dtype: Dtype) -> Self {
        match dtype {
            Dtype::Float64 => ColumnData::Float64(Vec::new()),
            Dtype::Int64 => ColumnData::Int64(Vec::new()),
            Dtype::Utf8 => ColumnData::Utf8(Vec::new()),
            Dtype::Datetime => ColumnData::Datetime(Vec::new()),
            Dtype::Date => ColumnData::Date(Vec::new()),
        }
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            ColumnData::Float64(_) => Dtype::Float64,
            ColumnData::Int64(_) => Dtype::Int64,
            ColumnData::Utf8(_) => Dtype::Utf8,
            ColumnData::Datetime(_) => Dtype::Datetime,
            ColumnData::Date(_) => Dtype::Date,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float64(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Datetime(v) => v.len(),
            ColumnData::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn json_cell(&self, i: usize) -> Value {
        match self {
            ColumnData::Float64(v) => v[i]
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ColumnData::Int64(v) => v[i].map(Value::from).unwrap_or(Value::Null),
            ColumnData::Utf8(v) => v[i].clone().map(Value::String).unwrap_or(Value::Null),
            ColumnData::Datetime(v) => v[i]
                .map(|t| Value::String(t.format(JSON_DATETIME_FORMAT).to_string()))
                .unwrap_or(Value::Null),
            ColumnData::Date(v) => v[i]
                .map(|d| Value::String(d.to_string()))
                .unwrap_or(Value::Null),
        }
    }

    fn text_cell(&self, i: usize) -> String {
        match self {
            ColumnData::Float64(v) => v[i].map(|x| x.to_string()).unwrap_or_default(),
            ColumnData::Int64(v) => v[i].map(|x| x.to_string()).unwrap_or_default(),
            ColumnData::Utf8(v) => v[i].clone().unwrap_or_default(),
            ColumnData::Datetime(v) => v[i]
                .map(|t| t.format(CSV_DATETIME_FORMAT).to_string())
                .unwrap_or_default(),
            ColumnData::Date(v) => v[i].map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    attrs: BTreeMap<String, String>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-row table with the given column layout.
    pub fn empty_with_schema(layout: &[(&str, Dtype)]) -> Self {
        Self {
            columns: layout
                .iter()
                .map(|(name, dtype)| Column {
                    name: (*name).to_string(),
                    data: ColumnData::empty(*dtype),
                })
                .collect(),
            attrs: BTreeMap::new(),
        }
    }

    /// Append a column. Names must be unique and lengths must agree.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        data: ColumnData,
    ) -> Result<(), NormalizeError> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(NormalizeError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.data.len() != data.len() {
                return Err(NormalizeError::LengthMismatch {
                    column: name,
                    expected: first.data.len(),
                    got: data.len(),
                });
            }
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnData> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.data)
    }

    pub fn dtype(&self, name: &str) -> Option<Dtype> {
        self.column(name).map(ColumnData::dtype)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    /// Replace a `Datetime` column by its calendar dates. Other dtypes are
    /// left untouched; a missing column is an error.
    pub fn coerce_date(&mut self, name: &str) -> Result<(), NormalizeError> {
        let col = self
            .column_mut(name)
            .ok_or_else(|| NormalizeError::MissingField {
                field: name.to_string(),
            })?;
        if let ColumnData::Datetime(v) = col {
            let dates = v.iter().map(|t| t.map(|t| t.date())).collect();
            *col = ColumnData::Date(dates);
        }
        Ok(())
    }

    /// Rows as JSON objects keyed by column name.
    pub fn rows_json(&self) -> Vec<Map<String, Value>> {
        (0..self.height())
            .map(|i| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.data.json_cell(i)))
                    .collect()
            })
            .collect()
    }

    /// Deserialize every row into `T` (e.g. [`crate::OhlcRecord`]).
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>, NormalizeError> {
        self.rows_json()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                serde_json::from_value(Value::Object(row))
                    .map_err(|e| NormalizeError::Record(format!("row {i}: {e}")))
            })
            .collect()
    }

    /// `{"attrs": {...}, "rows": [...]}`
    pub fn to_json(&self) -> Value {
        let attrs: Map<String, Value> = self
            .attrs
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let rows: Vec<Value> = self.rows_json().into_iter().map(Value::Object).collect();
        let mut out = Map::new();
        out.insert("attrs".to_string(), Value::Object(attrs));
        out.insert("rows".to_string(), Value::Array(rows));
        Value::Object(out)
    }

    /// Header row followed by one record per row; nulls are empty fields.
    pub fn write_csv<W: io::Write>(&self, w: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(w);
        wtr.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for i in 0..self.height() {
            wtr.write_record(self.columns.iter().map(|c| c.data.text_cell(i)))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn sample() -> Table {
        let mut t = Table::new();
        t.push_column(
            "time",
            ColumnData::Datetime(vec![Some(dt("2024-01-02 09:15:00")), None]),
        )
        .unwrap();
        t.push_column("close", ColumnData::Float64(vec![Some(23.45), Some(23.5)]))
            .unwrap();
        t.push_column("volume", ColumnData::Int64(vec![Some(1200), None]))
            .unwrap();
        t
    }

    #[test]
    fn push_column_rejects_length_mismatch_and_duplicates() {
        let mut t = sample();
        let err = t
            .push_column("open", ColumnData::Float64(vec![Some(1.0)]))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::LengthMismatch { expected: 2, got: 1, .. }));

        let err = t
            .push_column("close", ColumnData::Float64(vec![None, None]))
            .unwrap_err();
        assert_eq!(err, NormalizeError::DuplicateColumn("close".to_string()));
    }

    #[test]
    fn rows_json_renders_datetimes_and_nulls() {
        let rows = sample().rows_json();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0]["time"], "2024-01-02T09:15:00");
        assert_eq!(rows[1]["time"], Value::Null);
        assert_eq!(rows[1]["volume"], Value::Null);
    }

    #[test]
    fn coerce_date_drops_time_of_day() {
        let mut t = sample();
        t.coerce_date("time").unwrap();
        assert_eq!(t.dtype("time"), Some(Dtype::Date));
        assert_eq!(t.rows_json()[0]["time"], "2024-01-02");
        assert!(t.coerce_date("missing").is_err());
    }

    #[test]
    fn csv_output_has_header_and_blank_nulls() {
        let mut buf = Vec::new();
        sample().write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "time,close,volume\n2024-01-02 09:15:00,23.45,1200\n,23.5,\n"
        );
    }

    #[test]
    fn empty_schema_table_has_columns_but_no_rows() {
        let t = Table::empty_with_schema(&[("price", Dtype::Float64), ("id", Dtype::Int64)]);
        assert_eq!(t.width(), 2);
        assert_eq!(t.height(), 0);
        assert!(t.is_empty());
        assert_eq!(t.column_names(), ["price", "id"]);
    }
}
