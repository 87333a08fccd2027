//! Record normalization
//!
//! Turns raw JSON objects into typed source records. Every declared field is
//! coerced to its [`FieldKind`]; a field that is absent or cannot be read as
//! its kind becomes JSON `null`, which the typed records see as `None`.
//! Undeclared keys are dropped. Only malformed JSON or non-UTF-8 input is
//! an error.
//!
//! Activity logs are line-delimited; a catalog file is one JSON document,
//! which may span several lines.

use std::io::{BufRead, ErrorKind, Read};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::{EtlError, Result};
use crate::models::{ActivityEvent, CatalogRecord};
use crate::schema::{FieldKind, RecordSchema};

/// Coerce one JSON object to a schema, producing an object holding exactly
/// the schema's fields.
#[must_use]
pub fn normalize_object(schema: &RecordSchema, raw: &Map<String, Value>) -> Map<String, Value> {
    schema
        .fields
        .iter()
        .map(|field| {
            let value = raw
                .get(field.name)
                .map_or(Value::Null, |v| coerce(field.kind, v));
            (field.name.to_string(), value)
        })
        .collect()
}

fn coerce(kind: FieldKind, value: &Value) -> Value {
    match kind {
        FieldKind::Text => coerce_text(value),
        FieldKind::Float => coerce_float(value).map_or(Value::Null, Value::from),
        FieldKind::Integer => coerce_integer(value).map_or(Value::Null, Value::from),
    }
}

fn coerce_text(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => Value::Null,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_line<T: DeserializeOwned>(schema: &RecordSchema, text: &str, line: usize) -> Result<T> {
    let raw: Map<String, Value> =
        serde_json::from_str(text).map_err(|source| EtlError::Parse { line, source })?;
    let normalized = normalize_object(schema, &raw);
    serde_json::from_value(Value::Object(normalized)).map_err(|source| EtlError::Parse { line, source })
}

/// Lazy reader of line-delimited JSON records.
///
/// Yields one item per non-blank line; each item is parsed on demand, so at
/// most one record is held in memory at a time.
pub struct RecordReader<R, T> {
    lines: std::io::Lines<R>,
    schema: RecordSchema,
    line: usize,
    _record: std::marker::PhantomData<T>,
}

impl<R: BufRead, T: DeserializeOwned> RecordReader<R, T> {
    /// Wrap a buffered reader.
    pub fn new(reader: R, schema: RecordSchema) -> Self {
        Self {
            lines: reader.lines(),
            schema,
            line: 0,
            _record: std::marker::PhantomData,
        }
    }

    /// 1-based number of the line most recently read.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead, T: DeserializeOwned> Iterator for RecordReader<R, T> {
    type Item = Result<(usize, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.lines.next()?;
            self.line += 1;
            let text = match next {
                Ok(text) => text,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Some(Err(EtlError::InvalidText { line: self.line }));
                }
                Err(e) => return Some(Err(e.into())),
            };
            if text.trim().is_empty() {
                continue;
            }
            trace!(line = self.line, "Parsing record");
            return Some(parse_line(&self.schema, &text, self.line).map(|record| (self.line, record)));
        }
    }
}

/// Read the activity events of one log file.
pub fn read_activity_log<R: BufRead>(reader: R, schema: RecordSchema) -> RecordReader<R, ActivityEvent> {
    RecordReader::new(reader, schema)
}

/// Read the single record of one catalog file.
///
/// Returns the record with the 1-based line it starts on. Extra records after
/// the first are ignored with a warning.
pub fn read_catalog<R: Read>(mut reader: R, schema: RecordSchema) -> Result<(usize, CatalogRecord)> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let text = std::str::from_utf8(&bytes).map_err(|e| EtlError::InvalidText {
        line: line_at(&bytes, e.valid_up_to()),
    })?;
    let line = line_at(text.as_bytes(), text.len() - text.trim_start().len());

    let mut records = serde_json::Deserializer::from_str(text).into_iter::<Map<String, Value>>();
    let raw = records
        .next()
        .ok_or(EtlError::EmptyCatalog)?
        .map_err(|source| EtlError::Parse { line: source.line(), source })?;
    let extra = records.count();
    if extra > 0 {
        warn!(extra, "Catalog file holds more than one record; only the first is loaded");
    }

    let normalized = normalize_object(&schema, &raw);
    let record = serde_json::from_value(Value::Object(normalized)).map_err(|source| EtlError::Parse { line, source })?;
    Ok((line, record))
}

fn line_at(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}
