// =============================================================================
// Series Validator: resolves every accepted input shape into a Series
// =============================================================================
//
// Accepted shapes (selected by the `format` tag):
//
//   records  { "rows": [ { "timestamp": ..., "Open": ..., ... }, ... ] }
//   columns  { "columns": { "timestamp": [...], "Open": [...], ... } }
//   array    { "rows": [ [timestamp, open, high, low, close, volume?], ... ] }
//   bars     { "bars": [ Bar, ... ] }
//
// Column names are matched case-insensitively.  Prices may be JSON numbers or
// numeric strings.  Integer timestamps are epoch milliseconds; string
// timestamps are RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (UTC).

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::IndicatorError;
use crate::market_data::bar::{Bar, Series};
use crate::types::Timeframe;

const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "time", "date", "datetime", "open_time"];

/// Raw per-timeframe input before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum SeriesInput {
    Records { rows: Vec<Map<String, Value>> },
    Columns { columns: Map<String, Value> },
    Array { rows: Vec<Vec<Value>> },
    Bars { bars: Vec<Bar> },
}

/// Coerce `input` into a canonical [`Series`].
///
/// Fails with `MissingColumn` when a required OHLC (or timestamp) field is
/// absent and with `MalformedInput` for anything else that cannot be coerced.
pub fn validate(timeframe: Timeframe, input: SeriesInput) -> Result<Series, IndicatorError> {
    let bars = match input {
        SeriesInput::Records { rows } => rows
            .iter()
            .enumerate()
            .map(|(i, row)| bar_from_record(i, row))
            .collect::<Result<Vec<_>, _>>()?,
        SeriesInput::Columns { columns } => bars_from_columns(&columns)?,
        SeriesInput::Array { rows } => rows
            .iter()
            .enumerate()
            .map(|(i, row)| bar_from_array(i, row))
            .collect::<Result<Vec<_>, _>>()?,
        SeriesInput::Bars { bars } => bars,
    };

    let series = Series::from_bars(timeframe, bars)?;
    debug!(timeframe = %timeframe, bars = series.len(), "series validated");
    Ok(series)
}

/// Parse and validate a JSON document in one of the accepted shapes.
pub fn validate_json(timeframe: Timeframe, value: Value) -> Result<Series, IndicatorError> {
    let input: SeriesInput = serde_json::from_value(value)
        .map_err(|e| IndicatorError::malformed(format!("unsupported input shape: {e}")))?;
    validate(timeframe, input)
}

// =============================================================================
// Shape-specific coercion
// =============================================================================

fn bar_from_record(row_idx: usize, row: &Map<String, Value>) -> Result<Bar, IndicatorError> {
    let ts_value = find_any(row, TIMESTAMP_ALIASES).ok_or_else(|| IndicatorError::missing_column("timestamp"))?;

    let price = |name: &str| -> Result<f64, IndicatorError> {
        let value = find_key(row, name).ok_or_else(|| IndicatorError::missing_column(capitalise(name)))?;
        parse_f64(value, name, row_idx)
    };

    Ok(Bar {
        timestamp: parse_timestamp(ts_value, row_idx)?,
        open: price("open")?,
        high: price("high")?,
        low: price("low")?,
        close: price("close")?,
        volume: parse_optional_volume(find_key(row, "volume"), row_idx)?,
    })
}

fn bars_from_columns(columns: &Map<String, Value>) -> Result<Vec<Bar>, IndicatorError> {
    let timestamps = column(columns, TIMESTAMP_ALIASES, "timestamp")?;
    let open = column(columns, &["open"], "Open")?;
    let high = column(columns, &["high"], "High")?;
    let low = column(columns, &["low"], "Low")?;
    let close = column(columns, &["close"], "Close")?;
    let volume = match find_key(columns, "volume") {
        Some(v) => Some(
            v.as_array()
                .ok_or_else(|| IndicatorError::malformed("column Volume is not an array"))?,
        ),
        None => None,
    };

    let n = timestamps.len();
    let lengths = [open.len(), high.len(), low.len(), close.len()];
    if lengths.iter().any(|&len| len != n) || volume.is_some_and(|v| v.len() != n) {
        return Err(IndicatorError::malformed("columns have different lengths"));
    }

    (0..n)
        .map(|i| {
            Ok(Bar {
                timestamp: parse_timestamp(&timestamps[i], i)?,
                open: parse_f64(&open[i], "open", i)?,
                high: parse_f64(&high[i], "high", i)?,
                low: parse_f64(&low[i], "low", i)?,
                close: parse_f64(&close[i], "close", i)?,
                volume: parse_optional_volume(volume.map(|v| &v[i]), i)?,
            })
        })
        .collect()
}

fn column<'a>(
    columns: &'a Map<String, Value>,
    names: &[&str],
    label: &str,
) -> Result<&'a Vec<Value>, IndicatorError> {
    let value = find_any(columns, names).ok_or_else(|| IndicatorError::missing_column(label))?;
    value
        .as_array()
        .ok_or_else(|| IndicatorError::malformed(format!("column {label} is not an array")))
}

fn bar_from_array(row_idx: usize, row: &[Value]) -> Result<Bar, IndicatorError> {
    if row.len() != 5 && row.len() != 6 {
        return Err(IndicatorError::malformed(format!(
            "row {row_idx} has {} fields, expected [timestamp, open, high, low, close, volume?]",
            row.len()
        )));
    }

    Ok(Bar {
        timestamp: parse_timestamp(&row[0], row_idx)?,
        open: parse_f64(&row[1], "open", row_idx)?,
        high: parse_f64(&row[2], "high", row_idx)?,
        low: parse_f64(&row[3], "low", row_idx)?,
        close: parse_f64(&row[4], "close", row_idx)?,
        volume: parse_optional_volume(row.get(5), row_idx)?,
    })
}

// =============================================================================
// Field helpers
// =============================================================================

fn find_key<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v)
}

fn find_any<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| find_key(map, name))
}

fn capitalise(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Quote feeds send prices either as JSON numbers or as numeric strings.
fn parse_f64(value: &Value, name: &str, row_idx: usize) -> Result<f64, IndicatorError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| IndicatorError::malformed(format!("{name} in row {row_idx} is not a valid f64"))),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            IndicatorError::malformed(format!("failed to parse {name} in row {row_idx} as f64: {s}"))
        }),
        _ => Err(IndicatorError::malformed(format!(
            "{name} in row {row_idx} has unexpected JSON type"
        ))),
    }
}

fn parse_optional_volume(value: Option<&Value>, row_idx: usize) -> Result<Option<f64>, IndicatorError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse_f64(v, "volume", row_idx).map(Some),
    }
}

fn parse_timestamp(value: &Value, row_idx: usize) -> Result<DateTime<Utc>, IndicatorError> {
    let invalid = || IndicatorError::malformed(format!("invalid timestamp in row {row_idx}: {value}"));

    match value {
        Value::Number(n) => {
            let millis = n.as_i64().ok_or_else(invalid)?;
            Utc.timestamp_millis_opt(millis).single().ok_or_else(invalid)
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Ok(naive.and_utc());
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date
                    .and_hms_opt(0, 0, 0)
                    .map(|naive| naive.and_utc())
                    .ok_or_else(invalid);
            }
            Err(invalid())
        }
        _ => Err(invalid()),
    }
}
