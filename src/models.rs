use crate::errors::{ChannelError, SampleError};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const LABEL_FORMAT: &str = "%H:%M:%S";
const TICK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stable sensor identifier. The backend lists ids as integers and keys
/// channel messages by their string form; both decode to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SubjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(id) => Self(id.to_string()),
            RawId::Text(id) => Self(id),
        })
    }
}

/// A sensor as listed by `GET /api/sensors`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "units", default)]
    pub unit: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: SubjectId::new(id),
            kind: kind.into(),
            unit: unit.into(),
            address: None,
        }
    }
}

/// One validated observation. Construct with [`Sample::new`] or decode a
/// channel entry with [`Sample::from_value`]; both reject malformed input.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    timestamp: String,
    tick: String,
    label: String,
    value: f64,
}

impl Sample {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Result<Self, SampleError> {
        let timestamp = timestamp.into();
        if timestamp.trim().is_empty() {
            return Err(SampleError::MissingTimestamp);
        }
        if !value.is_finite() {
            return Err(SampleError::BadValue);
        }
        let (tick, label) = parse_tick(&timestamp)?;
        Ok(Self {
            timestamp,
            tick,
            label,
            value,
        })
    }

    pub fn from_value(entry: &Value) -> Result<Self, SampleError> {
        let timestamp = entry
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or(SampleError::MissingTimestamp)?;

        let value = match entry.get("value") {
            None | Some(Value::Null) => return Err(SampleError::MissingValue),
            Some(Value::Number(number)) => number.as_f64().ok_or(SampleError::BadValue)?,
            Some(Value::String(text)) => text.trim().parse::<f64>().map_err(|_| SampleError::BadValue)?,
            Some(_) => return Err(SampleError::BadValue),
        };

        Self::new(timestamp, value)
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The timestamp cut to whole seconds in one canonical spelling, date
    /// kept when present. Two samples with the same tick are the same reading.
    pub fn tick(&self) -> &str {
        &self.tick
    }

    /// Time-of-day shown on the chart axis.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Returns `(tick, label)` for a raw timestamp.
fn parse_tick(timestamp: &str) -> Result<(String, String), SampleError> {
    let raw = timestamp.trim();
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok((
                parsed.format(TICK_FORMAT).to_string(),
                parsed.time().format(LABEL_FORMAT).to_string(),
            ));
        }
    }
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .map(|time| {
            let label = time.format(LABEL_FORMAT).to_string();
            (label.clone(), label)
        })
        .map_err(|_| SampleError::BadTimestamp(timestamp.to_string()))
}

/// The validated contents of one channel message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBatch {
    pub entries: Vec<(SubjectId, Sample)>,
    pub rejected: usize,
}

impl SampleBatch {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decodes a channel message: a JSON object mapping subject id to
/// `{timestamp, value}`. Falsy entries mean "no reading yet" and are skipped;
/// malformed entries are logged and counted in `rejected`.
pub fn parse_batch(payload: &[u8]) -> Result<SampleBatch, ChannelError> {
    let message: Map<String, Value> =
        serde_json::from_slice(payload).map_err(|err| ChannelError::Payload(err.to_string()))?;

    let mut batch = SampleBatch::default();
    for (key, entry) in message {
        if is_falsy(&entry) {
            continue;
        }
        match Sample::from_value(&entry) {
            Ok(sample) => batch.entries.push((SubjectId::new(key), sample)),
            Err(err) => {
                warn!("dropping sample for subject {key}: {err}");
                batch.rejected += 1;
            }
        }
    }
    Ok(batch)
}

fn is_falsy(entry: &Value) -> bool {
    match entry {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// What the dashboard shows about the live link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkStatus {
    Connecting,
    Discovering,
    Live { subjects: usize },
    LoadFailed { reason: String },
    ChannelDown { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub id: SubjectId,
    pub kind: String,
    pub unit: String,
    pub address: Option<String>,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    pub status: LinkStatus,
    pub updated_at: Option<String>,
    pub charts: Vec<ChartView>,
}
