use crate::record::{Field, Value};
use crate::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Key added to every document in tagged mode, carrying the origin
/// stream name.
pub const STREAM_TAG_KEY: &str = "_path";

/// Timestamp rendering convention for serialized records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampFormat {
    /// Numeric epoch seconds with fractional part.
    #[default]
    EpochSeconds,
    /// RFC 3339 string with microsecond precision.
    Iso8601,
}

/// Serializes one log record into a single JSON document.
///
/// The encoding (plain vs tagged) and the timestamp convention are
/// fixed at construction; every record from the same stream gets the
/// same treatment. Field order in the document matches the schema
/// order handed in by the host.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    timestamps: TimestampFormat,
    tag: Option<String>,
}

impl JsonFormatter {
    /// A formatter producing one flat object per record.
    pub fn plain(timestamps: TimestampFormat) -> Self {
        Self {
            timestamps,
            tag: None,
        }
    }

    /// A formatter that additionally appends [`STREAM_TAG_KEY`] with
    /// the given stream name, so multiple streams multiplexed onto one
    /// topic stay distinguishable.
    pub fn tagged(stream_path: impl Into<String>, timestamps: TimestampFormat) -> Self {
        Self {
            timestamps,
            tag: Some(stream_path.into()),
        }
    }

    /// Encode one record. Field names come from `fields`, values from
    /// the parallel `values` slice.
    pub fn encode(&self, fields: &[Field], values: &[Value]) -> Result<String> {
        let document = Document {
            fields,
            values,
            tag: self.tag.as_deref(),
            timestamps: self.timestamps,
        };
        serde_json::to_string(&document).map_err(Into::into)
    }
}

struct Document<'a> {
    fields: &'a [Field],
    values: &'a [Value],
    tag: Option<&'a str>,
    timestamps: TimestampFormat,
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries = self.fields.len().min(self.values.len());
        let mut map = serializer.serialize_map(Some(entries + usize::from(self.tag.is_some())))?;
        for (field, value) in self.fields.iter().zip(self.values) {
            map.serialize_entry(
                &field.name,
                &Rendered {
                    value,
                    timestamps: self.timestamps,
                },
            )?;
        }
        if let Some(stream) = self.tag {
            map.serialize_entry(STREAM_TAG_KEY, stream)?;
        }
        map.end()
    }
}

struct Rendered<'a> {
    value: &'a Value,
    timestamps: TimestampFormat,
}

impl Serialize for Rendered<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => match self.timestamps {
                TimestampFormat::EpochSeconds => serializer.serialize_f64(epoch_seconds(ts)),
                TimestampFormat::Iso8601 => {
                    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
                }
            },
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Rendered {
                        value: item,
                        timestamps: self.timestamps,
                    })?;
                }
                seq.end()
            }
        }
    }
}

fn epoch_seconds(ts: &DateTime<Utc>) -> f64 {
    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_micros()) / 1e6
}
