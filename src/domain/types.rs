//! Field types for records read from the pages table.
//!
//! The store is loosely typed, so every decoder here is lenient: a value that
//! cannot be understood degrades to a draft/malformed variant instead of
//! failing the whole table decode.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use time::{
    Date, OffsetDateTime,
    format_description::{FormatItem, well_known::Rfc3339},
    macros::format_description,
};

const DAY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Publication flag as stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Published,
    Draft,
}

impl PublishState {
    pub fn is_published(self) -> bool {
        matches!(self, PublishState::Published)
    }

    /// Checkbox columns arrive as booleans, select columns as `"Yes"`/`"No"`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(true) => PublishState::Published,
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "published" => PublishState::Published,
                _ => PublishState::Draft,
            },
            _ => PublishState::Draft,
        }
    }
}

impl Serialize for PublishState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(self.is_published())
    }
}

impl<'de> Deserialize<'de> for PublishState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Publication date of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostDate {
    At(OffsetDateTime),
    /// Raw text of a value that could not be read as a date.
    Malformed(String),
}

impl PostDate {
    pub fn instant(&self) -> Option<OffsetDateTime> {
        match self {
            PostDate::At(at) => Some(*at),
            PostDate::Malformed(_) => None,
        }
    }

    /// Accepts epoch milliseconds, RFC 3339 timestamps, or `YYYY-MM-DD`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|millis| millis as i64))
                .and_then(from_unix_millis)
                .map(PostDate::At)
                .unwrap_or_else(|| PostDate::Malformed(number.to_string())),
            Value::String(text) => parse_text(text),
            other => PostDate::Malformed(other.to_string()),
        }
    }
}

fn from_unix_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

fn parse_text(text: &str) -> PostDate {
    let trimmed = text.trim();
    OffsetDateTime::parse(trimmed, &Rfc3339)
        .ok()
        .or_else(|| {
            Date::parse(trimmed, DAY_FORMAT)
                .ok()
                .map(|date| date.midnight().assume_utc())
        })
        .map(PostDate::At)
        .unwrap_or_else(|| PostDate::Malformed(text.to_string()))
}

impl Serialize for PostDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PostDate::At(at) => {
                let formatted = at.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            PostDate::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for PostDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// Reads an author list, keeping only string identifiers.
///
/// A bare string counts as a one-element list; any other shape is treated as
/// absent.
pub(crate) fn deserialize_authors<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(id) => Some(id),
                    _ => None,
                })
                .collect(),
        ),
        Some(Value::String(id)) => Some(vec![id]),
        _ => None,
    })
}

/// Reads a text column. Anything but a string is treated as absent.
pub(crate) fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}
