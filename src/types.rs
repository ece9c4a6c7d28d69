use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Cortex returns scalar ids and counts either as JSON strings or numbers
/// depending on the endpoint and field type.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn de_scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(String::new()),
        other => scalar_to_string(&other)
            .ok_or_else(|| serde::de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

/// A folder whose children are candidates for reordering.
///
/// Serialized as a `[identifier, record_id]` pair to keep the discovery
/// snapshot format stable across versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentFolder {
    /// `CoreField.Unique-Identifier`, used in search queries and checkpoints.
    pub identifier: String,
    /// `RecordID`, the value written into a page's parent-folder field.
    pub record_id: String,
}

impl ParentFolder {
    pub fn new(identifier: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            record_id: record_id.into(),
        }
    }

    /// Build a folder from a raw search hit.
    ///
    /// Returns `None` unless the hit has a non-empty identifier, a non-empty
    /// record id and a child count strictly above zero.
    pub fn from_search_item(item: &Value) -> Option<Self> {
        let identifier = item
            .get("CoreField.Unique-Identifier")
            .and_then(scalar_to_string)
            .filter(|s| !s.is_empty())?;
        let record_id = item
            .get("RecordID")
            .and_then(scalar_to_string)
            .filter(|s| !s.is_empty())?;
        let child_count = item
            .get("ChildCount")
            .and_then(scalar_to_string)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(0);
        if child_count <= 0 {
            return None;
        }
        Some(Self {
            identifier,
            record_id,
        })
    }
}

impl Serialize for ParentFolder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.identifier, &self.record_id).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ParentFolder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (identifier, record_id): (Value, Value) = Deserialize::deserialize(deserializer)?;
        let identifier = scalar_to_string(&identifier)
            .ok_or_else(|| serde::de::Error::custom("folder identifier must be a string"))?;
        let record_id = scalar_to_string(&record_id)
            .ok_or_else(|| serde::de::Error::custom("record id must be a string or number"))?;
        Ok(Self {
            identifier,
            record_id,
        })
    }
}

/// A child page of a parent folder, in the form kept in the per-folder cache.
///
/// Reads both the search API's `CoreField.*` keys and the cache's own
/// camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    #[serde(alias = "CoreField.Identifier", deserialize_with = "de_scalar_string")]
    pub identifier: String,
    /// Sort key. Missing names sort first, as an empty string.
    #[serde(
        alias = "CoreField.OriginalFileName",
        default,
        deserialize_with = "de_scalar_string"
    )]
    pub original_file_name: String,
}

impl PageRecord {
    pub fn new(identifier: impl Into<String>, original_file_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            original_file_name: original_file_name.into(),
        }
    }
}
