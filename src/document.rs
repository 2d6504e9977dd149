//! Firestore's typed JSON values.
//!
//! The REST API wraps every field in a single-key object naming its type
//! (`{"stringValue": "..."}`, `{"arrayValue": {"values": [...]}}`). Types are
//! bridged through `serde_json::Value` so any serde type can be stored.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub type Fields = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    /// int64 is sent as a decimal string.
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn from_item<T: Serialize>(item: &T) -> anyhow::Result<Self> {
        match Value::from(serde_json::to_value(item)?) {
            Value::MapValue(MapValue { fields }) => Ok(Self { name: None, fields }),
            other => anyhow::bail!("document must be a map, got {other:?}"),
        }
    }

    pub fn into_item<T: DeserializeOwned>(self) -> anyhow::Result<T> {
        let value = serde_json::Value::from(Value::MapValue(MapValue {
            fields: self.fields,
        }));
        Ok(serde_json::from_value(value)?)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Self::NullValue(()),
            Json::Bool(b) => Self::BooleanValue(b),
            Json::Number(n) if n.is_i64() || n.is_u64() => Self::IntegerValue(n.to_string()),
            Json::Number(n) => Self::DoubleValue(n.as_f64().unwrap_or_default()),
            Json::String(s) => Self::StringValue(s),
            Json::Array(values) => Self::ArrayValue(ArrayValue {
                values: values.into_iter().map(Self::from).collect(),
            }),
            Json::Object(map) => Self::MapValue(MapValue {
                fields: map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            }),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::NullValue(()) => Self::Null,
            Value::BooleanValue(b) => Self::Bool(b),
            Value::IntegerValue(s) => match s.parse::<i64>() {
                Ok(n) => Self::from(n),
                Err(_) => Self::String(s),
            },
            Value::DoubleValue(f) => {
                serde_json::Number::from_f64(f).map_or(Self::Null, Self::Number)
            }
            Value::TimestampValue(s)
            | Value::StringValue(s)
            | Value::BytesValue(s)
            | Value::ReferenceValue(s) => Self::String(s),
            Value::GeoPointValue(v) => v,
            Value::ArrayValue(ArrayValue { values }) => {
                Self::Array(values.into_iter().map(Self::from).collect())
            }
            Value::MapValue(MapValue { fields }) => {
                Self::Object(fields.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}
