//! # Data Converters
//!
//! Boundary codec between in-process values and wire payloads. Every serde
//! failure is wrapped in [`DataConversionError`] and returned to the caller;
//! converters never panic.
//!
//! [`JsonDataConverter`] is registered as `temporal.data_converter` unless
//! the host registers its own converter under that name.

use crate::error::DataConversionError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

pub const METADATA_ENCODING_KEY: &str = "encoding";
pub const ENCODING_JSON: &str = "json/plain";
/// Metadata key carrying the declared type of the encoded value
pub const METADATA_TYPE_KEY: &str = "serde.type";

/// Encoded value plus metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub metadata: BTreeMap<String, String>,
    pub data: Vec<u8>,
}

impl Payload {
    pub fn encoding(&self) -> Option<&str> {
        self.metadata.get(METADATA_ENCODING_KEY).map(String::as_str)
    }

    pub fn type_hint(&self) -> Option<&str> {
        self.metadata.get(METADATA_TYPE_KEY).map(String::as_str)
    }
}

/// Target of a decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadType {
    /// Declared type name; empty when the caller does not care
    pub name: String,
    pub nullable: bool,
}

impl PayloadType {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn any() -> Self {
        Self::named("").nullable()
    }
}

pub trait DataConverter: Send + Sync {
    fn encoding_type(&self) -> &str;

    fn to_payload(
        &self,
        value: &JsonValue,
        type_hint: Option<&str>,
    ) -> Result<Payload, DataConversionError>;

    /// `Ok(None)` for a null payload decoded into a nullable target
    fn from_payload(
        &self,
        payload: &Payload,
        target: &PayloadType,
    ) -> Result<Option<JsonValue>, DataConversionError>;
}

impl dyn DataConverter {
    /// Encode a typed value, recording its type name in the payload metadata
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Payload, DataConversionError> {
        let json =
            serde_json::to_value(value).map_err(|e| DataConversionError::encode(e.to_string()))?;
        self.to_payload(&json, Some(std::any::type_name::<T>()))
    }

    /// Decode a typed value; a null payload decodes as JSON `null`
    pub fn decode<T: DeserializeOwned>(&self, payload: &Payload) -> Result<T, DataConversionError> {
        let target = PayloadType::named(std::any::type_name::<T>()).nullable();
        let json = self.from_payload(payload, &target)?.unwrap_or(JsonValue::Null);
        serde_json::from_value(json).map_err(|e| DataConversionError::decode(e.to_string()))
    }
}

/// Plain JSON converter
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDataConverter;

impl JsonDataConverter {
    pub fn new() -> Self {
        Self
    }
}

impl DataConverter for JsonDataConverter {
    fn encoding_type(&self) -> &str {
        ENCODING_JSON
    }

    fn to_payload(
        &self,
        value: &JsonValue,
        type_hint: Option<&str>,
    ) -> Result<Payload, DataConversionError> {
        let data = serde_json::to_vec(value).map_err(|e| DataConversionError::encode(e.to_string()))?;

        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_ENCODING_KEY.to_string(), ENCODING_JSON.to_string());
        if let Some(hint) = type_hint {
            metadata.insert(METADATA_TYPE_KEY.to_string(), hint.to_string());
        }

        Ok(Payload { metadata, data })
    }

    fn from_payload(
        &self,
        payload: &Payload,
        target: &PayloadType,
    ) -> Result<Option<JsonValue>, DataConversionError> {
        if let Some(encoding) = payload.encoding() {
            if encoding != ENCODING_JSON {
                return Err(DataConversionError::UnsupportedEncoding {
                    encoding: encoding.to_string(),
                });
            }
        }

        if payload.data == b"null" && target.nullable {
            return Ok(None);
        }

        if let Some(hint) = payload.type_hint() {
            if !target.name.is_empty() && hint != target.name {
                return Err(DataConversionError::TypeMismatch {
                    expected: target.name.clone(),
                    actual: hint.to_string(),
                });
            }
        }

        serde_json::from_slice(&payload.data)
            .map(Some)
            .map_err(|e| DataConversionError::decode(e.to_string()))
    }
}
