//! JSON and YAML conversions
//!
//! Values are parsed into a generic document tree and re-serialized. Object keys keep the
//! order in which they appear in the input.

use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

use super::{ConvertError, Stage};

const INDENT: &[u8] = b"    ";

/// Parse a YAML document and emit it as compact JSON.
///
/// Only the first document of a multi-document stream is converted; an empty stream
/// converts to `null`.
pub fn yaml_to_json(body: &[u8]) -> Result<String, ConvertError> {
    let value = match serde_yaml::Deserializer::from_slice(body).next() {
        Some(document) => serde_yaml::Value::deserialize(document)
            .map_err(|e| ConvertError::new(Stage::ConvertBody, e))?,
        None => serde_yaml::Value::Null,
    };
    serde_json::to_string(&value).map_err(|e| ConvertError::new(Stage::MarshalBody, e))
}

/// Parse a JSON document and emit it as YAML
pub fn json_to_yaml(body: &[u8]) -> Result<String, ConvertError> {
    let value = parse_json(body)?;
    serde_yaml::to_string(&value).map_err(|e| ConvertError::new(Stage::ConvertBody, e))
}

/// Strip insignificant whitespace from a JSON document
pub fn json_to_string(body: &[u8]) -> Result<String, ConvertError> {
    let value = parse_json(body)?;
    serde_json::to_string(&value).map_err(|e| ConvertError::new(Stage::ConvertBody, e))
}

/// Re-indent a JSON document with four spaces per level
pub fn string_to_json(body: &[u8]) -> Result<String, ConvertError> {
    let value = parse_json(body)?;

    let mut out = Vec::with_capacity(body.len() * 2);
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));
    value
        .serialize(&mut ser)
        .map_err(|e| ConvertError::new(Stage::MarshalIndent, e))?;

    String::from_utf8(out).map_err(|e| ConvertError::new(Stage::MarshalIndent, e))
}

fn parse_json(body: &[u8]) -> Result<serde_json::Value, ConvertError> {
    serde_json::from_slice(body).map_err(|e| ConvertError::new(Stage::ConvertBody, e))
}
