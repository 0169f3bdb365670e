//! Conversion module
//!
//! Pure transforms from a request body to the string carried in the response envelope.
//! Nothing here touches the network or shared state, so every function can be called
//! concurrently from any number of requests.

mod digest;
mod encoding;
mod json;

pub use digest::md5_hex;
pub use encoding::{base64_decode, base64_encode, url_decode, url_encode};
pub use json::{json_to_string, json_to_yaml, string_to_json, yaml_to_json};

use std::fmt;

/// Step of a transform that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadBody,
    ConvertBody,
    MarshalBody,
    MarshalIndent,
    Base64Decode,
    UrlDecode,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadBody => "read body",
            Self::ConvertBody => "convert body",
            Self::MarshalBody => "marshal body",
            Self::MarshalIndent => "marshal indent",
            Self::Base64Decode => "base64 decode",
            Self::UrlDecode => "url decode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transform failure, rendered as `"<stage> failed, <cause>"`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failed, {cause}")]
pub struct ConvertError {
    pub stage: Stage,
    pub cause: String,
}

impl ConvertError {
    pub fn new(stage: Stage, cause: impl fmt::Display) -> Self {
        Self {
            stage,
            cause: cause.to_string(),
        }
    }
}

/// The fixed set of conversions exposed over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    YamlToJson,
    JsonToYaml,
    JsonToString,
    StringToJson,
    Base64Encode,
    Base64Decode,
    UrlEncode,
    UrlDecode,
    Md5,
}

impl Conversion {
    pub const ALL: [Self; 9] = [
        Self::YamlToJson,
        Self::JsonToYaml,
        Self::JsonToString,
        Self::StringToJson,
        Self::Base64Encode,
        Self::Base64Decode,
        Self::UrlEncode,
        Self::UrlDecode,
        Self::Md5,
    ];

    /// Request path the conversion is served on
    pub const fn path(self) -> &'static str {
        match self {
            Self::YamlToJson => "/yaml2json",
            Self::JsonToYaml => "/json2yaml",
            Self::JsonToString => "/json2string",
            Self::StringToJson => "/string2json",
            Self::Base64Encode => "/base64encode",
            Self::Base64Decode => "/base64decode",
            Self::UrlEncode => "/urlencode",
            Self::UrlDecode => "/urldecode",
            Self::Md5 => "/md5",
        }
    }

    /// Human readable name used in envelope messages and logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::YamlToJson => "yaml2json",
            Self::JsonToYaml => "json2yaml",
            Self::JsonToString => "json2string",
            Self::StringToJson => "string2json",
            Self::Base64Encode => "base64 encode",
            Self::Base64Decode => "base64 decode",
            Self::UrlEncode => "url encode",
            Self::UrlDecode => "url decode",
            Self::Md5 => "md5",
        }
    }

    pub fn apply(self, body: &[u8]) -> Result<String, ConvertError> {
        match self {
            Self::YamlToJson => yaml_to_json(body),
            Self::JsonToYaml => json_to_yaml(body),
            Self::JsonToString => json_to_string(body),
            Self::StringToJson => string_to_json(body),
            Self::Base64Encode => Ok(base64_encode(body)),
            Self::Base64Decode => base64_decode(body),
            Self::UrlEncode => Ok(url_encode(body)),
            Self::UrlDecode => url_decode(body),
            Self::Md5 => Ok(md5_hex(body)),
        }
    }
}
