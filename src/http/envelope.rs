//! Uniform response envelope
//!
//! Every conversion endpoint answers with `{"code": .., "message": .., "data": ..}`.
//! `data` is only present on success and an empty `message` is left out.

use hyper::body::Bytes;
use hyper::StatusCode;
use serde::Serialize;

use crate::convert::ConvertError;

/// Body written when the envelope itself cannot be produced
pub const FALLBACK_BODY: &str = r#"{"code": 500, "message": "internal error"}"#;

const SUCCESS_MESSAGE: &str = "Success";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Success { data: String },
    Failure { code: u16, message: String },
}

#[derive(Serialize)]
struct Wire<'a> {
    code: u16,
    #[serde(skip_serializing_if = "str::is_empty")]
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a str>,
}

impl Envelope {
    pub const fn success(data: String) -> Self {
        Self::Success { data }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Failure {
            code: status.as_u16(),
            message: message.into(),
        }
    }

    /// Serialize to the wire format.
    ///
    /// Falls back to [`FALLBACK_BODY`] with a 500 status when the code is unset or
    /// not a valid HTTP status, or when serialization fails.
    pub fn to_body(&self) -> (StatusCode, Bytes) {
        let wire = match self {
            Self::Success { data } => Wire {
                code: StatusCode::OK.as_u16(),
                message: SUCCESS_MESSAGE,
                data: Some(data.as_str()),
            },
            Self::Failure { code, message } => Wire {
                code: *code,
                message: message.as_str(),
                data: None,
            },
        };

        let status = match StatusCode::from_u16(wire.code) {
            Ok(status) if wire.code != 0 => status,
            _ => return fallback(),
        };

        match serde_json::to_vec(&wire) {
            Ok(body) => (status, Bytes::from(body)),
            Err(e) => {
                crate::logger::log_error(&format!("Failed to serialize envelope: {e}"));
                fallback()
            }
        }
    }
}

impl From<ConvertError> for Envelope {
    fn from(err: ConvertError) -> Self {
        Self::failure(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<Result<String, ConvertError>> for Envelope {
    fn from(result: Result<String, ConvertError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => err.into(),
        }
    }
}

fn fallback() -> (StatusCode, Bytes) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Bytes::from_static(FALLBACK_BODY.as_bytes()),
    )
}
