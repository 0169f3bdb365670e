//! HTTP response building module
//!
//! Builds the responses the dispatcher sends. All JSON responses carry the configured
//! `Server` header and, when CORS is enabled, `Access-Control-Allow-Origin`.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};

use super::envelope::Envelope;
use crate::config::HttpConfig;

pub const ALLOWED_METHODS: &str = "POST";
const PREFLIGHT_METHODS: &str = "POST, OPTIONS";

/// Build a response carrying the envelope; the status line mirrors the envelope code
pub fn build_envelope_response(envelope: &Envelope, http: &HttpConfig) -> Response<Full<Bytes>> {
    let (status, body) = envelope.to_body();
    finish(json_builder(status, http), body, status)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(envelope: &Envelope, http: &HttpConfig) -> Response<Full<Bytes>> {
    let (status, body) = envelope.to_body();
    let builder = json_builder(status, http).header("Allow", ALLOWED_METHODS);
    finish(builder, body, status)
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(http: &HttpConfig) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Server", http.server_name.as_str())
        .header("Allow", PREFLIGHT_METHODS);

    if http.enable_cors {
        builder = builder
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", PREFLIGHT_METHODS)
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    finish(builder, Bytes::new(), StatusCode::NO_CONTENT)
}

/// Build health probe response
pub fn build_health_response(status: &str, http: &HttpConfig) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "status": status }).to_string();
    finish(json_builder(StatusCode::OK, http), Bytes::from(body), StatusCode::OK)
}

fn json_builder(status: StatusCode, http: &HttpConfig) -> Builder {
    let builder = Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Server", http.server_name.as_str());

    if http.enable_cors {
        builder.header("Access-Control-Allow-Origin", "*")
    } else {
        builder
    }
}

fn finish(builder: Builder, body: Bytes, status: StatusCode) -> Response<Full<Bytes>> {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status, &e);
        let mut fallback = Response::new(Full::new(Bytes::from_static(
            super::envelope::FALLBACK_BODY.as_bytes(),
        )));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
