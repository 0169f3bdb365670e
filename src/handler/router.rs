//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: health probes, endpoint lookup, method
//! validation, body buffering and conversion.

use crate::config::{AppState, HttpConfig, RoutesConfig};
use crate::convert::{ConvertError, Stage};
use crate::handler::Endpoint;
use crate::http::{self, Envelope};
use crate::logger;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type Full = http_body_util::Full<Bytes>;

/// Why a request body could not be buffered
#[derive(Debug)]
enum BodyError {
    TooLarge(u64),
    Read(ConvertError),
}

impl BodyError {
    fn into_envelope(self) -> Envelope {
        match self {
            Self::TooLarge(max) => Envelope::failure(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("{} failed, body exceeds {max} bytes", Stage::ReadBody),
            ),
            Self::Read(err) => err.into(),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let http_config = &state.config.http;
    let path = req.uri().path();

    // 1. Health probes
    if let Some(resp) = check_health(req.method(), path, &state.config.routes, http_config) {
        return Ok(resp);
    }

    // 2. Endpoint lookup
    let Some(endpoint) = state.endpoints.get(path) else {
        logger::log_debug(&format!("No endpoint for {} {path}", req.method()));
        let envelope = Envelope::failure(StatusCode::NOT_FOUND, format!("no endpoint for {path}"));
        return Ok(http::build_envelope_response(&envelope, http_config));
    };

    // 3. Method check
    if let Some(resp) = check_http_method(req.method(), endpoint, http_config) {
        return Ok(resp);
    }

    // 4. Buffer the body
    let body = match read_body(req, http_config.max_body_size).await {
        Ok(body) => body,
        Err(err) => {
            match &err {
                BodyError::TooLarge(max) => logger::log_warning(&format!(
                    "[{}] request body exceeds {max} bytes",
                    endpoint.name()
                )),
                BodyError::Read(e) => logger::log_conversion_failed(endpoint.name(), e),
            }
            return Ok(http::build_envelope_response(
                &err.into_envelope(),
                http_config,
            ));
        }
    };

    // 5. Convert
    let result = endpoint.conversion.apply(&body);
    if let Err(e) = &result {
        logger::log_conversion_failed(endpoint.name(), e);
    }

    Ok(http::build_envelope_response(
        &Envelope::from(result),
        http_config,
    ))
}

fn check_health(
    method: &Method,
    path: &str,
    routes: &RoutesConfig,
    http_config: &HttpConfig,
) -> Option<Response<Full>> {
    let health = &routes.health;
    if !health.enabled || !matches!(*method, Method::GET | Method::HEAD) {
        return None;
    }
    // Readiness can include additional checks in the future
    (path == health.liveness_path || path == health.readiness_path)
        .then(|| http::build_health_response("ok", http_config))
}

/// Check HTTP method against the endpoint.
///
/// OPTIONS is answered as a CORS preflight only when CORS is enabled; otherwise it is
/// rejected like any other method.
fn check_http_method(
    method: &Method,
    endpoint: &Endpoint,
    http_config: &HttpConfig,
) -> Option<Response<Full>> {
    if *method == endpoint.method {
        return None;
    }
    if *method == Method::OPTIONS && http_config.enable_cors {
        return Some(http::build_options_response(http_config));
    }

    logger::log_debug(&format!(
        "Method not allowed: {method} {}",
        endpoint.path
    ));
    let envelope = Envelope::failure(
        StatusCode::METHOD_NOT_ALLOWED,
        format!(
            "{} not allowed method {method}, must be {}",
            endpoint.name(),
            endpoint.method
        ),
    );
    Some(http::build_405_response(&envelope, http_config))
}

/// Buffer the whole request body, honouring the configured size limit
async fn read_body<B>(req: Request<B>, max_body_size: u64) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    if max_body_size == 0 {
        return match req.into_body().collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) => {
                let e: BoxError = e.into();
                Err(BodyError::Read(ConvertError::new(Stage::ReadBody, e)))
            }
        };
    }

    if declared_length(&req).is_some_and(|len| len > max_body_size) {
        return Err(BodyError::TooLarge(max_body_size));
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(BodyError::TooLarge(max_body_size)),
        Err(e) => Err(BodyError::Read(ConvertError::new(Stage::ReadBody, e))),
    }
}

/// Content-Length header, if present and well formed
fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    let value = req.headers().get("content-length")?;
    match value.to_str().ok().map(str::parse::<u64>) {
        Some(Ok(len)) => Some(len),
        _ => {
            logger::log_warning("Invalid Content-Length header, skipping size check");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::StreamBody;
    use hyper::body::Frame;
    use std::io;

    fn test_state(max_body_size: u64) -> Arc<AppState> {
        let mut config = Config::for_tests();
        config.http.max_body_size = max_body_size;
        Arc::new(AppState::new(config))
    }

    fn cors_state() -> Arc<AppState> {
        let mut config = Config::for_tests();
        config.http.enable_cors = true;
        Arc::new(AppState::new(config))
    }

    async fn send(
        state: &Arc<AppState>,
        method: Method,
        path: &str,
        body: &'static [u8],
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::from_static(body)))
            .unwrap();
        let resp = handle_request(req, Arc::clone(state)).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(path: &str, body: &'static [u8]) -> serde_json::Value {
        send(&test_state(0), Method::POST, path, body).await.1
    }

    #[tokio::test]
    async fn test_yaml2json_success() {
        let value = post("/yaml2json", b"a: 1\nb: [x, y]\n").await;
        assert_eq!(value["code"], 200);
        assert_eq!(value["message"], "Success");
        assert_eq!(value["data"], r#"{"a":1,"b":["x","y"]}"#);
    }

    #[tokio::test]
    async fn test_yaml2json_invalid_body() {
        let (status, value) = send(&test_state(0), Method::POST, "/yaml2json", b"not: [valid yaml").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], 400);
        assert!(value["message"]
            .as_str()
            .unwrap()
            .contains("convert body failed"));
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_json2string_keeps_order() {
        let value = post("/json2string", br#"{ "b": 2, "a": 1 }"#).await;
        assert_eq!(value["data"], r#"{"b":2,"a":1}"#);
    }

    #[tokio::test]
    async fn test_string2json_indents() {
        let value = post("/string2json", br#"{"a":1}"#).await;
        assert_eq!(value["data"], "{\n    \"a\": 1\n}");
    }

    #[tokio::test]
    async fn test_json2yaml_then_yaml2json() {
        let yaml = post("/json2yaml", br#"{"list":[1,2],"name":"x"}"#).await;
        let yaml = yaml["data"].as_str().unwrap().to_string();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/yaml2json")
            .body(Full::new(Bytes::from(yaml)))
            .unwrap();
        let resp = handle_request(req, test_state(0)).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let round_trip: serde_json::Value =
            serde_json::from_str(value["data"].as_str().unwrap()).unwrap();
        assert_eq!(round_trip, serde_json::json!({"list": [1, 2], "name": "x"}));
    }

    #[tokio::test]
    async fn test_base64_endpoints() {
        assert_eq!(post("/base64encode", b"hello").await["data"], "aGVsbG8=");
        assert_eq!(post("/base64decode", b"aGVsbG8=").await["data"], "hello");

        let value = post("/base64decode", b"%%%").await;
        assert_eq!(value["code"], 400);
        assert!(value["message"]
            .as_str()
            .unwrap()
            .starts_with("base64 decode failed, "));
    }

    #[tokio::test]
    async fn test_url_endpoints() {
        assert_eq!(post("/urlencode", b"a b&c").await["data"], "a+b%26c");
        assert_eq!(post("/urldecode", b"a+b%26c").await["data"], "a b&c");

        let value = post("/urldecode", b"%G1").await;
        assert_eq!(value["code"], 400);
        assert_eq!(value["message"], r#"url decode failed, invalid URL escape "%G1""#);
    }

    #[tokio::test]
    async fn test_md5_endpoint() {
        let value = post("/md5", b"hello").await;
        assert_eq!(value["code"], 200);
        assert_eq!(value["data"], "5d41402abc4b2a76b9719d911017c592");
    }

    #[tokio::test]
    async fn test_empty_body_accepted() {
        assert_eq!(post("/md5", b"").await["data"], "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(post("/base64encode", b"").await["data"], "");
    }

    #[tokio::test]
    async fn test_wrong_method_rejected() {
        let state = test_state(0);
        let req = Request::builder()
            .method(Method::GET)
            .uri("/md5")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_request(req, Arc::clone(&state)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["allow"], "POST");

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["code"], 405);
        let message = value["message"].as_str().unwrap();
        assert!(message.contains("GET"));
        assert!(message.contains("POST"));
    }

    #[tokio::test]
    async fn test_wrong_method_same_code_everywhere() {
        let state = test_state(0);
        for path in state.endpoints.paths() {
            let (status, value) = send(&state, Method::PUT, path, b"").await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{path}");
            assert_eq!(value["code"], 405, "{path}");
        }
    }

    #[tokio::test]
    async fn test_options_preflight_with_cors() {
        let (status, value) = send(&cors_state(), Method::OPTIONS, "/json2yaml", b"").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(value.is_null());
    }

    #[tokio::test]
    async fn test_options_without_cors_rejected() {
        let (status, value) = send(&test_state(0), Method::OPTIONS, "/md5", b"").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(value["code"], 405);
        assert_eq!(value["message"], "md5 not allowed method OPTIONS, must be POST");
    }

    /// A body that yields one chunk and then fails mid-stream
    fn broken_body() -> StreamBody<impl futures::Stream<Item = Result<Frame<Bytes>, io::Error>>> {
        StreamBody::new(futures::stream::iter(vec![
            Ok(Frame::data(Bytes::from_static(b"ab"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]))
    }

    async fn post_broken_body(state: Arc<AppState>) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/md5")
            .body(broken_body())
            .unwrap();
        let resp = handle_request(req, state).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_body_read_failure_unlimited() {
        let (status, value) = post_broken_body(test_state(0)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["code"], 400);
        assert_eq!(value["message"], "read body failed, reset");
        assert!(value.get("data").is_none());
    }

    #[tokio::test]
    async fn test_body_read_failure_limited() {
        let (status, value) = post_broken_body(test_state(1024)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["message"]
            .as_str()
            .unwrap()
            .starts_with("read body failed, "));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let (status, value) = send(&test_state(0), Method::POST, "/sha1", b"x").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["message"], "no endpoint for /sha1");
    }

    #[tokio::test]
    async fn test_health_probes() {
        let state = test_state(0);
        let (status, value) = send(&state, Method::GET, "/healthz", b"").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "ok");

        let (status, _) = send(&state, Method::GET, "/readyz", b"").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&state, Method::POST, "/healthz", b"").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let state = test_state(4);
        let (status, value) = send(&state, Method::POST, "/md5", b"12345").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(value["code"], 413);
        assert_eq!(value["message"], "read body failed, body exceeds 4 bytes");

        let (status, value) = send(&state, Method::POST, "/md5", b"1234").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["data"], "81dc9bdb52d04dc20036dbd8313ed055");
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/md5")
            .header("content-length", "1000")
            .body(Full::new(Bytes::from_static(b"tiny")))
            .unwrap();
        let resp = handle_request(req, test_state(16)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
