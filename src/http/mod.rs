//! HTTP protocol layer module
//!
//! The response envelope shared by every conversion endpoint and the builders that
//! turn it into hyper responses.

pub mod envelope;
pub mod response;

pub use envelope::Envelope;
pub use response::{
    build_405_response, build_envelope_response, build_health_response, build_options_response,
};
