//! Request handler module
//!
//! Responsible for matching a request to its conversion endpoint and producing the
//! enveloped response.

pub mod endpoints;
pub mod router;

pub use endpoints::{Endpoint, EndpointTable};
// Re-export main entry point
pub use router::handle_request;
