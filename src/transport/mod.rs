//! HTTP transport to the AI service.

mod http;

pub use http::{HttpTransport, TransportError, TransportSettings};
