//! Minimal HTTP/1.x head parsing.
//!
//! Only the start line and header fields are decoded, which is all the
//! upgrade handshake needs. Header order and original name casing are kept;
//! lookups are case-insensitive.

pub mod error;
pub mod layout;
pub mod parser;

pub use error::HttpError;
pub use parser::{HttpField, HttpMessage, HttpRequest, HttpResponse, parse_http};
