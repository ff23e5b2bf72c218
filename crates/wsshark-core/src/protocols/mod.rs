//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets, bit masks and constants (source of truth)
//! - `reader`: safe byte access where the format is binary
//! - `parser`: domain-level decoding
//! - `error`: explicit, actionable errors
//!
//! Parsers are pure and contain no I/O; sources and analysis layers handle
//! capture access and session state.

pub mod http;
pub mod websocket;
