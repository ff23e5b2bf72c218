//! WebSocket framing (RFC 6455 §5).
//!
//! Decodes a single frame from a TCP payload: flags, opcode, the 7/16/64-bit
//! length encoding and the masking key. A payload only decodes when its size
//! matches the header exactly; partial or coalesced segments are reported as
//! invalid rather than guessed at. Fragmented messages are not reassembled.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::FrameError;
pub use parser::{
    CloseInfo, Opcode, WebSocketFrame, apply_mask, decode_frame, encode_frame,
    parse_close_payload,
};
