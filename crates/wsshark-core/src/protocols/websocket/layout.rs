//! RFC 6455 §5.2 base framing: byte 0 carries FIN/RSV/opcode, byte 1 carries
//! MASK and the 7-bit length indicator, followed by the optional extended
//! length, the optional masking key, then the payload.

pub const FIN_OFFSET: usize = 0;
pub const LENGTH_INFO_OFFSET: usize = 1;
pub const EXTENDED_LENGTH_OFFSET: usize = 2;

pub const BASE_HEADER_LEN: usize = 2;
pub const MASKING_KEY_LEN: usize = 4;

pub const FIN_BIT: u8 = 0x80;
pub const RSV_MASK: u8 = 0x70;
pub const RSV_SHIFT: u32 = 4;
pub const OPCODE_MASK: u8 = 0x0f;
pub const MASK_BIT: u8 = 0x80;
pub const LENGTH_INFO_MASK: u8 = 0x7f;

/// Largest payload length carried directly in the 7-bit indicator.
pub const MAX_INLINE_LENGTH: u8 = 125;
pub const LENGTH_INFO_U16: u8 = 126;
pub const LENGTH_INFO_U64: u8 = 127;
pub const EXTENDED_LENGTH_U16_LEN: usize = 2;
pub const EXTENDED_LENGTH_U64_LEN: usize = 8;

pub const OPCODE_CONTINUATION: u8 = 0x0;
pub const OPCODE_TEXT: u8 = 0x1;
pub const OPCODE_BINARY: u8 = 0x2;
pub const OPCODE_CLOSE: u8 = 0x8;
pub const OPCODE_PING: u8 = 0x9;
pub const OPCODE_PONG: u8 = 0xa;

pub const CLOSE_CODE_LEN: usize = 2;
