use std::fmt;

use super::error::FrameError;
use super::layout;
use super::reader::FrameReader;

/// Frame opcode. Values outside the six defined by RFC 6455 are kept as
/// `Unknown` so extension traffic still decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
    Unknown(u8),
}

impl Opcode {
    pub fn from_u8(value: u8) -> Self {
        match value & layout::OPCODE_MASK {
            layout::OPCODE_CONTINUATION => Opcode::Continuation,
            layout::OPCODE_TEXT => Opcode::Text,
            layout::OPCODE_BINARY => Opcode::Binary,
            layout::OPCODE_CLOSE => Opcode::Close,
            layout::OPCODE_PING => Opcode::Ping,
            layout::OPCODE_PONG => Opcode::Pong,
            other => Opcode::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Opcode::Continuation => layout::OPCODE_CONTINUATION,
            Opcode::Text => layout::OPCODE_TEXT,
            Opcode::Binary => layout::OPCODE_BINARY,
            Opcode::Close => layout::OPCODE_CLOSE,
            Opcode::Ping => layout::OPCODE_PING,
            Opcode::Pong => layout::OPCODE_PONG,
            Opcode::Unknown(value) => value & layout::OPCODE_MASK,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Continuation => f.write_str("continuation"),
            Opcode::Text => f.write_str("text"),
            Opcode::Binary => f.write_str("binary"),
            Opcode::Close => f.write_str("close"),
            Opcode::Ping => f.write_str("ping"),
            Opcode::Pong => f.write_str("pong"),
            Opcode::Unknown(value) => write!(f, "unknown({value:#x})"),
        }
    }
}

/// A decoded frame borrowing its payload from the TCP segment.
///
/// `payload` is exactly as received: still masked when `masked` is set. Use
/// [`WebSocketFrame::unmask`] to recover the application bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketFrame<'a> {
    pub is_final: bool,
    /// RSV1..RSV3 as a 3-bit value. Extensions are not interpreted.
    pub reserved: u8,
    pub opcode: Opcode,
    pub masked: bool,
    pub payload_length: u64,
    /// Masking key read big-endian; present iff `masked`.
    pub masking_key: Option<u32>,
    pub payload: &'a [u8],
}

impl WebSocketFrame<'_> {
    /// The masking key in network byte order, as it is applied to the payload.
    pub fn masking_key_bytes(&self) -> Option<[u8; 4]> {
        self.masking_key.map(u32::to_be_bytes)
    }

    /// Payload with the masking key removed (a plain copy when unmasked).
    pub fn unmask(&self) -> Vec<u8> {
        let mut payload = self.payload.to_vec();
        if let Some(key) = self.masking_key_bytes() {
            apply_mask(&mut payload, key);
        }
        payload
    }
}

/// Status code and reason carried by a Close frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: String,
}

/// Decode one frame occupying the whole of `buf`.
///
/// The header is decoded first, then the total size it implies is compared
/// with the buffer length. Truncated and over-long buffers are both rejected,
/// so `payload.len() == payload_length` holds for every returned frame.
pub fn decode_frame(buf: &[u8]) -> Result<WebSocketFrame<'_>, FrameError> {
    let reader = FrameReader::new(buf);
    reader.require_len(layout::BASE_HEADER_LEN)?;

    let flags = reader.read_u8(layout::FIN_OFFSET)?;
    let length_info = reader.read_u8(layout::LENGTH_INFO_OFFSET)?;
    let masked = length_info & layout::MASK_BIT != 0;

    let (payload_length, extended_len) = match length_info & layout::LENGTH_INFO_MASK {
        layout::LENGTH_INFO_U16 => (
            reader.read_u16_be(layout::EXTENDED_LENGTH_OFFSET)? as u64,
            layout::EXTENDED_LENGTH_U16_LEN,
        ),
        layout::LENGTH_INFO_U64 => (
            reader.read_u64_be(layout::EXTENDED_LENGTH_OFFSET)?,
            layout::EXTENDED_LENGTH_U64_LEN,
        ),
        inline => (inline as u64, 0),
    };

    let mask_offset = layout::EXTENDED_LENGTH_OFFSET + extended_len;
    let (masking_key, payload_offset) = if masked {
        (
            Some(reader.read_u32_be(mask_offset)?),
            mask_offset + layout::MASKING_KEY_LEN,
        )
    } else {
        (None, mask_offset)
    };

    let expected = (payload_offset as u64)
        .checked_add(payload_length)
        .ok_or(FrameError::LengthOverflow { payload_length })?;
    if expected != buf.len() as u64 {
        return Err(FrameError::LengthMismatch {
            expected,
            actual: buf.len(),
        });
    }

    Ok(WebSocketFrame {
        is_final: flags & layout::FIN_BIT != 0,
        reserved: (flags & layout::RSV_MASK) >> layout::RSV_SHIFT,
        opcode: Opcode::from_u8(flags),
        masked,
        payload_length,
        masking_key,
        payload: reader.read_slice(payload_offset..buf.len())?,
    })
}

/// Encode a frame with the shortest length encoding for `payload`.
///
/// Passing a masking key masks the payload and sets the MASK bit.
pub fn encode_frame(
    is_final: bool,
    opcode: Opcode,
    masking_key: Option<[u8; 4]>,
    payload: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 14);
    let fin = if is_final { layout::FIN_BIT } else { 0 };
    out.push(fin | opcode.as_u8());

    let mask = if masking_key.is_some() {
        layout::MASK_BIT
    } else {
        0
    };
    let len = payload.len();
    if len <= layout::MAX_INLINE_LENGTH as usize {
        out.push(mask | len as u8);
    } else if let Ok(len) = u16::try_from(len) {
        out.push(mask | layout::LENGTH_INFO_U16);
        out.extend_from_slice(&len.to_be_bytes());
    } else {
        out.push(mask | layout::LENGTH_INFO_U64);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    match masking_key {
        Some(key) => {
            out.extend_from_slice(&key);
            let start = out.len();
            out.extend_from_slice(payload);
            apply_mask(&mut out[start..], key);
        }
        None => out.extend_from_slice(payload),
    }
    out
}

/// XOR `payload` in place with the cycling 4-byte key. Masking and unmasking
/// are the same operation.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Split an (unmasked) Close payload into its status code and reason.
pub fn parse_close_payload(payload: &[u8]) -> CloseInfo {
    if payload.len() < layout::CLOSE_CODE_LEN {
        return CloseInfo::default();
    }
    let code = u16::from_be_bytes([payload[0], payload[1]]);
    CloseInfo {
        code: Some(code),
        reason: String::from_utf8_lossy(&payload[layout::CLOSE_CODE_LEN..]).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Opcode, apply_mask, decode_frame, encode_frame, parse_close_payload};
    use crate::protocols::websocket::error::FrameError;

    #[test]
    fn decode_masked_hello() {
        let buf = [
            0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58,
        ];
        let frame = decode_frame(&buf).unwrap();
        assert!(frame.is_final);
        assert_eq!(frame.reserved, 0);
        assert_eq!(frame.opcode, Opcode::Text);
        assert!(frame.masked);
        assert_eq!(frame.payload_length, 5);
        assert_eq!(frame.masking_key, Some(0x37fa_213d));
        assert_eq!(frame.unmask(), b"Hello");
    }

    #[test]
    fn decode_unmasked_payload_is_returned_as_is() {
        let buf = [0x82, 0x03, 0x01, 0x02, 0x03];
        let frame = decode_frame(&buf).unwrap();
        assert_eq!(frame.opcode, Opcode::Binary);
        assert!(!frame.masked);
        assert_eq!(frame.masking_key, None);
        assert_eq!(frame.unmask(), vec![1, 2, 3]);
    }

    #[test]
    fn masked_round_trip_covers_all_length_encodings() {
        let key = [0xa1, 0x02, 0xff, 0x5c];
        for len in [0usize, 1, 125, 126, 65536] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let buf = encode_frame(true, Opcode::Text, Some(key), &payload);
            let frame = decode_frame(&buf).unwrap();
            assert!(frame.is_final);
            assert_eq!(frame.opcode, Opcode::Text);
            assert!(frame.masked);
            assert_eq!(frame.payload_length, len as u64);
            assert_eq!(frame.unmask(), payload, "payload length {len}");
        }
    }

    #[test]
    fn extended_length_header_sizes() {
        assert_eq!(encode_frame(true, Opcode::Binary, None, &[0; 125]).len(), 2 + 125);
        assert_eq!(encode_frame(true, Opcode::Binary, None, &[0; 126]).len(), 4 + 126);
        assert_eq!(
            encode_frame(true, Opcode::Binary, None, &[0; 65536]).len(),
            10 + 65536
        );
    }

    #[test]
    fn empty_and_single_byte_buffers_are_invalid() {
        assert!(matches!(
            decode_frame(&[]),
            Err(FrameError::TooShort { needed: 2, .. })
        ));
        assert!(matches!(
            decode_frame(&[0x81]),
            Err(FrameError::TooShort { needed: 2, .. })
        ));
    }

    #[test]
    fn truncated_payload_is_invalid() {
        let mut buf = vec![0x81, 0x0a];
        buf.extend_from_slice(b"short");
        let err = decode_frame(&buf).unwrap_err();
        assert_eq!(
            err,
            FrameError::LengthMismatch {
                expected: 12,
                actual: 7
            }
        );
    }

    #[test]
    fn trailing_bytes_are_invalid() {
        let mut buf = encode_frame(true, Opcode::Text, None, b"hi");
        buf.push(0x00);
        assert!(matches!(
            decode_frame(&buf),
            Err(FrameError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn truncated_extended_length_or_mask_is_invalid() {
        assert!(matches!(
            decode_frame(&[0x81, 0x7e, 0x00]),
            Err(FrameError::TooShort { .. })
        ));
        assert!(matches!(
            decode_frame(&[0x81, 0x85, 0x37, 0xfa]),
            Err(FrameError::TooShort { .. })
        ));
    }

    #[test]
    fn huge_declared_length_does_not_overflow() {
        let mut buf = vec![0x82, 0xff];
        buf.extend_from_slice(&u64::MAX.to_be_bytes());
        buf.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(
            decode_frame(&buf).unwrap_err(),
            FrameError::LengthOverflow {
                payload_length: u64::MAX
            }
        );
    }

    #[test]
    fn unknown_opcode_still_decodes() {
        let frame = decode_frame(&[0x83, 0x00]).unwrap();
        assert_eq!(frame.opcode, Opcode::Unknown(3));
        assert_eq!(frame.opcode.to_string(), "unknown(0x3)");
    }

    #[test]
    fn reserved_bits_are_reported() {
        let frame = decode_frame(&[0x71, 0x00]).unwrap();
        assert!(!frame.is_final);
        assert_eq!(frame.reserved, 0b111);
        assert_eq!(frame.opcode, Opcode::Text);
    }

    #[test]
    fn mask_is_an_involution() {
        let key = [1, 2, 3, 4];
        let mut data = b"abcdefg".to_vec();
        apply_mask(&mut data, key);
        assert_ne!(data, b"abcdefg");
        apply_mask(&mut data, key);
        assert_eq!(data, b"abcdefg");
    }

    #[test]
    fn close_payload_code_and_reason() {
        let info = parse_close_payload(&[0x03, 0xe8, b'b', b'y', b'e']);
        assert_eq!(info.code, Some(1000));
        assert_eq!(info.reason, "bye");
        assert_eq!(parse_close_payload(&[]).code, None);
    }
}
