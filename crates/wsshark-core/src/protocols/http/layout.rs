pub const HEAD_TERMINATOR: &[u8; 4] = b"\r\n\r\n";
pub const VERSION_PREFIX: &str = "HTTP/";
pub const HEADER_SEPARATOR: char = ':';
pub const STATUS_CODE_LEN: usize = 3;

/// Status code of a successful protocol upgrade.
pub const STATUS_SWITCHING_PROTOCOLS: u16 = 101;
