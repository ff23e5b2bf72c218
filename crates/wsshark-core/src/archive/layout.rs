pub const BLOCK_SECTION_HEADER: u32 = 0x0A0D_0D0A;
pub const BLOCK_INTERFACE_DESCRIPTION: u32 = 0x0000_0001;
pub const BLOCK_ENHANCED_PACKET: u32 = 0x0000_0006;

pub const BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;
/// Section length is not computed up front.
pub const SECTION_LENGTH_UNSPECIFIED: i64 = -1;

/// Block type + total length before the body, total length again after it.
pub const BLOCK_OVERHEAD: usize = 12;
pub const BLOCK_ALIGNMENT: usize = 4;

pub const ARCHIVE_EXTENSION: &str = "pcapng";
pub const ARCHIVE_PREFIX: &str = "websock";
