use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to write archive {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("packet of {len} bytes does not fit a capture block")]
    PacketTooLarge { len: usize },
    #[error("link type {0} cannot be stored in a pcapng interface block")]
    UnsupportedLinktype(i32),
}
