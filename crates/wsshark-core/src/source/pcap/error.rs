use thiserror::Error;

/// Failures while replaying a capture file.
#[derive(Debug, Error)]
pub enum PcapSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file ends in the middle of a block, typically a capture that was
    /// still being written.
    #[error("capture truncated inside a block ({context})")]
    Truncated { context: &'static str },
    #[error("PCAP parse error ({context}): {message}")]
    Pcap {
        context: &'static str,
        message: String,
    },
}
