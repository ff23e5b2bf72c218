use super::error::FrameError;

/// Bounds-checked big-endian access to a frame buffer.
pub struct FrameReader<'a> {
    buf: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), FrameError> {
        if self.buf.len() < needed {
            return Err(FrameError::TooShort {
                needed,
                actual: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, FrameError> {
        self.buf.get(offset).copied().ok_or(FrameError::TooShort {
            needed: offset + 1,
            actual: self.buf.len(),
        })
    }

    pub fn read_u16_be(&self, offset: usize) -> Result<u16, FrameError> {
        let bytes = self.read_array::<2>(offset)?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_u32_be(&self, offset: usize) -> Result<u32, FrameError> {
        let bytes = self.read_array::<4>(offset)?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn read_u64_be(&self, offset: usize) -> Result<u64, FrameError> {
        let bytes = self.read_array::<8>(offset)?;
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], FrameError> {
        self.buf.get(range.clone()).ok_or(FrameError::TooShort {
            needed: range.end,
            actual: self.buf.len(),
        })
    }

    fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], FrameError> {
        let end = offset.checked_add(N).ok_or(FrameError::TooShort {
            needed: usize::MAX,
            actual: self.buf.len(),
        })?;
        let bytes = self.read_slice(offset..end)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}
