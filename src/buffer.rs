//! One-sector I/O buffer.

/// Start alignment of every sector buffer; enough for direct I/O on any
/// logical sector size we accept.
pub const BUFFER_ALIGN: usize = 4096;

/// Owned buffer exactly one sector long with a 4 KiB aligned start.
///
/// The backing vector is over-allocated by one alignment unit and never
/// resized, so the aligned window stays valid for the buffer's lifetime.
pub struct SectorBuf {
    storage: Vec<u8>,
    start: usize,
    len: usize,
}

impl SectorBuf {
    /// Creates a zeroed buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        let storage = vec![0u8; len + BUFFER_ALIGN];
        let start = storage.as_ptr().align_offset(BUFFER_ALIGN);
        // align_offset on a byte pointer always succeeds, but stay in bounds
        // should it ever decline.
        let start = if start > BUFFER_ALIGN { 0 } else { start };
        Self {
            storage,
            start,
            len,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.start..self.start + self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.start..self.start + self.len]
    }
}
