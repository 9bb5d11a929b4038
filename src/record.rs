//! Sector record layout.
//!
//! Every sector written by `fdpattern` holds the same 16-byte record repeated
//! end to end: the sector's own index followed by the iteration tag of the
//! run that wrote it. Both fields are little-endian regardless of host.

/// Size in bytes of one encoded record.
pub const RECORD_SIZE: usize = 16;

/// The fixed-width header tiled across each sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SectorRecord {
    /// Logical index of the sector holding this record.
    pub sect: u64,
    /// Iteration tag of the run that wrote it.
    pub iter: u64,
}

/// Which field of a record failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    SectorIndex,
    Iteration,
}

impl MismatchKind {
    /// Returns the human-readable name of this mismatch kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SectorIndex => "sector index mismatch",
            Self::Iteration => "iteration mismatch",
        }
    }
}

/// First failing record found in a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordMismatch {
    pub kind: MismatchKind,
    /// Byte offset of the failing record within the sector.
    pub offset: usize,
    pub expected: u64,
    pub found: u64,
}

/// Result of checking one sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorCheck {
    Verified,
    /// Leading record was all zero and sparse tolerance was on.
    SkippedSparse,
}

impl SectorRecord {
    pub fn new(sect: u64, iter: u64) -> Self {
        Self { sect, iter }
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[..8].copy_from_slice(&self.sect.to_le_bytes());
        out[8..].copy_from_slice(&self.iter.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8; RECORD_SIZE]) -> Self {
        let mut sect = [0u8; 8];
        let mut iter = [0u8; 8];
        sect.copy_from_slice(&bytes[..8]);
        iter.copy_from_slice(&bytes[8..]);
        Self {
            sect: u64::from_le_bytes(sect),
            iter: u64::from_le_bytes(iter),
        }
    }

    /// True if both fields are zero, i.e. the bytes were never written.
    pub fn is_zeroed(&self) -> bool {
        self.sect == 0 && self.iter == 0
    }
}

/// Tiles `record` across `buf`.
///
/// Trailing bytes that cannot hold a whole record are zeroed so the sector
/// content is fully determined by the record.
pub fn fill_sector(buf: &mut [u8], record: SectorRecord) {
    let encoded = record.encode();
    let mut chunks = buf.chunks_exact_mut(RECORD_SIZE);
    for chunk in &mut chunks {
        chunk.copy_from_slice(&encoded);
    }
    chunks.into_remainder().fill(0);
}

/// Checks that every record in `buf` belongs to `sector` and carries
/// `expected_iter`.
///
/// With `sparse` set, a sector whose leading record is all zero counts as
/// never written and is skipped. Records are checked in order, index before
/// tag, and the first failure is returned.
pub fn check_sector(
    buf: &[u8],
    sector: u64,
    expected_iter: u64,
    sparse: bool,
) -> Result<SectorCheck, RecordMismatch> {
    let records = buf.chunks_exact(RECORD_SIZE).map(|chunk| {
        let mut raw = [0u8; RECORD_SIZE];
        raw.copy_from_slice(chunk);
        SectorRecord::decode(&raw)
    });

    if sparse {
        if let Some(first) = records.clone().next() {
            if first.is_zeroed() {
                return Ok(SectorCheck::SkippedSparse);
            }
        }
    }

    for (idx, record) in records.enumerate() {
        let offset = idx * RECORD_SIZE;
        if record.sect != sector {
            return Err(RecordMismatch {
                kind: MismatchKind::SectorIndex,
                offset,
                expected: sector,
                found: record.sect,
            });
        }
        if record.iter != expected_iter {
            return Err(RecordMismatch {
                kind: MismatchKind::Iteration,
                offset,
                expected: expected_iter,
                found: record.iter,
            });
        }
    }

    Ok(SectorCheck::Verified)
}
