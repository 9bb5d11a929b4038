//! Error types for pattern runs.
//!
//! Every failure is fatal to the run. Each variant maps to a process exit
//! status so operators can tell corruption from stale data from plain I/O
//! trouble without parsing output.

use crate::record::{MismatchKind, RecordMismatch};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status for a successful run.
pub const EXIT_OK: i32 = 0;
/// Usage and open failures.
pub const EXIT_USAGE: i32 = 1;
/// A record belongs to a different sector.
pub const EXIT_SECTOR_MISMATCH: i32 = 1;
/// A record was written by a different iteration.
pub const EXIT_ITERATION_MISMATCH: i32 = 2;
/// Probe, seek, read, write and sync failures.
pub const EXIT_IO: i32 = 255;
/// Run stopped by SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Unified error type for fdpattern operations.
#[derive(Error, Debug)]
pub enum FdpatternError {
    /// Malformed or inconsistent arguments; holds the rendered usage text.
    #[error("{0}")]
    Usage(String),

    #[error("Unable to open [{}]: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Geometry query failed or the target is not usable.
    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Unable to seek to sector {sector}: {source}")]
    Seek {
        sector: u64,
        #[source]
        source: io::Error,
    },

    #[error("Read failed at sector {sector}: {source}")]
    ShortRead {
        sector: u64,
        #[source]
        source: io::Error,
    },

    #[error("Write failed at sector {sector}: {source}")]
    ShortWrite {
        sector: u64,
        #[source]
        source: io::Error,
    },

    #[error("Flushing target failed: {0}")]
    Sync(#[source] io::Error),

    #[error("Sector {sector}, off {offset}: sector number does not match (found {found})")]
    SectorMismatch {
        sector: u64,
        offset: usize,
        found: u64,
    },

    #[error(
        "Sector {sector}, off {offset}: iteration number does not match \
         (expected {expected}, found {found})"
    )]
    IterationMismatch {
        sector: u64,
        offset: usize,
        expected: u64,
        found: u64,
    },

    #[error("Interrupted after {completed} sectors")]
    Interrupted { completed: u64 },
}

impl FdpatternError {
    /// Builds the verify failure for `mismatch` found in `sector`.
    pub fn from_mismatch(sector: u64, mismatch: RecordMismatch) -> Self {
        match mismatch.kind {
            MismatchKind::SectorIndex => Self::SectorMismatch {
                sector,
                offset: mismatch.offset,
                found: mismatch.found,
            },
            MismatchKind::Iteration => Self::IterationMismatch {
                sector,
                offset: mismatch.offset,
                expected: mismatch.expected,
                found: mismatch.found,
            },
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Open { .. } => EXIT_USAGE,
            Self::SectorMismatch { .. } => EXIT_SECTOR_MISMATCH,
            Self::IterationMismatch { .. } => EXIT_ITERATION_MISMATCH,
            Self::Probe(_)
            | Self::Seek { .. }
            | Self::ShortRead { .. }
            | Self::ShortWrite { .. }
            | Self::Sync(_) => EXIT_IO,
            Self::Interrupted { .. } => EXIT_INTERRUPTED,
        }
    }

    /// True for content failures found by verify.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::SectorMismatch { .. } | Self::IterationMismatch { .. }
        )
    }
}
