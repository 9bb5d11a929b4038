//! Per-run statistics.

use crate::traits::Phase;
use bytesize::ByteSize;
use std::fmt;
use std::time::Duration;

/// Counters collected by one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub phase: Phase,
    /// Sectors written, or sectors read on verify.
    pub sectors_processed: u64,
    /// Sectors skipped as never written under sparse tolerance.
    pub sectors_skipped: u64,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl ScanStats {
    /// Creates empty stats for `phase`.
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            sectors_processed: 0,
            sectors_skipped: 0,
            bytes: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Records one sector of `sector_size` bytes.
    pub fn add_sector(&mut self, sector_size: u64) {
        self.sectors_processed += 1;
        self.bytes += sector_size;
    }

    pub fn add_skipped(&mut self) {
        self.sectors_skipped += 1;
    }

    /// Throughput in bytes per second, zero for instantaneous runs.
    pub fn bytes_per_sec(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.bytes as f64 / secs) as u64
        } else {
            0
        }
    }
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Drop sub-millisecond noise from the rendered duration.
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        write!(
            f,
            "{} {} sectors ({}) in {}",
            match self.phase {
                Phase::Write => "Wrote",
                Phase::Verify => "Verified",
            },
            self.sectors_processed,
            ByteSize(self.bytes),
            humantime::format_duration(elapsed),
        )?;
        if self.sectors_skipped > 0 {
            write!(f, ", {} unwritten sectors skipped", self.sectors_skipped)?;
        }
        if self.bytes_per_sec() > 0 {
            write!(f, " [{}/s]", ByteSize(self.bytes_per_sec()))?;
        }
        Ok(())
    }
}
