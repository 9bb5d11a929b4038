//! Progress reporting seam.
//!
//! The scan loops report through `ProgressSink` so the console front end and
//! tests can observe a run without the loops knowing about terminals.

use crate::stats::ScanStats;

/// Which pass a run is performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Write,
    Verify,
}

impl Phase {
    /// Returns the verb used in checkpoint lines.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Write => "Writing",
            Self::Verify => "Verifying",
        }
    }
}

/// Coarse progress checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    /// Step about to be performed.
    pub current: u64,
    /// Total steps in this run.
    pub total: u64,
}

impl ProgressUpdate {
    /// Renders the operator-facing checkpoint line.
    pub fn line(&self) -> String {
        format!("{} sector {} of {}", self.phase.verb(), self.current, self.total)
    }
}

/// Receives progress from a scan.
pub trait ProgressSink {
    /// Called once before the first sector.
    fn begin(&mut self, _phase: Phase, _total: u64) {}

    /// Called after every completed sector.
    fn advance(&mut self, _sectors: u64) {}

    /// Called every `PROGRESS_INTERVAL` steps, starting with step 0.
    fn checkpoint(&mut self, update: &ProgressUpdate);

    /// Called once after a successful scan.
    fn finish(&mut self, _stats: &ScanStats) {}
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn checkpoint(&mut self, _update: &ProgressUpdate) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_update_line() {
        let update = ProgressUpdate {
            phase: Phase::Write,
            current: 1048576,
            total: 2097152,
        };
        assert_eq!(update.line(), "Writing sector 1048576 of 2097152");

        let update = ProgressUpdate {
            phase: Phase::Verify,
            current: 0,
            total: 2048,
        };
        assert_eq!(update.line(), "Verifying sector 0 of 2048");
    }
}
