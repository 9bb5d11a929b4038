//! Console progress output.

use crate::stats::ScanStats;
use crate::traits::{Phase, ProgressSink, ProgressUpdate};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Steps between coarse checkpoint lines.
pub const PROGRESS_INTERVAL: u64 = 1 << 20;

/// Sectors between progress bar position updates.
const BAR_STRIDE: u64 = 4096;

/// Prints checkpoint lines to stdout and drives a progress bar on stderr.
///
/// indicatif hides the bar when stderr is not a terminal, so piped runs only
/// see the checkpoint lines.
pub struct ConsoleProgress {
    bar: ProgressBar,
    pending: u64,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr()),
            pending: 0,
        }
    }
}

impl ConsoleProgress {
    /// Moves the bar by any sectors not yet reported.
    fn flush_pending(&mut self) {
        self.bar.inc(self.pending);
        self.pending = 0;
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn begin(&mut self, phase: Phase, total: u64) {
        self.bar.set_length(total);
        self.bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} sectors ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.bar.set_message(phase.verb());
    }

    fn advance(&mut self, sectors: u64) {
        self.pending += sectors;
        if self.pending >= BAR_STRIDE {
            self.bar.inc(self.pending);
            self.pending = 0;
        }
    }

    fn checkpoint(&mut self, update: &ProgressUpdate) {
        self.bar.suspend(|| println!("{}", update.line()));
    }

    fn finish(&mut self, stats: &ScanStats) {
        self.flush_pending();
        self.bar.finish_and_clear();
        println!("{}", stats);
    }
}
