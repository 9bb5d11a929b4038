//! Run parameters.

use std::path::PathBuf;

/// Default share of sectors touched by a random-coverage write.
pub const DEFAULT_PERCENT: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    Write,
    Verify,
}

/// Parameters of one run, fixed once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub mode: Mode,
    pub target: PathBuf,
    /// Tag embedded on write and expected on verify.
    pub iteration: u64,
    /// Random coverage on write, sparse tolerance on verify.
    pub random: bool,
    /// Share of sectors drawn by a random write, 0..=100.
    pub percent: u8,
    pub seed: u64,
    /// Open the target with O_DIRECT.
    pub direct: bool,
}

impl RunParams {
    pub fn new(mode: Mode, target: impl Into<PathBuf>, iteration: u64) -> Self {
        Self {
            mode,
            target: target.into(),
            iteration,
            random: false,
            percent: DEFAULT_PERCENT,
            seed: 0,
            direct: false,
        }
    }

    /// True if verify should skip all-zero sectors.
    pub fn sparse(&self) -> bool {
        self.mode == Mode::Verify && self.random
    }

    /// True if write should draw random sectors.
    pub fn random_coverage(&self) -> bool {
        self.mode == Mode::Write && self.random
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_params_defaults() {
        let params = RunParams::new(Mode::Write, "/dev/xvdb", 7);
        assert_eq!(params.iteration, 7);
        assert!(!params.random);
        assert_eq!(params.percent, 10);
        assert_eq!(params.seed, 0);
        assert!(!params.direct);
    }

    #[test]
    fn test_random_flag_meaning_depends_on_mode() {
        let mut write = RunParams::new(Mode::Write, "t", 1);
        write.random = true;
        assert!(write.random_coverage());
        assert!(!write.sparse());

        let mut verify = RunParams::new(Mode::Verify, "t", 1);
        verify.random = true;
        assert!(verify.sparse());
        assert!(!verify.random_coverage());
    }
}
