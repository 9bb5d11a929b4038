//! Write and verify passes over a target.
//!
//! Both passes are single-threaded and blocking: each sector is a seek
//! followed by one full-sector transfer, finished before the next begins.
//! Any failure ends the pass immediately; nothing is retried.

use crate::buffer::SectorBuf;
use crate::config::RunParams;
use crate::device::DeviceDescriptor;
use crate::error::FdpatternError;
use crate::progress::PROGRESS_INTERVAL;
use crate::record::{
    check_sector, fill_sector, MismatchKind, RecordMismatch, SectorCheck, SectorRecord,
};
use crate::stats::ScanStats;
use crate::traits::{Phase, ProgressSink, ProgressUpdate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Order in which a write pass visits sectors.
///
/// Random selection draws each sector independently, so repeats and gaps
/// are expected.
pub enum SectorSelector {
    Sequential {
        next: u64,
        count: u64,
    },
    Random {
        rng: ChaCha8Rng,
        total: u64,
        remaining: u64,
    },
}

impl SectorSelector {
    /// Every sector once, ascending.
    pub fn sequential(total: u64) -> Self {
        Self::Sequential {
            next: 0,
            count: total,
        }
    }

    /// `percent` of `total` sectors drawn uniformly from a generator seeded
    /// with `seed`.
    pub fn random(total: u64, percent: u8, seed: u64) -> Self {
        let count = (u128::from(total) * u128::from(percent) / 100) as u64;
        Self::Random {
            rng: ChaCha8Rng::seed_from_u64(seed),
            total,
            remaining: if total == 0 { 0 } else { count },
        }
    }

    /// Selector for a write pass with `params` over `total` sectors.
    pub fn for_write(total: u64, params: &RunParams) -> Self {
        if params.random_coverage() {
            Self::random(total, params.percent, params.seed)
        } else {
            Self::sequential(total)
        }
    }

    /// Number of sectors still to be yielded.
    pub fn remaining(&self) -> u64 {
        match self {
            Self::Sequential { next, count } => count - next,
            Self::Random { remaining, .. } => *remaining,
        }
    }
}

impl Iterator for SectorSelector {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match self {
            Self::Sequential { next, count } => {
                if *next >= *count {
                    return None;
                }
                let sector = *next;
                *next += 1;
                Some(sector)
            }
            Self::Random {
                rng,
                total,
                remaining,
            } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                Some(rng.gen_range(0..*total))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}

/// Writes a record tagged with `params.iteration` into each selected sector.
///
/// The target is flushed at the end; syncing a file to stable storage is up
/// to the caller.
pub fn write_pattern<T: Write + Seek>(
    target: &mut T,
    descriptor: &DeviceDescriptor,
    params: &RunParams,
    progress: &mut dyn ProgressSink,
    should_stop: &AtomicBool,
) -> Result<ScanStats, FdpatternError> {
    let selector = SectorSelector::for_write(descriptor.total_sectors, params);
    let total = selector.remaining();
    let mut stats = ScanStats::new(Phase::Write);
    let mut buf = SectorBuf::new(descriptor.sector_len());
    let start = Instant::now();

    log::info!(
        "Writing {} of {} sectors ({}), iteration {}",
        total,
        descriptor.total_sectors,
        if params.random_coverage() {
            "random"
        } else {
            "sequential"
        },
        params.iteration
    );
    progress.begin(Phase::Write, total);

    for (step, sector) in (0u64..).zip(selector) {
        if should_stop.load(Ordering::Relaxed) {
            return Err(FdpatternError::Interrupted { completed: step });
        }
        if step % PROGRESS_INTERVAL == 0 {
            progress.checkpoint(&ProgressUpdate {
                phase: Phase::Write,
                current: step,
                total,
            });
        }

        fill_sector(
            buf.as_mut_slice(),
            SectorRecord::new(sector, params.iteration),
        );
        target
            .seek(SeekFrom::Start(descriptor.sector_offset(sector)))
            .map_err(|source| FdpatternError::Seek { sector, source })?;
        target
            .write_all(buf.as_slice())
            .map_err(|source| FdpatternError::ShortWrite { sector, source })?;

        stats.add_sector(descriptor.sector_size);
        progress.advance(1);
    }

    target.flush().map_err(FdpatternError::Sync)?;

    stats.elapsed = start.elapsed();
    progress.finish(&stats);
    Ok(stats)
}

/// Extra stdout line for a mismatch: the sector number actually found, for
/// index mismatches only.
fn mismatch_detail(mismatch: &RecordMismatch) -> Option<String> {
    match mismatch.kind {
        MismatchKind::SectorIndex => Some(format!("Val is {}", mismatch.found)),
        MismatchKind::Iteration => None,
    }
}

/// Reads every sector in ascending order and checks its records against
/// `params.iteration`.
pub fn verify_pattern<T: Read + Seek>(
    target: &mut T,
    descriptor: &DeviceDescriptor,
    params: &RunParams,
    progress: &mut dyn ProgressSink,
    should_stop: &AtomicBool,
) -> Result<ScanStats, FdpatternError> {
    let total = descriptor.total_sectors;
    let sparse = params.sparse();
    let mut stats = ScanStats::new(Phase::Verify);
    let mut buf = SectorBuf::new(descriptor.sector_len());
    let start = Instant::now();

    log::info!(
        "Verifying {} sectors against iteration {}{}",
        total,
        params.iteration,
        if sparse { ", skipping unwritten sectors" } else { "" }
    );
    progress.begin(Phase::Verify, total);

    for sector in 0..total {
        if should_stop.load(Ordering::Relaxed) {
            return Err(FdpatternError::Interrupted { completed: sector });
        }
        if sector % PROGRESS_INTERVAL == 0 {
            progress.checkpoint(&ProgressUpdate {
                phase: Phase::Verify,
                current: sector,
                total,
            });
        }

        target
            .seek(SeekFrom::Start(descriptor.sector_offset(sector)))
            .map_err(|source| FdpatternError::Seek { sector, source })?;
        target
            .read_exact(buf.as_mut_slice())
            .map_err(|source| FdpatternError::ShortRead { sector, source })?;
        stats.add_sector(descriptor.sector_size);

        match check_sector(buf.as_slice(), sector, params.iteration, sparse) {
            Ok(SectorCheck::Verified) => {}
            Ok(SectorCheck::SkippedSparse) => stats.add_skipped(),
            Err(mismatch) => {
                if let Some(detail) = mismatch_detail(&mismatch) {
                    println!("{}", detail);
                }
                return Err(FdpatternError::from_mismatch(sector, mismatch));
            }
        }
        progress.advance(1);
    }

    stats.elapsed = start.elapsed();
    progress.finish(&stats);
    Ok(stats)
}
