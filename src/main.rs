mod buffer;
mod config;
mod device;
mod error;
mod progress;
mod record;
mod scan;
mod stats;
mod traits;

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytesize::ByteSize;
use clap::error::ErrorKind;
use clap::Parser;
use config::{Mode, RunParams, DEFAULT_PERCENT};
use error::{FdpatternError, EXIT_OK};
use progress::ConsoleProgress;
use stats::ScanStats;
use traits::{ProgressSink, SilentProgress};

#[derive(Parser, Debug)]
#[command(
    name = "fdpattern",
    author,
    version,
    about = "Writes per-sector index/iteration records to a disk or file and verifies them",
    long_about = None
)]
struct Args {
    /// Write the pattern, or verify a previously written one
    #[arg(value_enum)]
    mode: Mode,

    /// Block device or regular file to test
    target: PathBuf,

    /// Iteration tag written into every record, and expected on verify
    iteration: u64,

    /// Write: touch random sectors. Verify: skip sectors that were never written
    #[arg(short, long, default_value_t = false)]
    random: bool,

    /// Percentage of sectors touched by a random write
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_PERCENT,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    percent: u8,

    /// Seed for random sector selection
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Open the target with O_DIRECT, bypassing the page cache
    #[arg(long, default_value_t = false)]
    direct: bool,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Suppress progress output
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
}

impl Args {
    fn params(&self) -> RunParams {
        RunParams {
            random: self.random,
            percent: self.percent,
            seed: self.seed,
            direct: self.direct,
            ..RunParams::new(self.mode, self.target.clone(), self.iteration)
        }
    }
}

/// Parses the command line. Help and version requests exit here with status
/// 0; anything else clap rejects becomes a usage error.
fn parse_args<I, T>(argv: I) -> Result<Args, FdpatternError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(argv).map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        _ => FdpatternError::Usage(e.render().to_string()),
    })
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn main() {
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => {
            eprint!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    init_logging(args.verbose);

    let should_stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&should_stop);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        log::warn!("Unable to install interrupt handler: {}", e);
    }

    let params = args.params();
    let mut console = ConsoleProgress::new();
    let mut silent = SilentProgress;
    let progress: &mut dyn ProgressSink = if args.quiet {
        &mut silent
    } else {
        &mut console
    };

    match run(&params, progress, &should_stop) {
        Ok(_) => std::process::exit(EXIT_OK),
        Err(e) => {
            if e.is_mismatch() {
                println!("{}", e);
            } else {
                eprintln!("Error: {}", e);
            }
            std::process::exit(e.exit_code());
        }
    }
}

/// Opens the target in the access mode `params` needs. Write mode never
/// creates or truncates.
fn open_target(params: &RunParams) -> Result<File, FdpatternError> {
    let mut options = OpenOptions::new();
    options.read(true).write(params.mode == Mode::Write);

    if params.direct {
        #[cfg(target_os = "linux")]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_DIRECT);
        }
        #[cfg(not(target_os = "linux"))]
        {
            log::warn!("--direct is only supported on Linux, ignoring");
        }
    }

    options.open(&params.target).map_err(|source| FdpatternError::Open {
        path: params.target.clone(),
        source,
    })
}

/// Probes the target and performs the requested pass.
fn run(
    params: &RunParams,
    progress: &mut dyn ProgressSink,
    should_stop: &AtomicBool,
) -> Result<ScanStats, FdpatternError> {
    let mut file = open_target(params)?;
    let descriptor = device::probe(&file)?;

    log::info!(
        "{}: {} ({} sectors of {} bytes, {})",
        params.target.display(),
        descriptor.kind.name(),
        descriptor.total_sectors,
        descriptor.sector_size,
        ByteSize(descriptor.byte_len)
    );

    match params.mode {
        Mode::Write => {
            let stats =
                scan::write_pattern(&mut file, &descriptor, params, progress, should_stop)?;
            file.sync_all().map_err(FdpatternError::Sync)?;
            Ok(stats)
        }
        Mode::Verify => {
            scan::verify_pattern(&mut file, &descriptor, params, progress, should_stop)
        }
    }
}
