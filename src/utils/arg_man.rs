use clap::Parser;
use std::path::PathBuf;

/// Formats a disk image or block device with an empty tinyfs filesystem.
#[derive(Debug, Parser)]
#[command(name = "mkfs-tinyfs", version, about)]
pub struct Args {
    /// Image file or block device to format
    pub disk: PathBuf,

    /// Show more detail (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

pub fn handle_prog_args() -> Args {
    Args::parse()
}
