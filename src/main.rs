mod utils;

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::process::ExitCode;
use tinyfs::{BlockDevice, FileDevice};
use utils::arg_man::{self, Args};
use utils::tui;

fn run(args: &Args) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&args.disk)
        .with_context(|| format!("cannot open {}", args.disk.display()))?;

    let device = FileDevice::from_file(file)
        .with_context(|| format!("cannot query size of {}", args.disk.display()))?;
    log::info!(
        "{}: {} bytes, {} blocks",
        args.disk.display(),
        device.size_bytes(),
        device.num_blocks()
    );

    let sb = tinyfs::format(&device)
        .with_context(|| format!("cannot format {}", args.disk.display()))?;

    if !args.quiet {
        tui::write_summary(&sb);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = arg_man::handle_prog_args();
    tui::init_logger(args.log_level());

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tui::write_error(&e);
            ExitCode::FAILURE
        }
    }
}
