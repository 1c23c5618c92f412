use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};
use tinyfs::{BLOCK_SIZE, Geometry, INODE_SIZE, Superblock};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow().bold(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("[{}] {}", tag, record.args());
    }

    fn flush(&self) {}
}

pub fn init_logger(level: LevelFilter) {
    // set_logger only fails when a logger is already installed
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

pub fn write_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "mkfs-tinyfs:".red().bold(), err);
}

pub fn write_summary(sb: &Superblock) {
    let g: Geometry = sb.geometry();
    println!(
        "{} (block size {} B)",
        "Superblock".green().bold(),
        BLOCK_SIZE
    );
    println!("\tmagic={:#x}", sb.magic);
    println!("\tnr_blocks={}", sb.nr_blocks);
    println!(
        "\tnr_inodes={} (istore={} blocks)",
        sb.nr_inodes, sb.nr_istore_blocks
    );
    println!("\tnr_ifree_blocks={}", sb.nr_ifree_blocks);
    println!("\tnr_bfree_blocks={}", sb.nr_bfree_blocks);
    println!("\tnr_free_inodes={}", sb.nr_free_inodes);
    println!("\tnr_free_blocks={}", sb.nr_free_blocks);
    println!(
        "{}: {} blocks from block {}, inode size = {} B",
        "Inode store".green().bold(),
        g.inode_table_blocks,
        g.inode_table_start(),
        INODE_SIZE
    );
    println!(
        "{}: {} blocks from block {}",
        "Ifree blocks".green().bold(),
        g.inode_bitmap_blocks,
        g.inode_bitmap_start()
    );
    println!(
        "{}: {} blocks from block {}",
        "Bfree blocks".green().bold(),
        g.block_bitmap_blocks,
        g.block_bitmap_start()
    );
    println!(
        "{}: {} blocks from block {} (root listing at {})",
        "Data blocks".green().bold(),
        g.data_blocks,
        g.data_start(),
        g.data_start()
    );
}
