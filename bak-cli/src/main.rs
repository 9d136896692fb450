//! Backup CLI - Main entry point
//!
//! Archives a directory and journals the attempt.

use bak_cli::{config::Config, run_backup, utils, Archiver, BackupRequest, JournalRecorder, NamingScheme};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to archive
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Directory the archive is named after and saved next to (or into, with --naming source)
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Archive format: zip, tar, gztar, bztar, xztar [default: gztar]
    #[arg(short = 'a', long = "format", value_name = "FORMAT")]
    format: Option<String>,

    /// Journal file; .db, .sqlite and .sqlite3 use SQLite, anything else CSV
    #[arg(short, long, value_name = "FILE")]
    journal: Option<PathBuf>,

    /// How the archive file name is derived
    #[arg(long, value_enum)]
    naming: Option<NamingScheme>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for the rotated log files
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Command-line flags win over the file
    if let Some(format) = &args.format {
        config.archive.format = format.clone();
    }
    if let Some(naming) = args.naming {
        config.archive.naming = naming;
    }
    if let Some(journal) = &args.journal {
        config.journal.path = journal.clone();
    }
    if let Some(level) = &args.log_level {
        config.log.level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log.dir = dir.clone();
    }

    Ok(config)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: could not load configuration: {e}");
            return ExitCode::from(2);
        }
    };

    if utils::logger::init(&config.log).is_err() {
        eprintln!("Warning: log file unavailable, continuing without it.");
    }

    tracing::info!("Starting bak-cli v{}", env!("CARGO_PKG_VERSION"));

    let request = BackupRequest::new(args.directory, args.output, config.archive.format.clone());
    let archiver = Archiver::new()
        .naming(config.archive.naming)
        .exclude(config.archive.exclude.clone());
    let journal = JournalRecorder::new(&config.journal.path);

    let report = run_backup(&request, &archiver, &journal);

    if let Err(e) = report.print(&mut io::stdout().lock(), &mut io::stderr().lock()) {
        tracing::error!("Failed to print result: {}", e);
    }

    ExitCode::from(report.status().exit_code())
}
