use std::fmt;

use status_core::Clock;
use status_core::model::{Progress, ProgressRowId};
use storage::ProgressRepository;
use storage::sqlite::SqliteRepository;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    row_id: ProgressRowId,
    progress: Option<Progress>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidRowId { raw: String },
    InvalidProgress { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidRowId { raw } => write!(f, "invalid --row-id value: {raw}"),
            ArgsError::InvalidProgress { raw } => write!(f, "invalid --progress value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("STATUS_DB_URL").unwrap_or_else(|_| "sqlite:status.sqlite3".into());
        let mut row_id = std::env::var("STATUS_ROW_ID")
            .ok()
            .and_then(|value| value.parse::<ProgressRowId>().ok())
            .unwrap_or_default();
        let mut progress = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--row-id" => {
                    let value = require_value(&mut args, "--row-id")?;
                    row_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidRowId { raw: value.clone() })?;
                }
                "--progress" => {
                    let value = require_value(&mut args, "--progress")?;
                    let parsed: i64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidProgress { raw: value.clone() })?;
                    progress = Some(Progress::clamped(parsed));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            row_id,
            progress,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     SQLite URL (default: sqlite:status.sqlite3)");
    eprintln!("  --row-id <uuid>       Progress row to provision (default: built-in row)");
    eprintln!("  --progress <percent>  Value to write after provisioning (clamped to 0..=100)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STATUS_DB_URL, STATUS_ROW_ID");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let repo = SqliteRepository::connect(&args.db_url, Clock::system()).await?;
    repo.migrate().await?;
    let created = repo.provision(args.row_id, Progress::ZERO).await?;
    if let Some(progress) = args.progress {
        repo.update_progress(args.row_id, progress).await?;
    }

    let record = repo
        .fetch_progress(args.row_id)
        .await?
        .ok_or("progress row missing after provisioning")?;
    println!(
        "{} row {} at {}",
        if created { "created" } else { "kept" },
        record.id,
        record.current_progress
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
