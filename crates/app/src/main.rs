use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use services::{AdminGate, AppServices, Clock, ProgressSynchronizer, WriteOutcome};
use status_core::model::{Backend, StatusSettings, StatusSettingsDraft};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use ui::{App, UiApp, build_app_context};

const APP_NAME: &str = "Project Status";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidPercent { raw: String },
    InvalidPollInterval { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPercent { raw } => write!(f, "invalid percentage: {raw}"),
            ArgsError::InvalidPollInterval { raw } => {
                write!(f, "invalid --poll-ms value: {raw}")
            }
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

struct DesktopApp {
    progress: ProgressSynchronizer,
    admin_gate: Arc<AdminGate>,
}

impl UiApp for DesktopApp {
    fn app_name(&self) -> String {
        APP_NAME.to_string()
    }

    fn progress(&self) -> ProgressSynchronizer {
        self.progress.clone()
    }

    fn admin_gate(&self) -> Arc<AdminGate> {
        Arc::clone(&self.admin_gate)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- ui   [--db <url>] [--row-id <uuid>] [--api-key <key>]");
    eprintln!("  cargo run -p app -- show [--db <url>] [--row-id <uuid>] [--api-key <key>]");
    eprintln!("  cargo run -p app -- set <percent> [--db <url>] [--row-id <uuid>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://status.sqlite3");
    eprintln!("  --row-id a45e94bf-2558-485f-91da-80376e4087f6");
    eprintln!("  --poll-ms 2000 (how often the row is re-read for outside changes)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STATUS_DB_URL, STATUS_ROW_ID, STATUS_API_KEY, STATUS_ADMIN_SECRET, STATUS_POLL_MS");
    eprintln!("  RUST_LOG (default: info)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Ui,
    Show,
    Set,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "ui" => Some(Self::Ui),
            "show" => Some(Self::Show),
            "set" => Some(Self::Set),
            _ => None,
        }
    }
}

struct Args {
    draft: StatusSettingsDraft,
    percent: Option<i64>,
}

impl Args {
    fn from_env() -> StatusSettingsDraft {
        let var = |name: &str| std::env::var(name).ok();
        StatusSettingsDraft {
            row_id: var("STATUS_ROW_ID"),
            store_url: var("STATUS_DB_URL").map(normalize_store_url),
            api_key: var("STATUS_API_KEY"),
            admin_secret: var("STATUS_ADMIN_SECRET"),
            poll_interval_ms: var("STATUS_POLL_MS").and_then(|raw| raw.trim().parse().ok()),
        }
    }

    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut draft = Self::from_env();
        let mut percent = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    draft.store_url = Some(normalize_store_url(value));
                }
                "--row-id" => draft.row_id = Some(require_value(args, "--row-id")?),
                "--api-key" => draft.api_key = Some(require_value(args, "--api-key")?),
                "--poll-ms" => {
                    let value = require_value(args, "--poll-ms")?;
                    let parsed = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidPollInterval { raw: value.clone() })?;
                    draft.poll_interval_ms = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                raw if cmd == Command::Set && percent.is_none() && !raw.starts_with("--") => {
                    let parsed = raw.trim().parse::<i64>().map_err(|_| ArgsError::InvalidPercent {
                        raw: raw.to_string(),
                    })?;
                    percent = Some(parsed);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if cmd == Command::Set && percent.is_none() {
            return Err(ArgsError::MissingValue { flag: "set" });
        }

        Ok(Self { draft, percent })
    }
}

/// Bare paths become absolute `sqlite://` URLs; anything with a scheme is
/// passed through.
fn normalize_store_url(raw: String) -> String {
    let trimmed = raw.trim().to_string();
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite://")
        || trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
    {
        return trimmed;
    }

    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand launches the UI.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Ui,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Ui,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let settings = parsed.draft.validate()?;
    prepare_store(&settings)?;
    tracing::info!(row_id = %settings.row_id(), backend = ?settings.backend(), "starting");

    let services = AppServices::from_settings(&settings, Clock::system()).await?;

    match cmd {
        Command::Ui => {
            let app = DesktopApp {
                progress: services.progress(),
                admin_gate: services.admin(),
            };
            let app: Arc<dyn UiApp> = Arc::new(app);
            let context = build_app_context(&app);

            // Some tao setups default to always-on-top; keep it a normal window.
            let desktop_cfg = DesktopConfig::new().with_window(
                WindowBuilder::new()
                    .with_title(APP_NAME)
                    .with_always_on_top(false),
            );

            LaunchBuilder::desktop()
                .with_cfg(desktop_cfg)
                .with_context(context)
                .launch(App);
        }
        Command::Show => {
            let progress = services.progress();
            let milestone = progress.current_milestone();
            println!("{} ({})", progress.current_value(), milestone.name());
        }
        Command::Set => {
            let requested = parsed.percent.unwrap_or_default();
            match services.progress().set_progress(requested).await {
                WriteOutcome::Persisted(value) => println!("Project progress set to {value}"),
                WriteOutcome::PersistFailed(value) => {
                    services.shutdown();
                    return Err(format!("failed to persist {value}").into());
                }
                WriteOutcome::Detached => {
                    return Err("progress synchronizer is shut down".into());
                }
            }
        }
    }

    services.shutdown();
    Ok(())
}

/// Make sure a file-backed `SQLite` URL points at an existing file so the
/// pool can open it.
fn prepare_store(settings: &StatusSettings) -> Result<(), Box<dyn std::error::Error>> {
    let Backend::Sqlite { url } = settings.backend() else {
        return Ok(());
    };
    if url == "sqlite::memory:" {
        return Ok(());
    }

    let path = url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl { raw: url.clone() })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: url.clone() }.into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        tracing::error!(error = %err, "exiting");
        eprintln!("{err}");
        std::process::exit(2);
    }
}
