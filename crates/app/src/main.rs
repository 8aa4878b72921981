mod play;

use std::fmt;
use std::path::PathBuf;

use drive_core::model::{CategoryId, PhaseId};
use services::{AppConfig, AppServices, BackendConfig, Clock};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    MissingToken,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingToken => write!(f, "login requires --token <token>"),
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

fn require_number(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<u32, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  drive play    [--category <id>] [--phase <id>] [common flags]");
    eprintln!("  drive login   --token <token> [common flags]");
    eprintln!("  drive logout  [common flags]");
    eprintln!("  drive history [--category <id>] [--limit <n>] [common flags]");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>  --api <base_url>  --content <path>  --curriculum <path>");
    eprintln!();
    eprintln!("Defaults for play:");
    eprintln!("  --category 1 --phase 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DRIVE_DB_URL, DRIVE_API_BASE_URL, DRIVE_HTTP_TIMEOUT_SECS,");
    eprintln!("  DRIVE_CONTENT, DRIVE_CURRICULUM, DRIVE_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Login,
    Logout,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

struct Args {
    config: AppConfig,
    category: CategoryId,
    phase: PhaseId,
    token: Option<String>,
    limit: u32,
}

impl Args {
    fn parse(
        command: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::from_env()?;
        config.db_url = normalize_sqlite_url(config.db_url);
        let mut parsed = Self {
            config,
            category: CategoryId::new(1),
            phase: PhaseId::new(1),
            token: None,
            limit: 20,
        };
        let mut category_set = false;

        while let Some(arg) = args.next() {
            match (command, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value }.into());
                    }
                    parsed.config.db_url = normalize_sqlite_url(value);
                }
                (_, "--api") => {
                    let value = require_value(args, "--api")?;
                    let timeout = parsed.config.backend.timeout();
                    parsed.config.backend = BackendConfig::new(&value)?.with_timeout(timeout);
                }
                (_, "--content") => {
                    parsed.config.content_path =
                        Some(PathBuf::from(require_value(args, "--content")?));
                }
                (_, "--curriculum") => {
                    parsed.config.curriculum_path =
                        Some(PathBuf::from(require_value(args, "--curriculum")?));
                }
                (Command::Play | Command::History, "--category") => {
                    parsed.category = CategoryId::new(require_number(args, "--category")?);
                    category_set = true;
                }
                (Command::Play, "--phase") => {
                    parsed.phase = PhaseId::new(require_number(args, "--phase")?);
                }
                (Command::Login, "--token") => {
                    parsed.token = Some(require_value(args, "--token")?);
                }
                (Command::History, "--limit") => {
                    parsed.limit = require_number(args, "--limit")?;
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg).into()),
            }
        }

        if command == Command::Login && parsed.token.is_none() {
            return Err(ArgsError::MissingToken.into());
        }
        if command == Command::History && !category_set {
            parsed.category = CategoryId::new(0);
        }
        Ok(parsed)
    }

    /// Category filter for `history`; id 0 means every category.
    fn history_filter(&self) -> Option<CategoryId> {
        (self.category.value() != 0).then_some(self.category)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
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

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DRIVE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means play.
    let (cmd, rest) = match argv.first().map(String::as_str) {
        None => (Command::Play, &argv[..]),
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => (Command::Play, &argv[..]),
        Some(first) => {
            let cmd = Command::from_arg(first).ok_or_else(|| {
                eprintln!("unknown subcommand: {first}");
                print_usage();
                ArgsError::UnknownArg(first.to_owned())
            })?;
            (cmd, &argv[1..])
        }
    };

    let mut iter = rest.iter().cloned();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.config.db_url)?;
    let services = AppServices::new_sqlite(&parsed.config, Clock::system()).await?;

    match cmd {
        Command::Play => play::run(&services, parsed.category, parsed.phase).await,
        Command::Login => {
            let token = parsed.token.unwrap_or_default();
            services.auth().store_token(&token).await?;
            println!("Logged in.");
            Ok(())
        }
        Command::Logout => {
            services.auth().clear_token().await?;
            println!("Logged out.");
            Ok(())
        }
        Command::History => {
            let items = services
                .results()
                .list_recent(parsed.history_filter(), parsed.limit)
                .await?;
            if items.is_empty() {
                println!("No completed sessions yet.");
            }
            for item in items {
                let unsynced = if item.unsynced > 0 {
                    format!("  ({} not synced)", item.unsynced)
                } else {
                    String::new()
                };
                println!(
                    "#{:<4} {}  {} phase {}  {}/{}{}",
                    item.id,
                    item.completed_at.format("%Y-%m-%d %H:%M"),
                    item.category_name,
                    item.phase_id,
                    item.score,
                    item.total,
                    unsynced
                );
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
