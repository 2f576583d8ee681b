mod console;
mod deck_file;

use std::path::PathBuf;

use services::{
    Clock, ReviewLoopService, SessionError, SessionIntent, SessionSettings, SessionSnapshot,
};
use storage::repository::Storage;
use storage::sqlite::SqliteInitError;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use console::Command;
use deck_file::DeckFile;

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("{flag} requires a value")]
    MissingValue { flag: &'static str },
    #[error("unknown argument: {0}")]
    UnknownArg(String),
    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("no deck given: pass --deck <path.json> or set LINGO_DECK")]
    MissingDeck,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Args(#[from] ArgsError),
    #[error("could not read deck file {path}: {source}")]
    DeckRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid deck file: {0}")]
    DeckFormat(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] lingo_core::Error),
    #[error(transparent)]
    Storage(#[from] SqliteInitError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("could not encode snapshot: {0}")]
    Output(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct Args {
    db_url: String,
    deck_path: PathBuf,
    json: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- --deck <path.json> [--db <sqlite_url>] [--json]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://lingo.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LINGO_DB_URL, LINGO_DECK, LINGO_LOAD_POLICY (strict|degrade),");
    eprintln!("  LINGO_WRITE_TIMEOUT_MS, LINGO_WRITE_ATTEMPTS, LINGO_WRITE_BACKOFF_MS, RUST_LOG");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("LINGO_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://lingo.sqlite3".into(), normalize_sqlite_url);
        let mut deck_path = std::env::var("LINGO_DECK").ok().map(PathBuf::from);
        let mut json = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--deck" => {
                    deck_path = Some(PathBuf::from(require_value(args, "--deck")?));
                }
                "--json" => json = true,
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let deck_path = deck_path.ok_or(ArgsError::MissingDeck)?;
        Ok(Some(Self {
            db_url,
            deck_path,
            json,
        }))
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

fn prepare_sqlite_file(db_url: &str) -> Result<(), AppError> {
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

/// One JSON object per line with `--json`, the text view otherwise.
fn print_snapshot(snapshot: &SessionSnapshot, json: bool) -> Result<(), AppError> {
    if json {
        println!(
            "{}",
            serde_json::to_string(snapshot).map_err(AppError::Output)?
        );
    } else {
        println!("{}", console::render(snapshot));
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), AppError> {
    let mut argv = std::env::args().skip(1);
    let Some(parsed) = Args::parse(&mut argv).inspect_err(|e| {
        eprintln!("{e}");
        print_usage();
    })?
    else {
        print_usage();
        return Ok(());
    };

    let deck = DeckFile::read(&parsed.deck_path)?.into_deck()?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    info!(db = %parsed.db_url, deck = %parsed.deck_path.display(), "store opened");

    let loop_svc = ReviewLoopService::new(Clock::default_clock(), storage.progress)
        .with_settings(SessionSettings::from_env());
    let mut review = loop_svc.start_session(deck).await?;

    print_snapshot(&review.snapshot(), parsed.json)?;
    if !parsed.json {
        println!("(h for help)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut confirming_reset = false;
    while let Some(line) = lines.next_line().await? {
        if confirming_reset {
            confirming_reset = false;
            if line.trim().eq_ignore_ascii_case("yes") {
                print_snapshot(&review.dispatch(SessionIntent::ResetAll), parsed.json)?;
            } else {
                println!("reset cancelled");
            }
            continue;
        }

        match Command::parse(&line) {
            Some(Command::Intent(intent)) => {
                print_snapshot(&review.dispatch(intent), parsed.json)?;
            }
            Some(Command::ResetAll) => {
                confirming_reset = true;
                println!("Reset every card to unseen? Type yes to confirm.");
            }
            Some(Command::Quit) => break,
            None => println!("unknown command, h for help"),
        }
    }

    let snapshot = review.settle().await;
    if let Some(failure) = snapshot.last_error {
        eprintln!("last change was not saved: {}", failure.message);
    }
    Ok(())
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
