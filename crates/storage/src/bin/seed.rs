use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use quiz_core::model::{QuizId, RawRecord};
use serde_json::Value;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    quiz_id: QuizId,
    file: PathBuf,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingRequired { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingRequired { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
enum SeedFileError {
    NotAnArray,
    BadRecord { index: usize, reason: String },
}

impl fmt::Display for SeedFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedFileError::NotAnArray => write!(f, "seed file must contain a JSON array"),
            SeedFileError::BadRecord { index, reason } => {
                write!(f, "record #{index} is invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for SeedFileError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:quiz.sqlite3?mode=rwc".into());
        let mut quiz_id = std::env::var("QUIZ_ID")
            .ok()
            .and_then(|value| QuizId::new(value).ok());
        let mut file: Option<PathBuf> = None;
        let mut now: Option<DateTime<Utc>> = None;

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
                "--quiz-id" => {
                    let value = require_value(&mut args, "--quiz-id")?;
                    quiz_id = Some(
                        QuizId::new(value.clone())
                            .map_err(|_| ArgsError::InvalidQuizId { raw: value })?,
                    );
                }
                "--file" => {
                    file = Some(PathBuf::from(require_value(&mut args, "--file")?));
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
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
            quiz_id: quiz_id.ok_or(ArgsError::MissingRequired { flag: "--quiz-id" })?,
            file: file.ok_or(ArgsError::MissingRequired { flag: "--file" })?,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- --quiz-id <id> --file <path> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:quiz.sqlite3?mode=rwc)");
    eprintln!("  --quiz-id <id>            Quiz the records belong to");
    eprintln!("  --file <path>             JSON array of question documents, each with an id");
    eprintln!("  --now <rfc3339>           Fixed update time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_ID");
}

fn read_records(raw: &str) -> Result<Vec<RawRecord>, Box<dyn std::error::Error>> {
    let Value::Array(docs) = serde_json::from_str::<Value>(raw)? else {
        return Err(SeedFileError::NotAnArray.into());
    };
    let mut records = Vec::with_capacity(docs.len());
    for (index, doc) in docs.into_iter().enumerate() {
        let record = RawRecord::from_document(doc).map_err(|e| SeedFileError::BadRecord {
            index,
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let raw = std::fs::read_to_string(&args.file)?;
    let records = read_records(&raw)?;
    log::debug!("read {} records from {}", records.len(), args.file.display());

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for record in &records {
        storage
            .question_store
            .upsert_record(&args.quiz_id, record, now)
            .await?;
    }

    println!(
        "Seeded {} records into quiz {} at {}",
        records.len(),
        args.quiz_id,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
