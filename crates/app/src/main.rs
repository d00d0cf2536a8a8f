use std::fmt;

use quiz_core::model::{QuizId, QuizSettings, Role, ViewerContext};
use quiz_core::session::{QuizSession, SessionError};
use services::{AppServices, Clock, HttpGraderConfig, QuizFlowError, QuizLoopService, QuizStep};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingRequired { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidRole { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingRequired { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid quiz id: {raw:?}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidRole { raw } => {
                write!(f, "invalid --role value (expected student or teacher): {raw}")
            }
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

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn parse_quiz_id(raw: String) -> Result<QuizId, ArgsError> {
    QuizId::new(raw.clone()).map_err(|_| ArgsError::InvalidQuizId { raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run  --quiz-id <id> [options]");
    eprintln!("  cargo run -p app -- list [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Options for run:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3)");
    eprintln!("  --quiz-id <id>            Quiz to take");
    eprintln!("  --sample-size <n>         Questions per attempt (default: 15)");
    eprintln!("  --pass-percent <p>        Pass threshold 0-100 (default: 60)");
    eprintln!("  --grader-url <url>        Remote answer-check endpoint (default: in-process)");
    eprintln!("  --user <id>               User id (default: local)");
    eprintln!("  --role <student|teacher>  Viewer role (default: student)");
    eprintln!("  --enroll <id>             Quiz the student is enrolled in (repeatable;");
    eprintln!("                            defaults to the quiz being taken)");
    eprintln!();
    eprintln!("While answering: <n> selects option n, enter confirms, c clears the");
    eprintln!("selection, b goes back, q quits.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_SAMPLE_SIZE, QUIZ_PASS_PERCENT, QUIZ_GRADER_URL,");
    eprintln!("  QUIZ_GRADER_TOKEN, QUIZ_USER, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    List,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

struct RunArgs {
    db_url: String,
    quiz_id: QuizId,
    settings: QuizSettings,
    grader: Option<HttpGraderConfig>,
    viewer: ViewerContext,
}

fn default_db_url() -> String {
    std::env::var("QUIZ_DB_URL")
        .ok()
        .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url)
}

fn env_number(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_db(args: &mut impl Iterator<Item = String>) -> Result<String, ArgsError> {
    let value = require_value(args, "--db")?;
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: value });
    }
    Ok(normalize_sqlite_url(value))
}

impl RunArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut db_url = default_db_url();
        let mut quiz_id: Option<QuizId> = None;
        let mut sample_size =
            env_number("QUIZ_SAMPLE_SIZE").unwrap_or(QuizSettings::DEFAULT_SAMPLE_SIZE);
        let mut pass_percent =
            env_number("QUIZ_PASS_PERCENT").unwrap_or(QuizSettings::DEFAULT_PASS_THRESHOLD);
        let mut grader_url: Option<String> = None;
        let mut user = std::env::var("QUIZ_USER").unwrap_or_else(|_| "local".into());
        let mut role = Role::Student;
        let mut enrollments: Vec<QuizId> = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db_url = parse_db(args)?,
                "--quiz-id" => quiz_id = Some(parse_quiz_id(require_value(args, "--quiz-id")?)?),
                "--sample-size" => {
                    sample_size =
                        parse_number("--sample-size", require_value(args, "--sample-size")?)?;
                }
                "--pass-percent" => {
                    pass_percent =
                        parse_number("--pass-percent", require_value(args, "--pass-percent")?)?;
                }
                "--grader-url" => grader_url = Some(require_value(args, "--grader-url")?),
                "--user" => user = require_value(args, "--user")?,
                "--role" => {
                    let value = require_value(args, "--role")?;
                    role = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidRole { raw: value.clone() })?;
                }
                "--enroll" => enrollments.push(parse_quiz_id(require_value(args, "--enroll")?)?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg).into()),
            }
        }

        let quiz_id = quiz_id.ok_or(ArgsError::MissingRequired { flag: "--quiz-id" })?;
        let settings = QuizSettings::new(sample_size, pass_percent)?;
        let grader = match grader_url {
            Some(url) => {
                let config = HttpGraderConfig::new(&url)?;
                Some(match std::env::var("QUIZ_GRADER_TOKEN") {
                    Ok(token) => config.with_token(token),
                    Err(_) => config,
                })
            }
            None => HttpGraderConfig::from_env(),
        };
        if enrollments.is_empty() {
            enrollments.push(quiz_id.clone());
        }
        let viewer = ViewerContext::new(user, role).with_enrollments(enrollments);

        Ok(Self {
            db_url,
            quiz_id,
            settings,
            grader,
            viewer,
        })
    }
}

fn parse_list(args: &mut impl Iterator<Item = String>) -> Result<String, ArgsError> {
    let mut db_url = default_db_url();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db_url = parse_db(args)?,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(db_url)
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
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

//
// ─── TERMINAL LOOP ─────────────────────────────────────────────────────────────
//

fn render(session: &QuizSession) {
    let progress = session.progress();
    let (Some(index), Some(question)) = (progress.current, session.current_question()) else {
        return;
    };
    println!();
    println!(
        "Question {} of {} ({} answered)",
        index + 1,
        progress.total,
        progress.answered
    );
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        let marker = if session.selection() == Some(option.as_str()) {
            '*'
        } else {
            ' '
        };
        println!(" {marker} {}) {option}", i + 1);
    }
    println!("{}", confirm_hint(session));
}

fn confirm_hint(session: &QuizSession) -> &'static str {
    if session.is_last_question() {
        "[enter] submit answers"
    } else {
        "[enter] next question"
    }
}

enum Input {
    Select(usize),
    Confirm,
    Clear,
    Back,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "" | "n" => Input::Confirm,
        "c" => Input::Clear,
        "b" => Input::Back,
        "q" => Input::Quit,
        other => other
            .parse::<usize>()
            .map_or_else(|_| Input::Unknown(other.to_string()), Input::Select),
    }
}

async fn take_quiz(
    quiz_loop: &QuizLoopService,
    session: &mut QuizSession,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    render(session);

    while let Some(line) = lines.next_line().await? {
        let result = match parse_input(&line) {
            Input::Select(position) => quiz_loop.select_position(session, position).map(|_| ()),
            Input::Confirm => match quiz_loop.advance(session).await {
                Ok(QuizStep::Moved { .. }) => Ok(()),
                Ok(QuizStep::Finished(report)) => {
                    println!();
                    println!(
                        "Score: {}/{} ({}%) - {}",
                        report.score,
                        report.total,
                        report.percentage,
                        if report.passed { "passed" } else { "not passed" }
                    );
                    return Ok(true);
                }
                Err(err) => Err(err),
            },
            Input::Clear => session.clear_selection().map_err(QuizFlowError::from),
            Input::Back => quiz_loop.retreat(session).map(|_| ()),
            Input::Quit => break,
            Input::Unknown(raw) => {
                println!("unknown command: {raw}");
                continue;
            }
        };

        match result {
            Ok(()) => {}
            Err(QuizFlowError::Session(SessionError::AtFirstQuestion)) => {
                println!("already at the first question");
            }
            Err(err @ QuizFlowError::Grading(_)) => {
                println!("{err}; press enter to try again");
            }
            Err(QuizFlowError::Session(err)) => println!("{err}"),
            Err(err) => return Err(err.into()),
        }
        render(session);
    }

    quiz_loop.abandon(session);
    println!("quiz abandoned");
    Ok(false)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
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

    match cmd {
        Command::Run => {
            let args = RunArgs::parse(&mut iter).map_err(|e| {
                eprintln!("{e}");
                print_usage();
                e
            })?;

            prepare_sqlite_file(&args.db_url)?;
            let app = AppServices::new_sqlite(
                &args.db_url,
                Clock::default(),
                args.settings,
                args.grader,
            )
            .await?;
            log::debug!(
                "grading {}",
                if app.remote_grading() { "remotely" } else { "in-process" }
            );

            let auth = app.auth();
            auth.sign_in(args.viewer);
            let viewer = auth.current()?;

            let quiz_loop = app.quiz_loop();
            let mut session = quiz_loop.start(&viewer, args.quiz_id).await?;
            if let Some(err) = session.unavailable() {
                return Err(err.clone().into());
            }
            take_quiz(&quiz_loop, &mut session).await?;
            auth.sign_out();
            Ok(())
        }
        Command::List => {
            let db_url = parse_list(&mut iter).map_err(|e| {
                eprintln!("{e}");
                print_usage();
                e
            })?;
            prepare_sqlite_file(&db_url)?;
            let app = AppServices::new_sqlite(
                &db_url,
                Clock::default(),
                QuizSettings::default(),
                None,
            )
            .await?;
            let summaries = app.quiz_summaries().await?;
            if summaries.is_empty() {
                println!("no quizzes stored in {db_url}");
            }
            for summary in summaries {
                println!("{}\t{} questions", summary.quiz_id, summary.question_count);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_commands() {
        assert!(matches!(parse_input("2"), Input::Select(2)));
        assert!(matches!(parse_input(""), Input::Confirm));
        assert!(matches!(parse_input(" b "), Input::Back));
        assert!(matches!(parse_input("c"), Input::Clear));
        assert!(matches!(parse_input("q"), Input::Quit));
        assert!(matches!(parse_input("x"), Input::Unknown(_)));
    }

    #[test]
    fn confirm_hint_switches_to_submit_on_last_question() {
        use quiz_core::model::{Question, QuestionId};

        let questions: Vec<_> = (1..=2)
            .map(|n| {
                Question::new(
                    QuestionId::new(format!("q{n}")).unwrap(),
                    "Pick",
                    vec!["x".into(), "y".into()],
                    "x",
                )
                .unwrap()
                .present()
            })
            .collect();
        let mut session =
            QuizSession::new(QuizId::new("geo").unwrap(), quiz_core::time::fixed_now());
        session.apply_load(Ok(questions)).unwrap();

        assert_eq!(confirm_hint(&session), "[enter] next question");
        session.select_position(1).unwrap();
        session.advance().unwrap();
        assert_eq!(confirm_hint(&session), "[enter] submit answers");
    }

    #[test]
    fn run_args_require_quiz_id() {
        let mut args = Vec::<String>::new().into_iter();
        assert!(RunArgs::parse(&mut args).is_err());
    }

    #[test]
    fn run_args_parse_flags() {
        let mut args = [
            "--quiz-id",
            "lesson-1",
            "--sample-size",
            "5",
            "--pass-percent",
            "80",
            "--role",
            "teacher",
            "--user",
            "t-9",
        ]
        .map(String::from)
        .into_iter();
        let parsed = RunArgs::parse(&mut args).unwrap();
        assert_eq!(parsed.quiz_id.as_str(), "lesson-1");
        assert_eq!(parsed.settings.sample_size(), 5);
        assert_eq!(parsed.settings.pass_threshold_percent(), 80);
        assert_eq!(parsed.viewer.role(), Role::Teacher);
        assert_eq!(parsed.viewer.user_id(), "t-9");
    }

    #[test]
    fn student_defaults_to_enrolled_in_requested_quiz() {
        let mut args = ["--quiz-id", "lesson-1"].map(String::from).into_iter();
        let parsed = RunArgs::parse(&mut args).unwrap();
        assert!(parsed.viewer.can_take(&parsed.quiz_id));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut args = ["--quiz-id", "q", "--sample-size", "zero"]
            .map(String::from)
            .into_iter();
        assert!(RunArgs::parse(&mut args).is_err());

        let mut args = ["--quiz-id", "q", "--pass-percent", "101"]
            .map(String::from)
            .into_iter();
        assert!(RunArgs::parse(&mut args).is_err());
    }

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
        assert!(normalize_sqlite_url("sqlite:quiz.sqlite3".into()).starts_with("sqlite:///"));
    }
}
