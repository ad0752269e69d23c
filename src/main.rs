//! Purpose: `csvstore` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs one engine operation, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All store access goes through `api::Engine`.
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod info_json;

use csvstore::api::{DataSource, Engine, EngineOptions, Error, ErrorKind, to_exit_code};
use info_json::{cell_json, info_json, row_json};

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let color_mode = cli.color;
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "csvstore",
    version,
    about = "Random-access cell lookup over delimited text files",
    long_about = None,
    after_help = r#"EXAMPLES
  $ csvstore data.csv info
  $ csvstore data.csv get 10 2
  $ csvstore --delimiter ';' data.csv row 10
  $ csvstore --append data.csv append 'x,y,z'
  $ csvstore data.csv dump --limit 5

NOTES
  - Rows and columns are zero-based.
  - Only one line is held in memory; the file is indexed once at startup.
  - Set RUST_LOG=debug to see index and cache activity on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, default_value_t = ',', help = "Field delimiter (single ASCII character)")]
    delimiter: char,
    #[arg(long, help = "Open for appending; creates the file when missing")]
    append: bool,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(help = "Path to the delimited text file", value_hint = ValueHint::FilePath)]
    path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Show row/column counts and store metadata")]
    Info,
    #[command(about = "Print one cell as JSON (empty string when out of range)")]
    Get {
        #[arg(allow_negative_numbers = true)]
        row: i64,
        #[arg(allow_negative_numbers = true)]
        col: i64,
    },
    #[command(about = "Print the raw text of one line")]
    Line { line: usize },
    #[command(about = "Print the fields of one row as a JSON array")]
    Row { line: usize },
    #[command(about = "Print every row as JSON Lines")]
    Dump {
        #[arg(long, help = "Stop after this many rows")]
        limit: Option<usize>,
    },
    #[command(about = "Append one line to the end of the file (requires --append)")]
    Append { line: String },
    #[command(about = "Delete the file")]
    Delete,
}

fn run(cli: Cli) -> Result<(), Error> {
    let options = EngineOptions::new()
        .with_delimiter(cli.delimiter)
        .with_appendable(cli.append);
    let mut engine = Engine::try_open(&cli.path, options)?;

    match cli.command {
        Command::Info => emit_json(&info_json(&engine)),
        Command::Get { row, col } => {
            let value = engine.cell_value(row, col).to_string();
            emit_json(&cell_json(row, col, &value))
        }
        Command::Line { line } => {
            let text = engine.read_line(line)?;
            emit_text(&text)
        }
        Command::Row { line } => {
            let fields = engine.row(line)?;
            emit_json(&row_json(&fields))
        }
        Command::Dump { limit } => {
            let rows = limit.map_or(engine.row_count(), |limit| limit.min(engine.row_count()));
            for line in 0..rows {
                let fields = engine.row(line).unwrap_or_else(|err| {
                    tracing::warn!(line, error = %err, "row unreadable; emitting empty fields");
                    vec![String::new(); engine.column_count()]
                });
                emit_json(&row_json(&fields))?;
            }
            Ok(())
        }
        Command::Append { line } => {
            engine.append(&line)?;
            emit_json(&json!({ "rows": engine.row_count(), "columns": engine.column_count() }))
        }
        Command::Delete => {
            engine.delete()?;
            emit_json(&json!({ "deleted": cli.path.display().to_string() }))
        }
    }
}

fn emit_json(value: &Value) -> Result<(), Error> {
    let json = serde_json::to_string(value).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("json encode failed")
            .with_source(err)
    })?;
    emit_text(&json)
}

fn emit_text(text: &str) -> Result<(), Error> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{text}").map_err(|err| {
        Error::new(ErrorKind::WriteFailure)
            .with_message("failed to write output")
            .with_source(err)
    })
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Usage\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Usage => "usage error",
        ErrorKind::OpenFailure => "failed to open store",
        ErrorKind::IndexBuildFailure => "failed to index store",
        ErrorKind::OutOfRange => "out of range",
        ErrorKind::InvalidLength => "invalid line length",
        ErrorKind::SeekMismatch => "seek landed at the wrong offset",
        ErrorKind::ShortRead => "short read",
        ErrorKind::DecodeFailure => "failed to decode line",
        ErrorKind::NotOpen => "store is not open",
        ErrorKind::ReopenFailure => "failed to reopen store for update",
        ErrorKind::WriteFailure => "write failed",
        ErrorKind::Busy => "store is busy",
    }
    .to_string()
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(line) = err.line() {
        lines.push(format!(
            "{} {line}",
            colorize_label("line:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!(
            "{} {offset}",
            colorize_label("offset:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{error_json, error_text};
    use csvstore::api::{Error, ErrorKind};

    fn sample_error() -> Error {
        Error::new(ErrorKind::ShortRead)
            .with_path("data.csv")
            .with_line(4)
            .with_offset(120)
            .with_source(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream ended",
            ))
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = sample_error();
        let plain = error_text(&err, false);
        assert!(!plain.contains("\u{1b}["));
        assert!(plain.starts_with("error: short read"));
        assert!(plain.contains("path: data.csv"));
        assert!(plain.contains("line: 4"));
        assert!(plain.contains("offset: 120"));
        assert!(plain.contains("caused by: stream ended"));

        let colored = error_text(&err, true);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert!(colored.contains("\u{1b}[33mpath:\u{1b}[0m"));
    }

    #[test]
    fn error_json_carries_context_and_causes() {
        let value = error_json(&sample_error());
        let inner = &value["error"];
        assert_eq!(inner["kind"], "ShortRead");
        assert_eq!(inner["message"], "short read");
        assert_eq!(inner["path"], "data.csv");
        assert_eq!(inner["line"], 4);
        assert_eq!(inner["offset"], 120);
        assert_eq!(inner["causes"][0], "stream ended");
    }

    #[test]
    fn error_json_omits_absent_fields() {
        let err = Error::new(ErrorKind::Usage).with_message("line is empty");
        let value = error_json(&err);
        let inner = value["error"].as_object().expect("object");
        assert_eq!(inner["message"], "line is empty");
        for key in ["path", "line", "offset", "causes"] {
            assert!(!inner.contains_key(key), "unexpected {key}");
        }
    }
}
