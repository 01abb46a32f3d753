//! sqlplay - interactive front end

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

use sqlplay::classify::{classify, Input, SQL_TERMINATOR};
use sqlplay::logging;
use sqlplay::render::{render_outcome, RenderOptions};
use sqlplay::{Response, Session, SessionConfig};

const PROMPT: &str = "sqlplay> ";
const CONTINUATION: &str = "   ...> ";

/// sqlplay - mix table scripts and SQL over the same tables
#[derive(Parser, Debug)]
#[command(name = "sqlplay")]
#[command(version)]
#[command(about = "Interactive playground mixing table scripts and SQL", long_about = None)]
struct Cli {
    /// Directory holding saved tables
    #[arg(long = "work-dir")]
    work_dir: Option<PathBuf>,

    /// SQLite database file (default: in-memory)
    #[arg(long = "database")]
    database: Option<PathBuf>,

    /// History file (default: ~/.sqlplay_history)
    #[arg(long = "history", conflicts_with = "no_history")]
    history: Option<PathBuf>,

    /// Do not read or write a history file
    #[arg(long = "no-history")]
    no_history: bool,

    /// Default log filter, overridden by SQLPLAY_LOG
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,

    /// Run an input and exit (repeatable)
    #[arg(short = 'c', long = "command")]
    command: Vec<String>,
}

impl Cli {
    fn into_config(self) -> (SessionConfig, Vec<String>) {
        let mut config = SessionConfig::new().log_filter(self.log_level);
        if let Some(dir) = self.work_dir {
            config = config.work_dir(dir);
        }
        if let Some(db) = self.database {
            config = config.database(db);
        }
        if self.no_history {
            config = config.history_file(None);
        } else if let Some(history) = self.history {
            config = config.history_file(Some(history));
        }
        (config, self.command)
    }
}

/// Print one response; returns true if the session should end
fn report(response: Response, options: &RenderOptions) -> bool {
    for line in &response.output {
        println!("{}", line);
    }

    let exit = response.is_exit();
    match response.result {
        Ok(outcome) => {
            if let Some(text) = render_outcome(&outcome, options) {
                print!("{}", text);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }

    for e in &response.sync_errors {
        eprintln!("Sync error: {}", e);
    }
    exit
}

/// Check if the buffered lines form a complete input
fn is_complete(buffer: &str, line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return true;
    }
    if trimmed.ends_with(SQL_TERMINATOR) {
        return true;
    }
    matches!(classify(buffer), Input::Control(_))
}

fn run_commands(session: &mut Session, commands: &[String], options: &RenderOptions) {
    for input in commands {
        if report(session.execute(input), options) {
            break;
        }
    }
}

fn run_repl(session: &mut Session, config: &SessionConfig) -> anyhow::Result<()> {
    let options = RenderOptions::from_config(config);
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;

    if let Some(history) = &config.history_file {
        // missing on first run
        let _ = editor.load_history(history);
    }

    println!(
        "sqlplay {} - end SQL with ';', run scripts with an empty line",
        env!("CARGO_PKG_VERSION")
    );
    println!("Type /help for commands, /exit to save and quit.");

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { PROMPT } else { CONTINUATION };
        match editor.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() && line.trim().is_empty() {
                    continue;
                }
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if !is_complete(&buffer, &line) {
                    continue;
                }

                let input = std::mem::take(&mut buffer);
                let _ = editor.add_history_entry(input.trim_end());
                if report(session.execute(&input), &options) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                println!("Interrupted. Use /exit or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                report(session.execute("/exit"), &options);
                break;
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
    }

    if let Some(history) = &config.history_file {
        if let Err(e) = editor.save_history(history) {
            warn!(path = %history.display(), error = %e, "could not save history");
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let (config, commands) = Cli::parse().into_config();
    logging::init(&config.log_filter)?;

    let mut session = Session::open(&config).context("Failed to open session")?;

    if commands.is_empty() {
        run_repl(&mut session, &config)
    } else {
        run_commands(&mut session, &commands, &RenderOptions::from_config(&config));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_complete() {
        assert!(is_complete("/list", "/list"));
        assert!(is_complete("SELECT 1\nFROM t;", "FROM t;"));
        assert!(is_complete("x = 1\n", ""));
        assert!(!is_complete("x = 1", "x = 1"));
        assert!(!is_complete("SELECT *", "SELECT *"));
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "sqlplay",
            "--work-dir",
            "tables",
            "--no-history",
            "-c",
            "/list",
            "-c",
            "SELECT 1;",
        ]);
        let (config, commands) = cli.into_config();
        assert_eq!(config.work_dir, PathBuf::from("tables"));
        assert_eq!(config.history_file, None);
        assert_eq!(config.log_filter, "warn");
        assert_eq!(commands, vec!["/list", "SELECT 1;"]);
    }
}
