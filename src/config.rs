//! Session configuration

use std::path::PathBuf;

/// Default directory for table artifacts
pub const DEFAULT_WORK_DIR: &str = "sqlplay_tables";

/// Default history file name, inside the home directory
pub const HISTORY_FILE_NAME: &str = ".sqlplay_history";

/// Configuration for one interactive session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Directory holding `<table>.json` artifacts (load, default save, exit flush)
    pub work_dir: PathBuf,
    /// SQLite database file; `None` means a private in-memory database
    pub database: Option<PathBuf>,
    /// REPL history file; `None` disables history
    pub history_file: Option<PathBuf>,
    /// Maximum rows rendered per table
    pub preview_rows: usize,
    /// Maximum characters rendered per cell
    pub cell_width: usize,
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            database: None,
            history_file: std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(HISTORY_FILE_NAME)),
            preview_rows: 50,
            cell_width: 40,
            log_filter: "warn".to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a new session config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the artifact directory
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Use a database file instead of an in-memory database
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(path.into());
        self
    }

    /// Set or disable the history file
    pub fn history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    /// Set the rendered row cap
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Set the rendered cell width cap
    pub fn cell_width(mut self, width: usize) -> Self {
        self.cell_width = width;
        self
    }

    /// Set the default log filter
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}
