//! Table store
//!
//! The memory store (table name to in-memory [`Table`]) together with the
//! relational engine holding a copy of each table, and the operations that
//! keep the two in step:
//!
//! - **push**: memory to engine, full replace; skipped for zero-column tables
//! - **pull**: engine to memory, full overwrite; a table the engine no longer
//!   has is removed from memory
//! - **refresh**: make the memory store's key set and contents match the
//!   engine catalog exactly

pub mod engine;
pub mod persist;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::script::is_valid_table_name;
use crate::table::Table;

pub use engine::{ColumnInfo, Engine};
pub use persist::{ARTIFACT_EXT, EXPORT_EXT};

/// Per-table outcome of a bulk sync or flush
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Tables written or read successfully
    pub synced: Vec<String>,
    /// Tables left alone (zero columns, or not bindable)
    pub skipped: Vec<String>,
    /// Tables removed from the memory store
    pub removed: Vec<String>,
    /// One error per table that failed
    pub failed: Vec<Error>,
}

impl SyncReport {
    /// True if no table failed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The session's tables, in memory and in the engine
pub struct TableStore {
    engine: Engine,
    tables: BTreeMap<String, Table>,
    work_dir: PathBuf,
}

impl TableStore {
    /// Create a store over an open engine. `work_dir` holds table artifacts.
    pub fn new(engine: Engine, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            tables: BTreeMap::new(),
            work_dir: work_dir.into(),
        }
    }

    /// Create a store over a private in-memory engine with the default
    /// working directory
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(
            Engine::open_in_memory()?,
            SessionConfig::default().work_dir,
        ))
    }

    /// Open the engine the configuration names and wrap it in a store.
    ///
    /// Tables already present in a database file are pulled in.
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let engine = match &config.database {
            Some(path) => Engine::open(path)?,
            None => Engine::open_in_memory()?,
        };
        let mut store = Self::new(engine, config.work_dir.clone());
        if config.database.is_some() {
            let report = store.refresh_all()?;
            info!(tables = report.synced.len(), "attached database");
        }
        Ok(store)
    }

    // ========== CRUD ==========

    /// Create a table, empty unless `initial` is given, and push it
    pub fn create(&mut self, name: &str, initial: Option<Table>) -> Result<()> {
        if !is_valid_table_name(name) {
            return Err(Error::InvalidName(name.to_string()));
        }
        if let Some(existing) = self.existing_name(name)? {
            return Err(Error::AlreadyExists(existing));
        }

        self.tables
            .insert(name.to_string(), initial.unwrap_or_default());
        self.push(name)?;
        Ok(())
    }

    /// Load a table from its artifact in the working directory, replacing any
    /// in-memory table of the same name, and push it
    pub fn load(&mut self, name: &str) -> Result<()> {
        if !is_valid_table_name(name) {
            return Err(Error::InvalidName(name.to_string()));
        }
        let path = persist::artifact_path(&self.work_dir, name);
        if !path.is_file() {
            return Err(Error::NotFound(format!(
                "no saved table '{}' ({})",
                name,
                path.display()
            )));
        }

        if let Some(existing) = self.existing_name(name)? {
            if existing != name {
                return Err(Error::AlreadyExists(existing));
            }
        }

        let table = persist::read_artifact(&path)?;
        info!(table = %name, rows = table.row_count(), path = %path.display(), "loaded table");
        self.tables.insert(name.to_string(), table);
        self.push(name)?;
        Ok(())
    }

    /// Remove a table from memory and drop it from the engine
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let in_engine = self.engine.has_table(name)?;
        if !in_engine && !self.tables.contains_key(name) {
            return Err(Error::NotFound(format!("table '{}'", name)));
        }
        if in_engine {
            self.engine
                .drop_table(name)
                .map_err(|e| Error::sync(name, e))?;
        }
        self.tables.remove(name);
        debug!(table = %name, "cleared table");
        Ok(())
    }

    /// Names in the memory store, sorted
    pub fn list(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// The engine's column introspection for a table
    pub fn schema(&self, name: &str) -> Result<Vec<ColumnInfo>> {
        if !self.tables.contains_key(name) && !self.engine.has_table(name)? {
            return Err(Error::NotFound(format!("table '{}'", name)));
        }
        self.engine.table_info(name)
    }

    /// Serialize a table to `path`, or to its artifact in the working
    /// directory. Returns the path written.
    pub fn save(&self, name: &str, path: Option<&Path>) -> Result<PathBuf> {
        let table = self.require(name)?;
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| persist::artifact_path(&self.work_dir, name));
        persist::require_extension(&path, ARTIFACT_EXT)?;
        persist::write_artifact(table, &path)?;
        debug!(table = %name, path = %path.display(), "saved table");
        Ok(path)
    }

    /// Export a table as CSV to `path`, or to `<name>.csv` in the current
    /// directory. Returns the path written.
    pub fn export(&self, name: &str, path: Option<&Path>) -> Result<PathBuf> {
        let table = self.require(name)?;
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(format!("{}.{}", name, EXPORT_EXT)));
        persist::require_extension(&path, EXPORT_EXT)?;
        persist::write_csv(table, &path)?;
        debug!(table = %name, path = %path.display(), "exported table");
        Ok(path)
    }

    // ========== Sync ==========

    /// Write the in-memory value of `name` into the engine, replacing the
    /// engine's table. Returns false when skipped for having no columns.
    pub fn push(&mut self, name: &str) -> Result<bool> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("table '{}'", name)))?;
        if table.has_no_columns() {
            debug!(table = %name, "push skipped: table has no columns");
            return Ok(false);
        }
        self.engine
            .write_table(name, table)
            .map_err(|e| Error::sync(name, e))?;
        debug!(table = %name, "pushed table");
        Ok(true)
    }

    /// Push every table; a failure does not stop the others
    pub fn push_all(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        for name in self.list() {
            match self.push(&name) {
                Ok(true) => report.synced.push(name),
                Ok(false) => report.skipped.push(name),
                Err(e) => {
                    warn!(table = %name, error = %e, "push failed");
                    report.failed.push(e);
                }
            }
        }
        report
    }

    /// Overwrite the in-memory value of `name` with the engine's contents.
    ///
    /// Returns false if the engine has no such table, in which case the name
    /// is removed from memory. Any other failure leaves memory untouched.
    pub fn pull(&mut self, name: &str) -> Result<bool> {
        if !self
            .engine
            .has_table(name)
            .map_err(|e| Error::sync(name, e))?
        {
            self.tables.remove(name);
            debug!(table = %name, "pull: engine has no such table, removed");
            return Ok(false);
        }

        let table = self
            .engine
            .read_table(name)
            .map_err(|e| Error::sync(name, e))?;
        debug!(table = %name, rows = table.row_count(), "pulled table");
        self.tables.insert(name.to_string(), table);
        Ok(true)
    }

    /// Reconcile the memory store with the engine catalog.
    ///
    /// Fails only when the catalog itself cannot be read; per-table pull
    /// failures are collected in the report.
    pub fn refresh_all(&mut self) -> Result<SyncReport> {
        let catalog = self.engine.table_names().map_err(Error::catalog)?;
        let mut report = SyncReport::default();

        let stale: Vec<String> = self
            .tables
            .keys()
            .filter(|name| !catalog.contains(name))
            .cloned()
            .collect();
        for name in stale {
            self.tables.remove(&name);
            debug!(table = %name, "refresh: table gone from engine");
            report.removed.push(name);
        }

        for name in catalog {
            if !is_valid_table_name(&name) {
                warn!(table = %name, "refresh: engine table name is not a valid binding, skipped");
                report.skipped.push(name);
                continue;
            }
            match self.pull(&name) {
                Ok(true) => report.synced.push(name),
                Ok(false) => report.removed.push(name),
                Err(e) => {
                    warn!(table = %name, error = %e, "pull failed");
                    report.failed.push(e);
                }
            }
        }

        debug!(
            synced = report.synced.len(),
            removed = report.removed.len(),
            "refreshed tables"
        );
        Ok(report)
    }

    /// Write every table with at least one column to its artifact in the
    /// working directory; a failure does not stop the others
    pub fn flush_all(&self) -> SyncReport {
        let mut report = SyncReport::default();
        for (name, table) in &self.tables {
            if table.has_no_columns() {
                report.skipped.push(name.clone());
                continue;
            }
            let path = persist::artifact_path(&self.work_dir, name);
            match persist::write_artifact(table, &path) {
                Ok(()) => report.synced.push(name.clone()),
                Err(e) => {
                    warn!(table = %name, error = %e, "flush failed");
                    report.failed.push(Error::sync(name, e));
                }
            }
        }
        info!(
            written = report.synced.len(),
            failed = report.failed.len(),
            dir = %self.work_dir.display(),
            "flushed tables"
        );
        report
    }

    // ========== Accessors ==========

    /// In-memory value of a table
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Mutable in-memory value of a table; the engine copy is not touched
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Replace the in-memory value of an existing table
    pub fn replace(&mut self, name: &str, table: Table) -> Result<()> {
        match self.tables.get_mut(name) {
            Some(slot) => {
                *slot = table;
                Ok(())
            }
            None => Err(Error::NotFound(format!("table '{}'", name))),
        }
    }

    /// Check if the memory store has a table
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Names in the memory store, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    /// Directory holding table artifacts
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The relational engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The relational engine, for statements that may change its tables
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Spelling of an existing table that `name` would collide with. SQLite
    /// compares identifiers case-insensitively, and so does this.
    fn existing_name(&self, name: &str) -> Result<Option<String>> {
        if self.tables.contains_key(name) {
            return Ok(Some(name.to_string()));
        }
        if let Some(key) = self
            .tables
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
        {
            return Ok(Some(key.clone()));
        }
        self.engine.find_table(name)
    }

    fn require(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("table '{}'", name)))
    }
}
