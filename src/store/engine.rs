//! Embedded relational engine handle
//!
//! Thin wrapper around a single SQLite connection. Everything the table store
//! needs from the engine goes through here: catalog enumeration, full table
//! reads and writes, schema introspection and opaque SQL execution.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::table::{ScalarKind, Table, Value};

/// One column of the engine's schema introspection, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// Column position (0-indexed)
    pub ordinal: i64,
    /// Column name
    pub name: String,
    /// Declared type, empty when the column was declared without one
    pub declared_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// Default value expression (as string)
    pub default: Option<String>,
    /// Is this part of the primary key?
    pub primary_key: bool,
}

/// Quote an identifier for inclusion in SQL text
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The relational engine owned by a session
pub struct Engine {
    conn: Connection,
}

impl Engine {
    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Names of all user tables in the catalog, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// Catalog spelling of the table `name` refers to. SQLite identifiers
    /// are case-insensitive, so `Orders` finds `orders`.
    pub fn find_table(&self, name: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        )?;
        let mut rows = stmt.query([name])?;
        let found = match rows.next()? {
            Some(row) => Some(row.get(0)?),
            None => None,
        };
        Ok(found)
    }

    /// Check if the catalog has a table of this name, ignoring case
    pub fn has_table(&self, name: &str) -> Result<bool> {
        Ok(self.find_table(name)?.is_some())
    }

    /// Read the full contents of a table
    pub fn read_table(&self, name: &str) -> Result<Table> {
        let declared: HashMap<String, Option<ScalarKind>> = self
            .table_info(name)?
            .into_iter()
            .map(|info| (info.name, ScalarKind::from_declared(&info.declared_type)))
            .collect();

        let sql = format!("SELECT * FROM {}", quote_ident(name));
        let (names, rows) = self.fetch(&sql)?;
        let hints = names
            .iter()
            .map(|n| declared.get(n).copied().flatten())
            .collect();
        Table::from_rows(names, hints, rows)
    }

    /// Replace the engine's copy of a table with `table`.
    ///
    /// Drop, create and insert happen in one transaction.
    pub fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        let quoted = quote_ident(name);
        let column_defs: Vec<String> = table
            .columns()
            .map(|(col, c)| match c.kind().declared_type() {
                Some(ty) => format!("{} {}", quote_ident(col), ty),
                None => quote_ident(col),
            })
            .collect();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {q}; CREATE TABLE {q} ({cols});",
            q = quoted,
            cols = column_defs.join(", ")
        ))?;
        {
            let placeholders = vec!["?"; table.column_count()].join(", ");
            let mut insert =
                tx.prepare(&format!("INSERT INTO {} VALUES ({})", quoted, placeholders))?;
            for row in table.rows() {
                insert.execute(params_from_iter(row.iter().map(SqlValue::from)))?;
            }
        }
        tx.commit()?;

        debug!(table = %name, rows = table.row_count(), "wrote table to engine");
        Ok(())
    }

    /// Drop a table if it exists
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))?;
        Ok(())
    }

    /// Column introspection for a table; empty if the table does not exist
    pub fn table_info(&self, name: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk \
             FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let infos = stmt
            .query_map([name], |row| {
                Ok(ColumnInfo {
                    ordinal: row.get(0)?,
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    default: row.get(4)?,
                    primary_key: row.get::<_, i64>(5)? > 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(infos)
    }

    /// Run a statement that returns a result set
    pub fn query(&self, sql: &str) -> Result<Table> {
        let (names, rows) = self.fetch(sql)?;
        Table::from_rows(disambiguate(names), Vec::new(), rows)
    }

    /// Run one or more statements without a result set, then commit.
    ///
    /// A transaction the batch left open is committed on success and rolled
    /// back on failure, so the connection is always back in autocommit mode.
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        let result = self.conn.execute_batch(sql);
        if self.conn.is_autocommit() {
            return Ok(result?);
        }
        match result {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "rollback after failed batch failed");
                }
                Err(e.into())
            }
        }
    }

    fn fetch(&self, sql: &str) -> rusqlite::Result<(Vec<String>, Vec<Vec<Value>>)> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = names.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(Value::from(row.get::<_, SqlValue>(i)?));
            }
            rows.push(values);
        }
        Ok((names, rows))
    }
}

/// Make result-set column names unique (`n`, `n_1`, `n_2`, ...)
fn disambiguate(names: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let mut candidate = name.clone();
        let mut n = 0;
        while used.contains(&candidate) {
            n += 1;
            candidate = format!("{}_{}", name, n);
        }
        used.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    fn orders() -> Table {
        TableBuilder::new()
            .column("id", vec![1i64, 2])
            .column("amount", vec![9.5, 3.0])
            .build()
            .unwrap()
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut engine = Engine::open_in_memory().unwrap();
        engine.write_table("orders", &orders()).unwrap();

        assert_eq!(engine.table_names().unwrap(), vec!["orders"]);
        assert_eq!(engine.read_table("orders").unwrap(), orders());
    }

    #[test]
    fn test_write_replaces_existing_table() {
        let mut engine = Engine::open_in_memory().unwrap();
        engine
            .execute_batch("CREATE TABLE orders (legacy TEXT); INSERT INTO orders VALUES ('x');")
            .unwrap();
        engine.write_table("orders", &orders()).unwrap();

        let info = engine.table_info("orders").unwrap();
        let names: Vec<&str> = info.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "amount"]);
    }

    #[test]
    fn test_table_info_record() {
        let mut engine = Engine::open_in_memory().unwrap();
        engine
            .execute_batch(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(100) NOT NULL DEFAULT 'anon', note)",
            )
            .unwrap();

        let info = engine.table_info("users").unwrap();
        assert_eq!(info.len(), 3);
        assert_eq!(info[0].ordinal, 0);
        assert!(info[0].primary_key);
        assert_eq!(info[1].declared_type, "VARCHAR(100)");
        assert!(info[1].not_null);
        assert_eq!(info[1].default.as_deref(), Some("'anon'"));
        assert_eq!(info[2].declared_type, "");
        assert!(engine.table_info("missing").unwrap().is_empty());
    }

    #[test]
    fn test_has_table_and_drop() {
        let mut engine = Engine::open_in_memory().unwrap();
        engine.write_table("orders", &orders()).unwrap();
        assert!(engine.has_table("orders").unwrap());

        engine.drop_table("orders").unwrap();
        assert!(!engine.has_table("orders").unwrap());
        assert!(engine.read_table("orders").is_err());
    }

    #[test]
    fn test_table_lookup_ignores_case() {
        let mut engine = Engine::open_in_memory().unwrap();
        engine.write_table("orders", &orders()).unwrap();

        assert!(engine.has_table("ORDERS").unwrap());
        assert_eq!(
            engine.find_table("Orders").unwrap().as_deref(),
            Some("orders")
        );
        assert_eq!(engine.find_table("missing").unwrap(), None);
    }

    #[test]
    fn test_query_disambiguates_columns() {
        let engine = Engine::open_in_memory().unwrap();
        let result = engine.query("SELECT 1 AS n, 2 AS n, 3 AS n").unwrap();
        assert_eq!(result.column_names(), vec!["n", "n_1", "n_2"]);
        assert_eq!(result.row_count(), 1);
    }

    #[test]
    fn test_failed_batch_rolls_back_open_transaction() {
        let mut engine = Engine::open_in_memory().unwrap();
        engine.write_table("orders", &orders()).unwrap();

        let err = engine
            .execute_batch("BEGIN; INSERT INTO orders VALUES (3, 1.0); SELEC oops;")
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Engine(_)));
        assert_eq!(engine.read_table("orders").unwrap().row_count(), 2);

        // the connection accepts a new transaction
        engine.write_table("orders", &orders()).unwrap();
        engine
            .execute_batch("BEGIN; INSERT INTO orders VALUES (3, 1.0);")
            .unwrap();
        assert_eq!(engine.read_table("orders").unwrap().row_count(), 3);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
