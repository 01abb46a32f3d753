//! Interactive session
//!
//! A [`Session`] owns the table store and the script environment and routes
//! each input to SQL, script or control-command execution, running the sync
//! step each kind of input requires:
//!
//! - after SQL, every table is refreshed from the engine
//! - after script code, every table is pushed to the engine
//! - after anything, the environment's table bindings are rebuilt

use tracing::{debug, info, warn};

use crate::classify::{classify, Input};
use crate::command::{ControlCommand, Outcome};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::script::{Environment, Interpreter, Object, LAST_RESULT};
use crate::store::TableStore;
use crate::table::Table;

/// Leading keywords of SQL statements that return a result set
const QUERY_KEYWORDS: [&str; 4] = ["SELECT", "PRAGMA", "WITH", "EXPLAIN"];

/// Everything one input produced
#[derive(Debug)]
pub struct Response {
    /// The outcome, or the error that stopped the input
    pub result: Result<Outcome>,
    /// Lines printed by script code
    pub output: Vec<String>,
    /// Per-table failures of the sync step that followed
    pub sync_errors: Vec<Error>,
}

impl Response {
    fn new(result: Result<Outcome>) -> Self {
        Self {
            result,
            output: Vec::new(),
            sync_errors: Vec::new(),
        }
    }

    /// True if the input asked the session to end
    pub fn is_exit(&self) -> bool {
        matches!(self.result, Ok(Outcome::Exit(_)))
    }
}

/// Session context: engine, memory store, artifact location and script
/// namespace
pub struct Session {
    store: TableStore,
    env: Environment,
}

impl Session {
    /// Wrap an existing store
    pub fn new(store: TableStore) -> Self {
        let mut env = Environment::new();
        env.rebuild(store.names());
        Self { store, env }
    }

    /// Open a session as configured
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let store = TableStore::open(config)?;
        info!(
            work_dir = %config.work_dir.display(),
            database = ?config.database,
            "session started"
        );
        Ok(Self::new(store))
    }

    /// Open a session over a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(TableStore::in_memory()?))
    }

    /// Classify and run one input
    pub fn execute(&mut self, text: &str) -> Response {
        let input = classify(text);
        debug!(input = ?input, "classified input");

        let response = match input {
            Input::Control(raw) => self.run_control(&raw),
            Input::Sql(sql) => self.run_sql(&sql),
            Input::Script(code) => self.run_script(&code),
        };
        self.env.rebuild(self.store.names());
        response
    }

    fn run_control(&mut self, raw: &str) -> Response {
        Response::new(ControlCommand::parse(raw).and_then(|cmd| cmd.execute(&mut self.store)))
    }

    fn run_sql(&mut self, sql: &str) -> Response {
        let result = if is_query(sql) {
            self.store.engine().query(sql).map(|table| {
                if let Err(fault) = self
                    .env
                    .set_variable(LAST_RESULT, Object::Table(table.clone()))
                {
                    warn!(error = %fault.message, "could not bind last query result");
                }
                Outcome::Table(table)
            })
        } else {
            self.store
                .engine_mut()
                .execute_batch(sql)
                .map(|()| Outcome::Message("OK.".to_string()))
        };

        let mut response = Response::new(result);
        match self.store.refresh_all() {
            Ok(report) => response.sync_errors = report.failed,
            Err(e) => response.sync_errors.push(e),
        }
        response
    }

    fn run_script(&mut self, code: &str) -> Response {
        let mut interp = Interpreter::new(&mut self.store, &mut self.env);
        let result = interp.run(code).map(|value| match value {
            None => Outcome::None,
            Some(Object::Table(t)) => Outcome::Table(t),
            Some(Object::Column(c)) => {
                let mut t = Table::new();
                match t.set_column("value", c) {
                    Ok(()) => Outcome::Table(t),
                    Err(e) => Outcome::Message(e.to_string()),
                }
            }
            Some(other) => Outcome::Message(other.to_string()),
        });
        let output = interp.take_output();

        let mut response = Response::new(result);
        response.output = output;
        response.sync_errors = self.store.push_all().failed;
        response
    }

    /// The table store
    pub fn store(&self) -> &TableStore {
        &self.store
    }

    /// The table store, mutably. Call [`Session::sync_bindings`] after changing
    /// its table set.
    pub fn store_mut(&mut self) -> &mut TableStore {
        &mut self.store
    }

    /// Rebuild the environment's table bindings from the store
    pub fn sync_bindings(&mut self) {
        self.env.rebuild(self.store.names());
    }

    /// The script environment
    pub fn env(&self) -> &Environment {
        &self.env
    }
}

/// Check if SQL starts with a keyword that returns a result set
fn is_query(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    QUERY_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(&keyword))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Binding;
    use crate::table::Value;

    #[test]
    fn test_is_query() {
        assert!(is_query("SELECT 1;"));
        assert!(is_query("  with t as (select 1) select * from t;"));
        assert!(is_query("pragma table_info(x);"));
        assert!(is_query("EXPLAIN SELECT 1;"));
        assert!(!is_query("INSERT INTO t VALUES (1);"));
        assert!(!is_query("SELECTED;"));
    }

    #[test]
    fn test_query_sets_last_result() {
        let mut session = Session::in_memory().unwrap();
        let response = session.execute("SELECT 1 AS one;");
        assert!(matches!(response.result, Ok(Outcome::Table(_))));

        let response = session.execute("_.one[0] + 1");
        match response.result {
            Ok(Outcome::Message(text)) => assert_eq!(text, "2"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_engine_table_named_last_result_is_not_bound() {
        let mut session = Session::in_memory().unwrap();
        let response = session.execute("CREATE TABLE \"_\" (x INTEGER);");
        assert!(response.sync_errors.is_empty());
        assert!(!session.store().contains(LAST_RESULT));

        session.execute("SELECT 7 AS seven;").result.unwrap();
        match session.env().get(LAST_RESULT) {
            Some(Binding::Value(Object::Table(t))) => {
                assert_eq!(t.column("seven").unwrap().values(), &[Value::Integer(7)])
            }
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_failed_transaction_does_not_block_later_pushes() {
        let mut session = Session::in_memory().unwrap();
        session.execute("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);");

        let response = session.execute("BEGIN; INSERT INTO t VALUES (3); SELEC oops;");
        assert!(matches!(response.result, Err(Error::Engine(_))));

        let response = session.execute("t.y = t.x * 2");
        assert!(response.result.is_ok());
        assert!(response.sync_errors.is_empty());
        assert_eq!(session.store().get("t").unwrap().row_count(), 1);
    }

    #[test]
    fn test_deeply_nested_script_is_an_error() {
        let mut session = Session::in_memory().unwrap();
        session.execute("/create t").result.unwrap();
        session.execute("t.x = [1]").result.unwrap();

        let deep = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(
            session.execute(&deep).result,
            Err(Error::Script { .. })
        ));
        assert!(session.store().contains("t"));
    }

    #[test]
    fn test_sql_table_becomes_binding() {
        let mut session = Session::in_memory().unwrap();
        let response = session.execute("CREATE TABLE u (x INTEGER); INSERT INTO u VALUES (3);");
        assert!(matches!(response.result, Ok(Outcome::Message(ref m)) if m == "OK."));
        assert!(matches!(session.env().get("u"), Some(Binding::Table)));

        session.execute("u.y = u.x * 10");
        let response = session.execute("SELECT y FROM u;");
        match response.result {
            Ok(Outcome::Table(t)) => {
                assert_eq!(t.column("y").unwrap().values(), &[Value::Integer(30)])
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_failed_sql_still_refreshes() {
        let mut session = Session::in_memory().unwrap();
        session.execute("/create t");
        session.execute("t.x = [1, 2]");
        let response = session.execute("DROP TABLE t; SELEC oops;");
        assert!(matches!(response.result, Err(Error::Engine(_))));
        assert!(!session.store().contains("t"));
        assert!(session.env().get("t").is_none());
    }

    #[test]
    fn test_script_error_keeps_partial_mutation_and_pushes() {
        let mut session = Session::in_memory().unwrap();
        session.execute("/create t");
        let response = session.execute("t.x = [1, 2]\nt.y = t.nope");
        assert!(matches!(response.result, Err(Error::Script { .. })));
        assert!(session.store().engine().has_table("t").unwrap());
    }

    #[test]
    fn test_print_output_and_empty_script() {
        let mut session = Session::in_memory().unwrap();
        let response = session.execute("print('hi')");
        assert_eq!(response.output, vec!["hi".to_string()]);
        assert!(matches!(response.result, Ok(Outcome::None)));

        let response = session.execute("   ");
        assert!(matches!(response.result, Ok(Outcome::None)));
    }

    #[test]
    fn test_exit_response() {
        let mut session = Session::in_memory().unwrap();
        assert!(session.execute("/exit").is_exit());
        assert!(!session.execute("/list").is_exit());
    }
}
