//! Control commands
//!
//! The closed set of `/`-prefixed commands. Each one is a row in
//! [`COMMANDS`]: name, arity, usage and the handler it dispatches to.

use std::path::Path;

use tracing::debug;

use crate::classify::CONTROL_SIGIL;
use crate::error::{Error, Result};
use crate::store::persist::with_extension;
use crate::store::{ColumnInfo, SyncReport, TableStore, ARTIFACT_EXT, EXPORT_EXT};
use crate::table::Table;

/// Result of a successfully executed input
#[derive(Debug)]
pub enum Outcome {
    /// Nothing to show
    None,
    /// A one-line message
    Message(String),
    /// A list of table names
    Names(Vec<String>),
    /// A table (query result or script value)
    Table(Table),
    /// Column introspection for one table
    Schema {
        table: String,
        columns: Vec<ColumnInfo>,
    },
    /// Free-form lines (help text)
    Lines(Vec<String>),
    /// The session should end; carries the exit flush report
    Exit(SyncReport),
}

/// Control command name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Create,
    Load,
    Clear,
    Save,
    Export,
    Schema,
    List,
    Help,
    Exit,
}

type Handler = fn(&mut TableStore, &[String]) -> Result<Outcome>;

/// One row of the dispatch table
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    pub min_args: usize,
    /// `None` means any number of arguments
    pub max_args: Option<usize>,
    pub usage: &'static str,
    pub summary: &'static str,
    handler: Handler,
}

/// Every control command
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::Create,
        name: "create",
        min_args: 1,
        max_args: Some(1),
        usage: "/create <name>",
        summary: "Create an empty table",
        handler: create,
    },
    CommandSpec {
        kind: CommandKind::Load,
        name: "load",
        min_args: 1,
        max_args: None,
        usage: "/load <name>...",
        summary: "Load saved tables from the working directory",
        handler: load,
    },
    CommandSpec {
        kind: CommandKind::Clear,
        name: "clear",
        min_args: 1,
        max_args: None,
        usage: "/clear <name>...",
        summary: "Remove tables from memory and the database",
        handler: clear,
    },
    CommandSpec {
        kind: CommandKind::Save,
        name: "save",
        min_args: 1,
        max_args: Some(2),
        usage: "/save <name> [path]",
        summary: "Save a table as a .json artifact",
        handler: save,
    },
    CommandSpec {
        kind: CommandKind::Export,
        name: "export",
        min_args: 1,
        max_args: Some(2),
        usage: "/export <name> [path]",
        summary: "Export a table as .csv",
        handler: export,
    },
    CommandSpec {
        kind: CommandKind::Schema,
        name: "schema",
        min_args: 1,
        max_args: Some(1),
        usage: "/schema <name>",
        summary: "Show the columns of a table",
        handler: schema,
    },
    CommandSpec {
        kind: CommandKind::List,
        name: "list",
        min_args: 0,
        max_args: Some(0),
        usage: "/list",
        summary: "List tables",
        handler: list,
    },
    CommandSpec {
        kind: CommandKind::Help,
        name: "help",
        min_args: 0,
        max_args: None,
        usage: "/help",
        summary: "Show this help",
        handler: help,
    },
    CommandSpec {
        kind: CommandKind::Exit,
        name: "exit",
        min_args: 0,
        max_args: Some(0),
        usage: "/exit",
        summary: "Save every table to the working directory and quit",
        handler: exit,
    },
];

/// A parsed control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    kind: CommandKind,
    args: Vec<String>,
}

impl ControlCommand {
    /// Parse a control line such as `/save orders out.json`.
    ///
    /// Checks the name and the argument count.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split_whitespace();
        let head = parts.next().unwrap_or("");
        let name = head.strip_prefix(CONTROL_SIGIL).unwrap_or(head);
        let args: Vec<String> = parts.map(str::to_string).collect();

        let spec = lookup(name).ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
        if args.len() < spec.min_args || spec.max_args.is_some_and(|max| args.len() > max) {
            return Err(Error::Usage(spec.usage));
        }

        Ok(Self {
            kind: spec.kind,
            args,
        })
    }

    /// Which command this is
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Arguments, already checked against the command's arity
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the command against the store
    pub fn execute(&self, store: &mut TableStore) -> Result<Outcome> {
        let spec = COMMANDS
            .iter()
            .find(|s| s.kind == self.kind)
            .ok_or_else(|| Error::Internal(format!("no handler for {:?}", self.kind)))?;
        debug!(command = spec.name, args = ?self.args, "running control command");
        (spec.handler)(store, &self.args)
    }
}

fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|s| s.name == name)
}

/// Help text, one line per command
pub fn help_lines() -> Vec<String> {
    let mut lines = vec!["Commands:".to_string()];
    for spec in COMMANDS {
        lines.push(format!("  {:<24} {}", spec.usage, spec.summary));
    }
    lines.push(String::new());
    lines.push("Input ending with ';' runs as SQL; anything else runs as table script.".to_string());
    lines.push("Tables are script variables: orders.total = orders.amount * 2".to_string());
    lines
}

// ========== Handlers ==========

fn create(store: &mut TableStore, args: &[String]) -> Result<Outcome> {
    store.create(&args[0], None)?;
    Ok(Outcome::Message(format!("Created table '{}'.", args[0])))
}

fn load(store: &mut TableStore, args: &[String]) -> Result<Outcome> {
    for name in args {
        store.load(name)?;
    }
    Ok(Outcome::Message(format!("Loaded {}.", args.join(", "))))
}

fn clear(store: &mut TableStore, args: &[String]) -> Result<Outcome> {
    for name in args {
        store.clear(name)?;
    }
    Ok(Outcome::Message(format!("Cleared {}.", args.join(", "))))
}

fn save(store: &mut TableStore, args: &[String]) -> Result<Outcome> {
    let dest = args.get(1).map(|p| with_extension(p, ARTIFACT_EXT));
    let path = store.save(&args[0], dest.as_deref().map(Path::new))?;
    Ok(Outcome::Message(format!(
        "Saved '{}' to {}.",
        args[0],
        path.display()
    )))
}

fn export(store: &mut TableStore, args: &[String]) -> Result<Outcome> {
    let dest = args.get(1).map(|p| with_extension(p, EXPORT_EXT));
    let path = store.export(&args[0], dest.as_deref().map(Path::new))?;
    Ok(Outcome::Message(format!(
        "Exported '{}' to {}.",
        args[0],
        path.display()
    )))
}

fn schema(store: &mut TableStore, args: &[String]) -> Result<Outcome> {
    let columns = store.schema(&args[0])?;
    Ok(Outcome::Schema {
        table: args[0].clone(),
        columns,
    })
}

fn list(store: &mut TableStore, _args: &[String]) -> Result<Outcome> {
    Ok(Outcome::Names(store.list()))
}

fn help(_store: &mut TableStore, _args: &[String]) -> Result<Outcome> {
    Ok(Outcome::Lines(help_lines()))
}

fn exit(store: &mut TableStore, _args: &[String]) -> Result<Outcome> {
    Ok(Outcome::Exit(store.flush_all()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Engine;
    use tempfile::TempDir;

    fn run(store: &mut TableStore, raw: &str) -> Result<Outcome> {
        ControlCommand::parse(raw)?.execute(store)
    }

    #[test]
    fn test_parse() {
        let cmd = ControlCommand::parse("/load a b").unwrap();
        assert_eq!(cmd.kind(), CommandKind::Load);
        assert_eq!(cmd.args(), ["a", "b"]);

        assert!(matches!(
            ControlCommand::parse("/frobnicate"),
            Err(Error::UnknownCommand(name)) if name == "frobnicate"
        ));
        assert!(matches!(
            ControlCommand::parse("/create"),
            Err(Error::Usage("/create <name>"))
        ));
        assert!(matches!(
            ControlCommand::parse("/list extra"),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_parsed_commands_carry_required_args() {
        for spec in COMMANDS {
            let short = format!("/{}", spec.name);
            match ControlCommand::parse(&short) {
                Ok(cmd) => assert!(cmd.args().len() >= spec.min_args),
                Err(Error::Usage(usage)) => {
                    assert!(spec.min_args > 0);
                    assert_eq!(usage, spec.usage);
                }
                Err(e) => panic!("unexpected error {}", e),
            }
        }
    }

    #[test]
    fn test_every_kind_has_one_spec() {
        for spec in COMMANDS {
            assert_eq!(COMMANDS.iter().filter(|s| s.kind == spec.kind).count(), 1);
            assert!(spec.usage.starts_with(&format!("/{}", spec.name)));
        }
    }

    #[test]
    fn test_create_list_clear() {
        let mut store = TableStore::in_memory().unwrap();
        run(&mut store, "/create a").unwrap();
        run(&mut store, "/create b").unwrap();
        match run(&mut store, "/list").unwrap() {
            Outcome::Names(names) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("unexpected outcome {:?}", other),
        }

        run(&mut store, "/clear a b").unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_multi_name_stops_at_first_failure() {
        let mut store = TableStore::in_memory().unwrap();
        run(&mut store, "/create a").unwrap();
        run(&mut store, "/create c").unwrap();

        let err = run(&mut store, "/clear a missing c").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.list(), vec!["c"]);
    }

    #[test]
    fn test_save_rewrites_extension() {
        let dir = TempDir::new().unwrap();
        let mut store = TableStore::new(Engine::open_in_memory().unwrap(), dir.path());
        store
            .create(
                "t",
                Some(
                    crate::table::TableBuilder::new()
                        .column("x", vec![1i64])
                        .build()
                        .unwrap(),
                ),
            )
            .unwrap();

        let dest = dir.path().join("snapshot.txt");
        run(&mut store, &format!("/save t {}", dest.display())).unwrap();
        assert!(dir.path().join("snapshot.json").is_file());

        let dest = dir.path().join("t.out");
        run(&mut store, &format!("/export t {}", dest.display())).unwrap();
        assert!(dir.path().join("t.csv").is_file());
    }

    #[test]
    fn test_help_lists_every_command() {
        match run(&mut TableStore::in_memory().unwrap(), "/help").unwrap() {
            Outcome::Lines(lines) => {
                for spec in COMMANDS {
                    assert!(lines.iter().any(|l| l.contains(spec.usage)));
                }
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_exit_flushes() {
        let dir = TempDir::new().unwrap();
        let mut store = TableStore::new(Engine::open_in_memory().unwrap(), dir.path());
        store
            .create(
                "kept",
                Some(
                    crate::table::TableBuilder::new()
                        .column("x", vec![1i64])
                        .build()
                        .unwrap(),
                ),
            )
            .unwrap();
        store.create("empty", None).unwrap();

        match run(&mut store, "/exit").unwrap() {
            Outcome::Exit(report) => {
                assert_eq!(report.synced, vec!["kept"]);
                assert_eq!(report.skipped, vec!["empty"]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(dir.path().join("kept.json").is_file());
    }
}
