//! sqlplay - a playground that mixes table scripts and SQL
//!
//! This library provides the pieces of an interactive session:
//! - Input classification (control command, SQL, script)
//! - The table store, keeping in-memory tables and SQLite tables in sync
//! - A small column-oriented script language over those tables
//! - Control commands, rendering and session dispatch

pub mod classify;
pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod render;
pub mod script;
pub mod session;
pub mod store;
pub mod table;

pub use classify::{classify, Input};
pub use command::{ControlCommand, Outcome};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use session::{Response, Session};
pub use store::{SyncReport, TableStore};
