//! Table value module
//!
//! This module contains the in-memory table representation shared by the
//! script interpreter and the table store.

pub mod table;
pub mod types;
pub mod value;

pub use table::{Column, Table, TableBuilder};
pub use types::ScalarKind;
pub use value::Value;
