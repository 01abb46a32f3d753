//! Input classification
//!
//! Decides from the raw text alone whether an input is a control command, a
//! SQL statement or script code.

/// Prefix that marks a control command
pub const CONTROL_SIGIL: char = '/';

/// Terminator that marks a SQL statement
pub const SQL_TERMINATOR: char = ';';

/// A classified input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Control command, trimmed, sigil included
    Control(String),
    /// SQL text, trimmed
    Sql(String),
    /// Script code, exactly as entered
    Script(String),
}

/// Classify raw input text. Pure function of the input.
///
/// 1. Blank input is an empty script.
/// 2. A single line starting with the sigil followed by a word character is a
///    control command.
/// 3. Text ending with `;` is SQL.
/// 4. Anything else is script code, untrimmed.
pub fn classify(text: &str) -> Input {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Input::Script(String::new());
    }

    if is_control(trimmed) {
        return Input::Control(trimmed.to_string());
    }

    if trimmed.ends_with(SQL_TERMINATOR) {
        return Input::Sql(trimmed.to_string());
    }

    Input::Script(text.to_string())
}

fn is_control(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    chars.next() == Some(CONTROL_SIGIL)
        && chars.next().is_some_and(|c| c.is_alphanumeric() || c == '_')
        && !trimmed.contains(['\n', '\r'])
}
