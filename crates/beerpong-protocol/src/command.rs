use std::fmt;

use crate::matcher::is_command_expression;

/// A decoded `name(arg, ...);` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Text before the first `(`.
    pub name: String,
    /// Comma-separated argument tokens, trimmed of surrounding whitespace.
    pub args: Vec<String>,
}

impl Command {
    /// Create a command from parts.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Parse a complete command expression.
    ///
    /// Returns `None` unless `expr` is a complete expression. The argument
    /// list runs from the first `(` to the trailing `);`, so a stray `)` or
    /// `(` inside it stays part of an argument. A blank argument list is a
    /// single empty argument, never zero arguments. Invalid UTF-8 is
    /// replaced.
    pub fn parse(expr: &[u8]) -> Option<Self> {
        if !is_command_expression(expr) {
            return None;
        }

        let open = expr.iter().position(|b| *b == b'(')?;
        let name = String::from_utf8_lossy(&expr[..open]).into_owned();
        let arglist = String::from_utf8_lossy(&expr[open + 1..expr.len() - 2]);

        let args = arglist.split(',').map(|arg| arg.trim().to_string()).collect();

        Some(Self { name, args })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({});", self.name, self.args.join(","))
    }
}
