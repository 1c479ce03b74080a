use bytes::{Bytes, BytesMut};

const OPEN: u8 = b'(';
const TERMINATOR: &[u8] = b");";

/// Returns true if `expr` is a complete command expression.
///
/// A complete expression has an opening parenthesis somewhere before a
/// trailing `);`, anchored at both ends: `name(args);`. The name and the
/// argument list may be empty. This is the whole-string form of
/// [`ExpressionMatcher`], which reaches the same verdict incrementally.
pub fn is_command_expression(expr: &[u8]) -> bool {
    match expr.len().checked_sub(TERMINATOR.len()) {
        Some(close) => expr.ends_with(TERMINATOR) && expr[..close].contains(&OPEN),
        None => false,
    }
}

/// Incrementally builds a command expression from fragments.
///
/// Fragments are appended verbatim (the CR separating them is already
/// gone). The position of the first `(` is tracked as bytes arrive, so
/// testing for completeness after each fragment costs O(1) instead of a
/// rescan of the whole expression.
#[derive(Debug, Default)]
pub struct ExpressionMatcher {
    expr: BytesMut,
    open_at: Option<usize>,
}

impl ExpressionMatcher {
    /// Create an empty matcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `fragment` and report whether the expression is now complete.
    pub fn push(&mut self, fragment: &[u8]) -> bool {
        if self.open_at.is_none() {
            if let Some(pos) = fragment.iter().position(|b| *b == OPEN) {
                self.open_at = Some(self.expr.len() + pos);
            }
        }
        self.expr.extend_from_slice(fragment);
        self.is_complete()
    }

    /// Whether the expression built so far is a complete command.
    pub fn is_complete(&self) -> bool {
        let Some(close) = self.expr.len().checked_sub(TERMINATOR.len()) else {
            return false;
        };
        matches!(self.open_at, Some(open) if open < close) && self.expr.ends_with(TERMINATOR)
    }

    /// Take the expression built so far and reset to empty.
    pub fn take(&mut self) -> Bytes {
        self.open_at = None;
        self.expr.split().freeze()
    }

    /// Discard the expression built so far.
    pub fn clear(&mut self) {
        self.open_at = None;
        self.expr.clear();
    }

    /// The expression built so far.
    pub fn expression(&self) -> &[u8] {
        &self.expr
    }

    /// Length of the expression built so far, in bytes.
    pub fn len(&self) -> usize {
        self.expr.len()
    }

    /// Whether nothing has been pushed since the last reset.
    pub fn is_empty(&self) -> bool {
        self.expr.is_empty()
    }
}
