/// Message used when no grammar alternative has anything more specific to say.
pub const GENERIC_MESSAGE: &str = "Invalid command";

/// Lines of context shown above and including the failing line.
const CONTEXT_LINES: usize = 6;

/// What kind of failure a [`ParseError`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input does not match the grammar.
    Syntax,
    /// A `pid` target whose id is not a process ID.
    InvalidPid,
    /// An option that the operation does not accept (`via` on addresses).
    UnsupportedCombination,
}

/// A command that failed to parse, with enough context to point at the spot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    kind: ParseErrorKind,
    offset: usize,
    line: usize,
    column: usize,
    message: String,
    context: String,
}

impl ParseError {
    pub(crate) fn new(
        input: &str,
        offset: usize,
        kind: ParseErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let mut offset = offset.min(input.len());
        while !input.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &input[..offset];
        let row = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count();

        let lines: Vec<&str> = input.split('\n').collect();
        let first = (row + 1).saturating_sub(CONTEXT_LINES);
        let mut context = String::new();
        for line in &lines[first..=row] {
            context.push_str(line.trim_end_matches('\r'));
            context.push('\n');
        }
        let width = lines[row].trim_end().chars().count();
        context.push_str(&" ".repeat(column));
        context.push_str(&"~".repeat(width.saturating_sub(column).max(1)));

        Self {
            kind,
            offset,
            line: row + 1,
            column: column + 1,
            message: message.into(),
            context,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// Byte offset of the anchor in the input.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 1-based line of the anchor.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column (in characters) of the anchor.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Short label such as "Invalid network".
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The source lines leading up to the anchor, underlined with `~`.
    pub fn render(&self) -> &str {
        &self.context
    }
}
