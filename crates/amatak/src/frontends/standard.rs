//! Standard frontend
//!
//! Parses a statement list in Rust-flavoured syntax using `syn`, the form
//! the executor in [`crate::eval`] walks.

use std::iter::Peekable;
use std::str::Chars;

use syn::parse::Parser;

use crate::frontend::{
    release_spans_if_idle, CompiledUnit, Frontend, ParseError, SourceLocation,
};

/// Default limit on bracket and prefix-operator nesting.
pub const DEFAULT_MAX_NESTING: usize = 64;

/// The frontend installed in a new interpreter.
///
/// # Example
///
/// ```
/// use amatak::frontends::StandardFrontend;
/// use amatak::Frontend;
///
/// let frontend = StandardFrontend::new();
/// let unit = frontend.compile("let x = 1; x + 2", "main").unwrap();
/// assert_eq!(unit.stmts.len(), 2);
/// assert_eq!(frontend.file_extension(), "amatak");
/// ```
#[derive(Debug, Clone)]
pub struct StandardFrontend {
    max_nesting: usize,
}

impl StandardFrontend {
    /// Create a new standard frontend.
    pub fn new() -> Self {
        Self {
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    /// Reject source nested deeper than `depth` (builder pattern).
    pub fn with_max_nesting(mut self, depth: usize) -> Self {
        self.max_nesting = depth;
        self
    }

    /// The nesting limit.
    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }
}

impl Default for StandardFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for StandardFrontend {
    fn compile(&self, source: &str, filename: &str) -> Result<CompiledUnit, ParseError> {
        check_nesting(source, filename, self.max_nesting)?;
        match syn::Block::parse_within.parse_str(source) {
            Ok(stmts) => Ok(CompiledUnit::new(filename, stmts)),
            Err(err) => {
                let parse_error = syntax_error(&err, source, filename);
                drop(err);
                release_spans_if_idle();
                Err(parse_error)
            }
        }
    }

    fn name(&self) -> &str {
        "Amatak"
    }

    fn file_extension(&self) -> &str {
        "amatak"
    }
}

fn syntax_error(err: &syn::Error, source: &str, filename: &str) -> ParseError {
    let start = err.span().start();
    // Spans without a position (end of input) report line 0
    let line = start.line.max(1);
    let column = start.column + 1;
    let mut parse_error = ParseError::new(err.to_string())
        .with_location(SourceLocation::new(filename, line, column));
    if let Some(text) = source.lines().nth(line - 1) {
        parse_error = parse_error.with_snippet(format!(
            "{}\n{}^",
            text,
            " ".repeat(start.column)
        ));
    }
    parse_error
}

// ═══════════════════════════════════════════════════════════════════════
// Nesting check
// ═══════════════════════════════════════════════════════════════════════

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 0,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_is(&mut self, expected: char) -> bool {
        self.chars.peek() == Some(&expected)
    }

    fn skip_quoted(&mut self, quote: char) {
        while let Some(c) = self.bump() {
            if c == '\\' {
                self.bump();
            } else if c == quote {
                return;
            }
        }
    }

    fn skip_char_literal(&mut self) {
        if self.peek_is('\\') {
            self.skip_quoted('\'');
            return;
        }
        self.bump();
        if self.peek_is('\'') {
            self.bump();
        }
    }

    fn skip_line_comment(&mut self) {
        while self.chars.peek().is_some_and(|c| *c != '\n') {
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) {
        let mut open = 1;
        while let Some(c) = self.bump() {
            if c == '/' && self.peek_is('*') {
                self.bump();
                open += 1;
            } else if c == '*' && self.peek_is('/') {
                self.bump();
                open -= 1;
                if open == 0 {
                    return;
                }
            }
        }
    }
}

/// Reject source whose brackets, or runs of prefix operators, nest deeper
/// than `limit`. The parser recurses once per level.
fn check_nesting(source: &str, filename: &str, limit: usize) -> Result<(), ParseError> {
    let mut cursor = Cursor::new(source);
    let mut depth = 0usize;
    let mut prefix = 0usize;
    while let Some(c) = cursor.bump() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                prefix = 0;
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                prefix = 0;
            }
            '!' | '-' | '*' | '&' => prefix += 1,
            '"' => {
                cursor.skip_quoted('"');
                prefix = 0;
            }
            '\'' => {
                cursor.skip_char_literal();
                prefix = 0;
            }
            '/' if cursor.peek_is('/') => cursor.skip_line_comment(),
            '/' if cursor.peek_is('*') => {
                cursor.bump();
                cursor.skip_block_comment();
            }
            c if c.is_whitespace() => {}
            _ => prefix = 0,
        }
        if depth + prefix > limit {
            return Err(ParseError::new(format!(
                "nesting exceeds the limit of {} levels",
                limit
            ))
            .with_location(SourceLocation::new(
                filename,
                cursor.line,
                cursor.column.max(1),
            )));
        }
    }
    Ok(())
}
