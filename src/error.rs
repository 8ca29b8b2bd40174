//! Per-phase error types, aggregated into one [`SimalError`] the way the
//! pipeline phases of this crate each get a narrow error type first.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnterminatedString { line: usize, column: usize },
    UnterminatedHeredoc { label: String, line: usize, column: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnterminatedString { line, column } => {
                write!(f, "unterminated quoted string at {}:{}", line, column)
            }
            LexError::UnterminatedHeredoc { label, line, column } => write!(
                f,
                "unterminated heredoc <<{} starting at {}:{}",
                label, line, column
            ),
        }
    }
}

impl std::error::Error for LexError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    MissingSystemRoot { line: usize, column: usize },
    UnmatchedDelimiter { what: &'static str, line: usize, column: usize },
    DuplicateKey { key: String, line: usize, column: usize },
    TrailingAnnotation { line: usize, column: usize },
    FieldMissingColon { line: usize, column: usize },
    MethodMissingParams { line: usize, column: usize },
    MethodMissingArrow { line: usize, column: usize },
    EndpointMissingArrow { line: usize, column: usize },
    UnexpectedToken { found: String, line: usize, column: usize },
    UnexpectedEof,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingSystemRoot { line, column } => {
                write!(f, "expected 'system {{' at {}:{}", line, column)
            }
            ParseError::UnmatchedDelimiter { what, line, column } => {
                write!(f, "unmatched {} at {}:{}", what, line, column)
            }
            ParseError::DuplicateKey { key, line, column } => write!(
                f,
                "duplicate attribute key {:?} at {}:{}",
                key, line, column
            ),
            ParseError::TrailingAnnotation { line, column } => write!(
                f,
                "annotation at {}:{} has no following node",
                line, column
            ),
            ParseError::FieldMissingColon { line, column } => {
                write!(f, "field missing ':' at {}:{}", line, column)
            }
            ParseError::MethodMissingParams { line, column } => {
                write!(f, "method missing '(params)' at {}:{}", line, column)
            }
            ParseError::MethodMissingArrow { line, column } => {
                write!(f, "method missing '->' at {}:{}", line, column)
            }
            ParseError::EndpointMissingArrow { line, column } => {
                write!(f, "endpoint line missing '->' at {}:{}", line, column)
            }
            ParseError::UnexpectedToken { found, line, column } => write!(
                f,
                "unexpected token {:?} at {}:{}",
                found, line, column
            ),
            ParseError::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors from reconstructing an AST out of full JSON. Distinct from
/// [`ParseError`] because the failure here is "this JSON doesn't describe a
/// valid node", not a grammar error over source text.
#[derive(Debug, Clone, PartialEq)]
pub enum LowerError {
    Malformed(String),
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::Malformed(msg) => write!(f, "malformed full JSON: {}", msg),
        }
    }
}

impl std::error::Error for LowerError {}

#[derive(Debug, Clone, PartialEq)]
pub enum SimalError {
    Lex(LexError),
    Parse(ParseError),
    Lower(LowerError),
}

impl fmt::Display for SimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimalError::Lex(e) => write!(f, "lex error: {}", e),
            SimalError::Parse(e) => write!(f, "parse error: {}", e),
            SimalError::Lower(e) => write!(f, "lowering error: {}", e),
        }
    }
}

impl std::error::Error for SimalError {}

impl From<LexError> for SimalError {
    fn from(e: LexError) -> Self {
        SimalError::Lex(e)
    }
}

impl From<ParseError> for SimalError {
    fn from(e: ParseError) -> Self {
        SimalError::Parse(e)
    }
}

impl From<LowerError> for SimalError {
    fn from(e: LowerError) -> Self {
        SimalError::Lower(e)
    }
}
