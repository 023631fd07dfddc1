use std::fmt;

use thiserror::Error;

use crate::lexer::TokenKind;

/// A problem with the pattern the user wrote.
///
/// Positions are character offsets into the pattern, not byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// A character outside the pattern alphabet. Lexing skips it and goes on.
    #[error("illegal character {ch:?} at position {pos}")]
    IllegalCharacter { ch: char, pos: usize },
    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: TokenKind, pos: usize },
    #[error("unexpected end of pattern at position {pos}")]
    UnexpectedEnd { pos: usize },
    /// A class range whose endpoints are in descending order, e.g. `{z-a}`.
    #[error("invalid range {start:?}-{end:?} at position {pos}")]
    InvalidRange { start: char, end: char, pos: usize },
    #[error("groups nested deeper than {limit} at position {pos}")]
    NestingTooDeep { limit: usize, pos: usize },
}

impl Fault {
    pub fn pos(&self) -> usize {
        match *self {
            Fault::IllegalCharacter { pos, .. }
            | Fault::UnexpectedToken { pos, .. }
            | Fault::UnexpectedEnd { pos }
            | Fault::InvalidRange { pos, .. }
            | Fault::NestingTooDeep { pos, .. } => pos,
        }
    }

    /// Lexical faults are recoverable; every other kind aborts the parse.
    pub fn is_lexical(&self) -> bool {
        matches!(self, Fault::IllegalCharacter { .. })
    }
}

/// Every fault recorded for one pattern, lexical ones first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub faults: Vec<Fault>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Fault> {
        self.faults.iter()
    }

    /// The fault that aborted parsing, if there was one.
    pub fn syntax_fault(&self) -> Option<&Fault> {
        self.faults.iter().find(|f| !f.is_lexical())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fault) in self.faults.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", fault)?;
        }
        Ok(())
    }
}

/// A parse tree reached the automaton builder in a shape it cannot construct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Negated classes have no construction yet.
    #[error("negated character class {class} is not supported")]
    UnsupportedNegation { class: String },
    /// The parser or tree builder handed over a tree that breaks its contract.
    #[error("malformed parse tree: {reason}")]
    MalformedTree { reason: &'static str },
}

/// Why a pattern did not produce an automaton.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid pattern: {0}")]
    Pattern(Diagnostics),
    #[error("construction failed: {0}")]
    Construction(#[from] BuildError),
}

impl Error {
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            Error::Pattern(diagnostics) => Some(diagnostics),
            Error::Construction(_) => None,
        }
    }
}
