use std::fmt;

use log::{debug, trace};

use crate::error::Fault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An ASCII alphanumeric character or the wildcard `.`.
    Literal(char),
    Star,
    Plus,
    LParen,
    RParen,
    Pipe,
    LBrace,
    RBrace,
    Dash,
    Caret,
    /// The two-character sequence `{}`.
    EmptyMarker,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Literal(c) => write!(f, "literal '{}'", c),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Pipe => f.write_str("'|'"),
            TokenKind::LBrace => f.write_str("'{'"),
            TokenKind::RBrace => f.write_str("'}'"),
            TokenKind::Dash => f.write_str("'-'"),
            TokenKind::Caret => f.write_str("'^'"),
            TokenKind::EmptyMarker => f.write_str("'{}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset of the token's first character.
    pub pos: usize,
}

/// The output of [`lex`]: tokens plus the illegal characters that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    pub tokens: Vec<Token>,
    /// Character length of the pattern, where the implicit end marker sits.
    pub end: usize,
    pub faults: Vec<Fault>,
}

pub fn is_literal(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '.'
}

struct Lexer<'a> {
    pattern: &'a str,
    /// Byte offset into `pattern`.
    offset: usize,
    /// Character offset, reported in tokens and faults.
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            offset: 0,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.pattern[self.offset..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        self.pos += 1;
        Some(ch)
    }

    fn run(mut self) -> TokenStream {
        let mut stream = TokenStream::default();
        while let Some(ch) = self.peek() {
            let pos = self.pos;
            self.advance();
            let kind = match ch {
                c if is_literal(c) => TokenKind::Literal(c),
                // `{}` must win over a lone `{`.
                '{' if self.peek() == Some('}') => {
                    self.advance();
                    TokenKind::EmptyMarker
                }
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '*' => TokenKind::Star,
                '+' => TokenKind::Plus,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '|' => TokenKind::Pipe,
                '-' => TokenKind::Dash,
                '^' => TokenKind::Caret,
                other => {
                    debug!("skipping illegal character {:?} at {}", other, pos);
                    stream.faults.push(Fault::IllegalCharacter { ch: other, pos });
                    continue;
                }
            };
            trace!("token {} at {}", kind, pos);
            stream.tokens.push(Token { kind, pos });
        }
        stream.end = self.pos;
        stream
    }
}

/// Tokenize `pattern` left to right.
///
/// Never fails: characters outside the alphabet are skipped and recorded in
/// [`TokenStream::faults`].
pub fn lex(pattern: &str) -> TokenStream {
    let stream = Lexer::new(pattern).run();
    debug!(
        "lexed {} tokens, {} illegal characters",
        stream.tokens.len(),
        stream.faults.len()
    );
    stream
}
