//! Regular expressions to Thompson NFAs.
//!
//! A pattern goes through [`lexer::lex`], [`parser::Parser`],
//! [`ast::ParseNode::from_raw`] and [`nfa::Builder`], and comes out as a
//! numbered [`Nfa`] that a renderer can walk state by state.
//!
//! ```
//! let compiled = thompson_nfa::compile("ab").unwrap();
//! let edges: Vec<_> = compiled.nfa.edges().map(|(s, t, _)| (s, t)).collect();
//! assert_eq!(edges, vec![(0, 1), (1, 2), (2, 3)]);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod nfa;
pub mod parser;

use log::debug;

pub use ast::ParseNode;
pub use error::{BuildError, Diagnostics, Error, Fault};
pub use nfa::{Label, Nfa, NfaState, StateId, Transition};

/// Settings for compiling patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How deeply groups may nest before the pattern is rejected.
    ///
    /// Values above [`parser::DEPTH_CEILING`] are enforced as the ceiling.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: parser::DEPTH_CEILING,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Run the whole pipeline on `pattern`.
    ///
    /// Illegal characters do not stop compilation; they are returned as
    /// [`Compiled::warnings`]. A syntax fault does, and comes back together
    /// with those warnings in [`Error::Pattern`].
    pub fn compile(&self, pattern: &str) -> Result<Compiled, Error> {
        debug!("compiling {:?}", pattern);
        let stream = lexer::lex(pattern);
        let raw = match parser::Parser::new(self.max_depth).parse(&stream) {
            Ok(raw) => raw,
            Err(fault) => {
                let mut faults = stream.faults;
                faults.push(fault);
                return Err(Error::Pattern(Diagnostics { faults }));
            }
        };
        let tree = ParseNode::from_raw(&raw)?;

        let mut builder = nfa::Builder::new();
        let fragment = builder.build(&tree)?;
        let nfa = builder.finish(fragment)?;
        Ok(Compiled {
            tree,
            nfa,
            warnings: Diagnostics {
                faults: stream.faults,
            },
        })
    }
}

/// A successfully compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub tree: ParseNode,
    pub nfa: Nfa,
    /// Illegal characters that were skipped.
    pub warnings: Diagnostics,
}

/// Compile `pattern` with the default [`Config`].
pub fn compile(pattern: &str) -> Result<Compiled, Error> {
    Config::default().compile(pattern)
}
