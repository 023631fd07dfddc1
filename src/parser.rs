use log::{debug, trace};

use crate::error::Fault;
use crate::lexer::{Token, TokenKind, TokenStream};

/// Grammar productions, one per raw tree node.
///
/// ```text
/// grammar     := regex
/// regex       := orexpr | expression | ε
/// orexpr      := expression ('|' expression)+
/// expression  := expr+
/// expr        := bracketexpr | id
/// bracketexpr := '(' regex ')' symbol
/// id          := ID symbol | '{' range '}' symbol | '{}'
/// range       := '^'? rangeid*
/// rangeid     := ID | ID '-' ID
/// symbol      := '*' | '+' | ε
/// ```
///
/// The left-recursive rules are matched by iteration, so `expression`,
/// `orexpr` and `range` keep all of their items as direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Grammar,
    Regex,
    OrExpr,
    Expression,
    Expr,
    BracketExpr,
    Id,
    Range,
    RangeId,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    Token(Token),
    Production(Production),
}

/// A matched production and its matched sub-productions, left to right.
///
/// An ε match is a production with no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub rule: Rule,
    pub children: Vec<RawNode>,
}

impl Production {
    fn new(rule: Rule) -> Self {
        Self {
            rule,
            children: Vec::new(),
        }
    }

    fn push_token(&mut self, token: Token) {
        self.children.push(RawNode::Token(token));
    }

    fn push(&mut self, production: Production) {
        self.children.push(RawNode::Production(production));
    }
}

/// Deepest group nesting any parser accepts, whatever limit it is given.
///
/// Each nesting level costs several recursive frames in every later stage.
/// At this depth they stay well inside a 2 MiB thread stack in debug builds.
pub const DEPTH_CEILING: usize = 128;

/// Recursive-descent parser over a [`TokenStream`].
///
/// The parser holds only settings; every call to [`Parser::parse`] gets its
/// own context, so one parser can be reused across patterns.
#[derive(Debug, Clone)]
pub struct Parser {
    max_depth: usize,
}

impl Parser {
    /// Create a parser that rejects groups nested deeper than `max_depth`,
    /// or than [`DEPTH_CEILING`] if that is lower.
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.min(DEPTH_CEILING),
        }
    }

    /// The nesting limit actually enforced.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse the whole token stream.
    ///
    /// Stops at the first unexpected token or premature end of input; no
    /// partial tree is returned.
    pub fn parse(&self, stream: &TokenStream) -> Result<Production, Fault> {
        let mut cx = ParseContext {
            tokens: &stream.tokens,
            index: 0,
            end: stream.end,
            depth: 0,
            max_depth: self.max_depth,
        };
        let tree = cx.parse_grammar();
        match &tree {
            Ok(_) => debug!("parsed {} tokens", stream.tokens.len()),
            Err(fault) => debug!("syntax fault: {}", fault),
        }
        tree
    }
}

/// State of one parse: the cursor into the tokens and the group depth.
struct ParseContext<'t> {
    tokens: &'t [Token],
    index: usize,
    end: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t> ParseContext<'t> {
    /// Look at the next token without consuming it.
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.index).copied()
    }

    /// Kind of the next token, if any.
    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    /// Consume the next token and return it.
    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.index += 1;
        Some(token)
    }

    /// The fault for whatever sits at the cursor when it was not wanted.
    fn unexpected(&self) -> Fault {
        match self.peek() {
            Some(token) => Fault::UnexpectedToken {
                found: token.kind,
                pos: token.pos,
            },
            None => Fault::UnexpectedEnd { pos: self.end },
        }
    }

    /// Consume the next token if it has the given kind, else fail at the cursor.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, Fault> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.index += 1;
                Ok(token)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Consume a literal token and return its character alongside it.
    fn expect_literal(&mut self) -> Result<(char, Token), Fault> {
        match self.peek() {
            Some(token @ Token { kind: TokenKind::Literal(c), .. }) => {
                self.index += 1;
                Ok((c, token))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Whether a token of this kind can begin an expr.
    fn starts_expr(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Literal(_) | TokenKind::LParen | TokenKind::LBrace | TokenKind::EmptyMarker
        )
    }

    fn parse_grammar(&mut self) -> Result<Production, Fault> {
        let mut grammar = Production::new(Rule::Grammar);
        grammar.push(self.parse_regex()?);
        // Anything left over, such as a stray ')', is an error.
        if self.peek().is_some() {
            return Err(self.unexpected());
        }
        Ok(grammar)
    }

    /// Parse a regex, which is empty only before ')' or the end of input.
    ///
    /// Examples:
    /// - Pattern: `ab`  → Regex[Expression[..]]
    /// - Pattern: `a|b` → Regex[OrExpr[Expression, '|', Expression]]
    /// - Pattern: ``    → Regex[]
    fn parse_regex(&mut self) -> Result<Production, Fault> {
        let mut regex = Production::new(Rule::Regex);
        match self.peek_kind() {
            None | Some(TokenKind::RParen) => {
                trace!("empty regex at {}", self.index);
                return Ok(regex);
            }
            _ => {}
        }

        let first = self.parse_expression()?;
        if self.peek_kind() != Some(TokenKind::Pipe) {
            regex.push(first);
            return Ok(regex);
        }

        let mut or_expr = Production::new(Rule::OrExpr);
        or_expr.push(first);
        while self.peek_kind() == Some(TokenKind::Pipe) {
            if let Some(pipe) = self.advance() {
                or_expr.push_token(pipe);
            }
            or_expr.push(self.parse_expression()?);
        }
        regex.push(or_expr);
        Ok(regex)
    }

    /// Parse one or more adjacent exprs (implicit concatenation).
    fn parse_expression(&mut self) -> Result<Production, Fault> {
        let mut expression = Production::new(Rule::Expression);
        expression.push(self.parse_expr()?);
        while matches!(self.peek_kind(), Some(kind) if Self::starts_expr(kind)) {
            expression.push(self.parse_expr()?);
        }
        Ok(expression)
    }

    fn parse_expr(&mut self) -> Result<Production, Fault> {
        let mut expr = Production::new(Rule::Expr);
        match self.peek_kind() {
            Some(TokenKind::LParen) => expr.push(self.parse_bracket_expr()?),
            Some(kind) if Self::starts_expr(kind) => expr.push(self.parse_id()?),
            _ => return Err(self.unexpected()),
        }
        Ok(expr)
    }

    /// Parse `'(' regex ')' symbol`.
    fn parse_bracket_expr(&mut self) -> Result<Production, Fault> {
        let mut bracket = Production::new(Rule::BracketExpr);
        let open = self.expect(TokenKind::LParen)?;
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(Fault::NestingTooDeep {
                limit: self.max_depth,
                pos: open.pos,
            });
        }
        bracket.push_token(open);
        bracket.push(self.parse_regex()?);
        bracket.push_token(self.expect(TokenKind::RParen)?);
        self.depth -= 1;
        bracket.push(self.parse_symbol());
        Ok(bracket)
    }

    /// Parse a literal, a character class, or the `{}` marker.
    ///
    /// Examples:
    /// - Pattern: `a*`     → Id[a, Symbol['*']]
    /// - Pattern: `{a-c}+` → Id['{', Range[RangeId[a, '-', c]], '}', Symbol['+']]
    /// - Pattern: `{}`     → Id['{}']
    fn parse_id(&mut self) -> Result<Production, Fault> {
        let mut id = Production::new(Rule::Id);
        match self.peek_kind() {
            Some(TokenKind::Literal(_)) => {
                let (_, token) = self.expect_literal()?;
                id.push_token(token);
                id.push(self.parse_symbol());
            }
            Some(TokenKind::LBrace) => {
                id.push_token(self.expect(TokenKind::LBrace)?);
                id.push(self.parse_range()?);
                id.push_token(self.expect(TokenKind::RBrace)?);
                id.push(self.parse_symbol());
            }
            Some(TokenKind::EmptyMarker) => id.push_token(self.expect(TokenKind::EmptyMarker)?),
            _ => return Err(self.unexpected()),
        }
        Ok(id)
    }

    fn parse_range(&mut self) -> Result<Production, Fault> {
        let mut range = Production::new(Rule::Range);
        if self.peek_kind() == Some(TokenKind::Caret) {
            if let Some(caret) = self.advance() {
                range.push_token(caret);
            }
        }
        while let Some(TokenKind::Literal(_)) = self.peek_kind() {
            range.push(self.parse_range_id()?);
        }
        Ok(range)
    }

    fn parse_range_id(&mut self) -> Result<Production, Fault> {
        let mut range_id = Production::new(Rule::RangeId);
        let (start, start_token) = self.expect_literal()?;
        range_id.push_token(start_token);
        if self.peek_kind() == Some(TokenKind::Dash) {
            range_id.push_token(self.expect(TokenKind::Dash)?);
            let (end, end_token) = self.expect_literal()?;
            if start > end {
                return Err(Fault::InvalidRange {
                    start,
                    end,
                    pos: start_token.pos,
                });
            }
            range_id.push_token(end_token);
        }
        Ok(range_id)
    }

    fn parse_symbol(&mut self) -> Production {
        let mut symbol = Production::new(Rule::Symbol);
        if let Some(TokenKind::Star | TokenKind::Plus) = self.peek_kind() {
            if let Some(token) = self.advance() {
                symbol.push_token(token);
            }
        }
        symbol
    }
}
