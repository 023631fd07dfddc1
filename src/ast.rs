use std::fmt;

use crate::error::BuildError;
use crate::lexer::{Token, TokenKind};
use crate::parser::{Production, RawNode, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatKind {
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

impl RepeatKind {
    pub fn symbol(self) -> char {
        match self {
            RepeatKind::ZeroOrMore => '*',
            RepeatKind::OneOrMore => '+',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    /// Inclusive, with `start <= end`.
    Range(char, char),
}

/// A bracketed class such as `{a-cx}`, items in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharClass {
    pub negated: bool,
    pub items: Vec<ClassItem>,
}

impl CharClass {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every member character, item by item, each range in ascending order.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.items.iter().flat_map(|item| match *item {
            ClassItem::Char(c) => c..=c,
            ClassItem::Range(start, end) => start..=end,
        })
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        if self.negated {
            f.write_str("^")?;
        }
        for item in &self.items {
            match item {
                ClassItem::Char(c) => write!(f, "{}", c)?,
                ClassItem::Range(start, end) => write!(f, "{}-{}", start, end)?,
            }
        }
        f.write_str("}")
    }
}

/// Normalized parse tree.
///
/// `Literal`, `Empty` and `CharClass` are leaves; the rest are structural
/// nodes whose children keep the order they were written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Literal(char),
    /// The empty string: an empty pattern, `()`, or the `{}` marker.
    Empty,
    CharClass(CharClass),
    Concat(Vec<ParseNode>),
    /// Two or more branches, combined pairwise from the left.
    Alternation(Vec<ParseNode>),
    Star(Box<ParseNode>),
    Plus(Box<ParseNode>),
    Group {
        node: Box<ParseNode>,
        repeat: Option<RepeatKind>,
    },
}

impl ParseNode {
    /// Normalize a raw production tree.
    ///
    /// Single-child productions collapse, ε productions disappear, and
    /// classes become one leaf.
    pub fn from_raw(tree: &Production) -> Result<ParseNode, BuildError> {
        match tree.rule {
            Rule::Grammar | Rule::Expr => match productions(tree).as_slice() {
                [only] => ParseNode::from_raw(only),
                _ => malformed("grammar and expr wrap exactly one production"),
            },
            Rule::Regex => match productions(tree).as_slice() {
                [] => Ok(ParseNode::Empty),
                [only] => ParseNode::from_raw(only),
                _ => malformed("regex has at most one production"),
            },
            Rule::Expression => {
                let mut nodes = productions(tree)
                    .into_iter()
                    .map(ParseNode::from_raw)
                    .collect::<Result<Vec<_>, _>>()?;
                match nodes.len() {
                    0 => malformed("expression without exprs"),
                    1 => Ok(nodes.remove(0)),
                    _ => Ok(ParseNode::Concat(nodes)),
                }
            }
            Rule::OrExpr => {
                let branches = productions(tree)
                    .into_iter()
                    .map(ParseNode::from_raw)
                    .collect::<Result<Vec<_>, _>>()?;
                if branches.len() < 2 {
                    return malformed("alternation with fewer than two branches");
                }
                Ok(ParseNode::Alternation(branches))
            }
            Rule::BracketExpr => match productions(tree).as_slice() {
                [regex, symbol] => Ok(ParseNode::Group {
                    node: Box::new(ParseNode::from_raw(regex)?),
                    repeat: repeat_kind(symbol),
                }),
                _ => malformed("bracket expression needs a regex and a symbol"),
            },
            Rule::Id => from_id(tree),
            Rule::Range | Rule::RangeId | Rule::Symbol => {
                malformed("range, rangeid and symbol only appear inside other productions")
            }
        }
    }

    /// Direct children, left to right. Leaves have none.
    pub fn children(&self) -> &[ParseNode] {
        match self {
            ParseNode::Literal(_) | ParseNode::Empty | ParseNode::CharClass(_) => &[],
            ParseNode::Concat(nodes) | ParseNode::Alternation(nodes) => nodes,
            ParseNode::Star(node) | ParseNode::Plus(node) | ParseNode::Group { node, .. } => {
                std::slice::from_ref(&**node)
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            ParseNode::Literal(_) | ParseNode::Empty | ParseNode::CharClass(_)
        )
    }

    /// Textual value of a leaf; structural nodes have none.
    pub fn value(&self) -> Option<String> {
        match self {
            ParseNode::Literal(c) => Some(c.to_string()),
            ParseNode::Empty => Some("{}".to_string()),
            ParseNode::CharClass(class) => Some(class.to_string()),
            _ => None,
        }
    }

    /// Depth-first post-order walk: children left to right, then the node.
    ///
    /// Each call starts a fresh walk.
    pub fn post_order(&self) -> PostOrder<'_> {
        PostOrder {
            stack: vec![(self, 0)],
        }
    }

    /// Leaf values in the order they were written.
    pub fn leaf_values(&self) -> impl Iterator<Item = String> + '_ {
        self.post_order().filter_map(ParseNode::value)
    }

    fn label(&self) -> String {
        match self {
            ParseNode::Concat(_) => "concat".to_string(),
            ParseNode::Alternation(_) => "alternation".to_string(),
            ParseNode::Star(_) => "star".to_string(),
            ParseNode::Plus(_) => "plus".to_string(),
            ParseNode::Group { repeat: None, .. } => "group".to_string(),
            ParseNode::Group { repeat: Some(kind), .. } => format!("group{}", kind.symbol()),
            leaf => leaf.value().unwrap_or_default(),
        }
    }

    fn fmt_level(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        writeln!(f, "{}{}", "-".repeat(level), self.label())?;
        for child in self.children() {
            child.fmt_level(f, level + 1)?;
        }
        Ok(())
    }
}

/// Prints one node per line, indented with one `-` per level.
impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_level(f, 0)
    }
}

pub struct PostOrder<'a> {
    /// Nodes on the current path with the index of their next child.
    stack: Vec<(&'a ParseNode, usize)>,
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = &'a ParseNode;

    fn next(&mut self) -> Option<&'a ParseNode> {
        loop {
            let (node, next_child) = self.stack.last_mut()?;
            let node: &'a ParseNode = *node;
            match node.children().get(*next_child) {
                Some(child) => {
                    *next_child += 1;
                    self.stack.push((child, 0));
                }
                None => {
                    self.stack.pop();
                    return Some(node);
                }
            }
        }
    }
}

fn malformed<T>(reason: &'static str) -> Result<T, BuildError> {
    Err(BuildError::MalformedTree { reason })
}

fn productions(tree: &Production) -> Vec<&Production> {
    tree.children
        .iter()
        .filter_map(|child| match child {
            RawNode::Production(p) => Some(p),
            RawNode::Token(_) => None,
        })
        .collect()
}

fn tokens(tree: &Production) -> Vec<Token> {
    tree.children
        .iter()
        .filter_map(|child| match child {
            RawNode::Token(t) => Some(*t),
            RawNode::Production(_) => None,
        })
        .collect()
}

fn repeat_kind(symbol: &Production) -> Option<RepeatKind> {
    match tokens(symbol).first().map(|t| t.kind) {
        Some(TokenKind::Star) => Some(RepeatKind::ZeroOrMore),
        Some(TokenKind::Plus) => Some(RepeatKind::OneOrMore),
        _ => None,
    }
}

fn repeated(node: ParseNode, repeat: Option<RepeatKind>) -> ParseNode {
    match repeat {
        None => node,
        Some(RepeatKind::ZeroOrMore) => ParseNode::Star(Box::new(node)),
        Some(RepeatKind::OneOrMore) => ParseNode::Plus(Box::new(node)),
    }
}

fn from_id(id: &Production) -> Result<ParseNode, BuildError> {
    let first = match id.children.first() {
        Some(RawNode::Token(token)) => token.kind,
        _ => return malformed("id starts with a token"),
    };
    match (first, productions(id).as_slice()) {
        (TokenKind::Literal(c), [symbol]) => {
            Ok(repeated(ParseNode::Literal(c), repeat_kind(symbol)))
        }
        (TokenKind::LBrace, [range, symbol]) => Ok(repeated(
            ParseNode::CharClass(class_from_range(range)?),
            repeat_kind(symbol),
        )),
        (TokenKind::EmptyMarker, []) => Ok(ParseNode::Empty),
        _ => malformed("id is a literal, a class or the empty marker"),
    }
}

fn class_from_range(range: &Production) -> Result<CharClass, BuildError> {
    let mut class = CharClass {
        negated: tokens(range).iter().any(|t| t.kind == TokenKind::Caret),
        items: Vec::new(),
    };
    for range_id in productions(range) {
        let chars: Vec<char> = tokens(range_id)
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::Literal(c) => Some(c),
                _ => None,
            })
            .collect();
        let item = match chars.as_slice() {
            [c] => ClassItem::Char(*c),
            [start, end] => ClassItem::Range(*start, *end),
            _ => return malformed("rangeid holds one or two literals"),
        };
        class.items.push(item);
    }
    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn tree(pattern: &str) -> ParseNode {
        let raw = Parser::new(16).parse(&lex(pattern)).unwrap();
        ParseNode::from_raw(&raw).unwrap()
    }

    fn lit(c: char) -> ParseNode {
        ParseNode::Literal(c)
    }

    #[test]
    fn single_child_productions_collapse() {
        assert_eq!(tree("a"), lit('a'));
        assert_eq!(tree("ab"), ParseNode::Concat(vec![lit('a'), lit('b')]));
    }

    #[test]
    fn epsilon_productions_disappear() {
        assert_eq!(tree(""), ParseNode::Empty);
        assert_eq!(
            tree("()"),
            ParseNode::Group { node: Box::new(ParseNode::Empty), repeat: None }
        );
        assert_eq!(tree("{}"), ParseNode::Empty);
    }

    #[test]
    fn alternation_binds_looser_than_concatenation() {
        assert_eq!(
            tree("ab|c"),
            ParseNode::Alternation(vec![ParseNode::Concat(vec![lit('a'), lit('b')]), lit('c')])
        );
    }

    #[test]
    fn repetition_wraps_literals_and_groups() {
        assert_eq!(tree("a*"), ParseNode::Star(Box::new(lit('a'))));
        assert_eq!(tree("a+"), ParseNode::Plus(Box::new(lit('a'))));
        assert_eq!(
            tree("(ab)+"),
            ParseNode::Group {
                node: Box::new(ParseNode::Concat(vec![lit('a'), lit('b')])),
                repeat: Some(RepeatKind::OneOrMore),
            }
        );
    }

    #[test]
    fn classes_flatten_into_one_leaf() {
        let node = tree("{xa-c}*");
        let ParseNode::Star(inner) = &node else {
            panic!("expected a star, got {:?}", node);
        };
        let ParseNode::CharClass(class) = &**inner else {
            panic!("expected a class, got {:?}", inner);
        };
        assert!(inner.is_leaf());
        assert_eq!(class.items, vec![ClassItem::Char('x'), ClassItem::Range('a', 'c')]);
        assert_eq!(class.chars().collect::<String>(), "xabc");
        assert_eq!(inner.value().as_deref(), Some("{xa-c}"));
        assert!(!class.negated);

        let ParseNode::CharClass(negated) = tree("{^a}") else {
            panic!("expected a class");
        };
        assert!(negated.negated);
        assert_eq!(negated.to_string(), "{^a}");
    }

    #[test]
    fn post_order_visits_children_first_and_restarts() {
        let node = tree("a(b|c)*d");
        let labels: Vec<String> = node.post_order().map(|n| n.label()).collect();
        assert_eq!(
            labels,
            vec!["a", "b", "c", "alternation", "group*", "d", "concat"]
        );
        let values: Vec<String> = node.leaf_values().collect();
        assert_eq!(values, vec!["a", "b", "c", "d"]);
        assert_eq!(node.leaf_values().collect::<Vec<_>>(), values);
    }

    #[test]
    fn display_prints_a_dashed_tree() {
        assert_eq!(tree("a|b*").to_string(), "alternation\n-a\n-star\n--b\n");
    }

    #[test]
    fn malformed_raw_trees_are_reported() {
        let symbol = Production { rule: Rule::Symbol, children: Vec::new() };
        assert!(matches!(
            ParseNode::from_raw(&symbol),
            Err(BuildError::MalformedTree { .. })
        ));
        let expression = Production { rule: Rule::Expression, children: Vec::new() };
        assert!(ParseNode::from_raw(&expression).is_err());
    }
}
