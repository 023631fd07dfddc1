use std::fmt;

use log::{debug, trace};

use crate::ast::{CharClass, ParseNode, RepeatKind};
use crate::error::BuildError;

/// A state's permanent number in a finished [`Nfa`].
pub type StateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Epsilon,
    Char(char),
}

impl Label {
    pub fn is_epsilon(self) -> bool {
        self == Label::Epsilon
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Epsilon => f.write_str("ε"),
            Label::Char(c) => write!(f, "{}", c),
        }
    }
}

/// Handle to a state in an [`Arena`]. Says nothing about the final numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateRef(usize);

/// An outgoing edge, owned by its source state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: StateRef,
    pub label: Label,
}

#[derive(Debug, Clone, Default)]
struct State {
    id: Option<StateId>,
    edges: Vec<Edge>,
}

/// Contiguous store of states under construction.
///
/// Edges refer to their targets by index, so loops need no shared ownership.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    states: Vec<State>,
    next_id: StateId,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn add_state(&mut self) -> StateRef {
        self.states.push(State::default());
        StateRef(self.states.len() - 1)
    }

    pub fn connect(&mut self, from: StateRef, to: StateRef, label: Label) {
        trace!("edge {:?} -> {:?} on {}", from, to, label);
        self.states[from.0].edges.push(Edge { target: to, label });
    }

    pub fn edges(&self, state: StateRef) -> &[Edge] {
        &self.states[state.0].edges
    }

    /// A state accepts exactly when nothing leaves it.
    pub fn is_accept(&self, state: StateRef) -> bool {
        self.edges(state).is_empty()
    }

    pub fn id(&self, state: StateRef) -> Option<StateId> {
        self.states[state.0].id
    }

    /// Give every unnumbered state of `fragment` the next free id, in
    /// fragment order. States that already have an id keep it.
    pub fn number(&mut self, fragment: &Fragment) {
        for &state in fragment.states() {
            let slot = &mut self.states[state.0].id;
            if slot.is_none() {
                *slot = Some(self.next_id);
                self.next_id += 1;
            }
        }
    }
}

/// A partial automaton with one entry (first state) and one exit (last state).
///
/// The exit has no outgoing edges until an enclosing construction links it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    states: Vec<StateRef>,
}

impl Fragment {
    fn pair(entry: StateRef, exit: StateRef) -> Self {
        Self {
            states: vec![entry, exit],
        }
    }

    pub fn entry(&self) -> StateRef {
        self.states[0]
    }

    pub fn exit(&self) -> StateRef {
        self.states[self.states.len() - 1]
    }

    pub fn states(&self) -> &[StateRef] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Thompson construction over a [`ParseNode`] tree.
#[derive(Debug, Default)]
pub struct Builder {
    arena: Arena,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Build the fragment for `node` and everything below it.
    pub fn build(&mut self, node: &ParseNode) -> Result<Fragment, BuildError> {
        let fragment = match node {
            ParseNode::Literal(c) => self.literal(Label::Char(*c)),
            ParseNode::Empty => self.literal(Label::Epsilon),
            ParseNode::CharClass(class) => self.class(class)?,
            ParseNode::Concat(nodes) => {
                let (first, rest) = split_first(nodes, "concatenation without operands")?;
                let mut fragment = self.build(first)?;
                for node in rest {
                    let next = self.build(node)?;
                    fragment = self.concat(fragment, next);
                }
                fragment
            }
            ParseNode::Alternation(branches) => {
                if branches.len() < 2 {
                    return Err(BuildError::MalformedTree {
                        reason: "alternation with fewer than two branches",
                    });
                }
                let (first, rest) = split_first(branches, "alternation without branches")?;
                let mut fragment = self.build(first)?;
                for node in rest {
                    let next = self.build(node)?;
                    fragment = self.alternate(vec![fragment, next]);
                }
                fragment
            }
            ParseNode::Star(node) => {
                let inner = self.build(node)?;
                self.repeat(inner, RepeatKind::ZeroOrMore)
            }
            ParseNode::Plus(node) => {
                let inner = self.build(node)?;
                self.repeat(inner, RepeatKind::OneOrMore)
            }
            ParseNode::Group { node, repeat } => {
                let inner = self.build(node)?;
                match repeat {
                    Some(kind) => self.repeat(inner, *kind),
                    None => inner,
                }
            }
        };
        trace!("built {} state fragment", fragment.len());
        Ok(fragment)
    }

    /// Number the states of the top-level fragment and freeze the automaton.
    pub fn finish(mut self, fragment: Fragment) -> Result<Nfa, BuildError> {
        self.arena.number(&fragment);
        let mut states = Vec::with_capacity(fragment.len());
        for &state in fragment.states() {
            let id = self.numbered(state)?;
            let edges = self
                .arena
                .edges(state)
                .iter()
                .map(|edge| {
                    Ok(Transition {
                        target: self.numbered(edge.target)?,
                        label: edge.label,
                    })
                })
                .collect::<Result<Vec<_>, BuildError>>()?;
            states.push(NfaState { id, edges });
        }
        states.sort_by_key(|state| state.id);

        let nfa = Nfa {
            start: self.numbered(fragment.entry())?,
            accept: self.numbered(fragment.exit())?,
            states,
        };
        debug!(
            "built NFA with {} states and {} edges",
            nfa.len(),
            nfa.edges().count()
        );
        Ok(nfa)
    }

    fn numbered(&self, state: StateRef) -> Result<StateId, BuildError> {
        self.arena.id(state).ok_or(BuildError::MalformedTree {
            reason: "edge leads outside the finished fragment",
        })
    }

    /// `s0 --label--> s1`.
    fn literal(&mut self, label: Label) -> Fragment {
        let entry = self.arena.add_state();
        let exit = self.arena.add_state();
        self.arena.connect(entry, exit, label);
        Fragment::pair(entry, exit)
    }

    /// `exit(a) --ε--> entry(b)`; the states of `b` follow those of `a`.
    fn concat(&mut self, mut a: Fragment, b: Fragment) -> Fragment {
        self.arena.connect(a.exit(), b.entry(), Label::Epsilon);
        a.states.extend(b.states);
        a
    }

    /// One shared entry and exit around every branch, in order.
    fn alternate(&mut self, branches: Vec<Fragment>) -> Fragment {
        let entry = self.arena.add_state();
        let exit = self.arena.add_state();
        let mut states = vec![entry];
        for branch in branches {
            self.arena.connect(entry, branch.entry(), Label::Epsilon);
            self.arena.connect(branch.exit(), exit, Label::Epsilon);
            states.extend(branch.states);
        }
        states.push(exit);
        Fragment { states }
    }

    /// Loop `inner` back on itself. `*` also gets an entry-to-exit bypass.
    fn repeat(&mut self, inner: Fragment, kind: RepeatKind) -> Fragment {
        let entry = self.arena.add_state();
        let exit = self.arena.add_state();
        self.arena.connect(entry, inner.entry(), Label::Epsilon);
        if kind == RepeatKind::ZeroOrMore {
            self.arena.connect(entry, exit, Label::Epsilon);
        }
        self.arena.connect(inner.exit(), inner.entry(), Label::Epsilon);
        self.arena.connect(inner.exit(), exit, Label::Epsilon);

        let mut states = Vec::with_capacity(inner.len() + 2);
        states.push(entry);
        states.extend(inner.states);
        states.push(exit);
        Fragment { states }
    }

    fn class(&mut self, class: &CharClass) -> Result<Fragment, BuildError> {
        if class.negated {
            return Err(BuildError::UnsupportedNegation {
                class: class.to_string(),
            });
        }
        if class.is_empty() {
            return Ok(self.literal(Label::Epsilon));
        }
        let branches = class
            .chars()
            .map(|c| self.literal(Label::Char(c)))
            .collect();
        Ok(self.alternate(branches))
    }
}

fn split_first<'a>(
    nodes: &'a [ParseNode],
    reason: &'static str,
) -> Result<(&'a ParseNode, &'a [ParseNode]), BuildError> {
    nodes.split_first().ok_or(BuildError::MalformedTree { reason })
}

/// An outgoing edge of a numbered state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub target: StateId,
    pub label: Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfaState {
    pub id: StateId,
    pub edges: Vec<Transition>,
}

impl NfaState {
    pub fn is_accept(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A finished, numbered automaton.
///
/// Iterating yields every state in ascending id order, the same sequence
/// every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: StateId,
    accept: StateId,
}

impl Nfa {
    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn accept(&self) -> StateId {
        self.accept
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> Option<&NfaState> {
        self.states.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NfaState> {
        self.states.iter()
    }

    /// Every edge as `(source, target, label)`, grouped by source id.
    pub fn edges(&self) -> impl Iterator<Item = (StateId, StateId, Label)> + '_ {
        self.states
            .iter()
            .flat_map(|state| state.edges.iter().map(move |t| (state.id, t.target, t.label)))
    }

    /// Graphviz description of the automaton.
    pub fn dot(&self) -> Dot<'_> {
        Dot(self)
    }

    pub fn to_dot(&self) -> String {
        self.dot().to_string()
    }
}

impl<'a> IntoIterator for &'a Nfa {
    type Item = &'a NfaState;
    type IntoIter = std::slice::Iter<'a, NfaState>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for state in self {
            write!(f, "s{}:", state.id)?;
            if state.id == self.start {
                f.write_str(" start")?;
            }
            if state.is_accept() {
                f.write_str(" accept")?;
            }
            for edge in &state.edges {
                write!(f, " {}->s{}", edge.label, edge.target)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub struct Dot<'a>(&'a Nfa);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nfa = self.0;
        writeln!(f, "digraph nfa {{")?;
        writeln!(f, "    rankdir=LR;")?;
        writeln!(f, "    start [label=\"\" shape=plaintext];")?;
        writeln!(f, "    node [shape=doublecircle]; s{};", nfa.accept)?;
        writeln!(f, "    node [shape=circle];")?;
        writeln!(f, "    start -> s{};", nfa.start)?;
        for (source, target, label) in nfa.edges() {
            writeln!(f, "    s{} -> s{} [label=\"{}\"];", source, target, label)?;
        }
        writeln!(f, "}}")
    }
}
