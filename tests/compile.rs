use thompson_nfa::lexer::TokenKind;
use thompson_nfa::parser::DEPTH_CEILING;
use thompson_nfa::{compile, BuildError, Config, Error, Fault, Label, Nfa};

const E: Label = Label::Epsilon;

fn nfa(pattern: &str) -> Nfa {
    compile(pattern).unwrap().nfa
}

fn epsilon_edges(nfa: &Nfa) -> usize {
    nfa.edges().filter(|(_, _, label)| label.is_epsilon()).count()
}

fn accepting(nfa: &Nfa) -> Vec<usize> {
    nfa.iter().filter(|s| s.is_accept()).map(|s| s.id).collect()
}

#[test]
fn two_literals() {
    let nfa = nfa("ab");
    assert_eq!(nfa.len(), 4);
    assert_eq!(
        nfa.edges().collect::<Vec<_>>(),
        vec![(0, 1, Label::Char('a')), (1, 2, E), (2, 3, Label::Char('b'))]
    );
    assert_eq!(nfa.accept(), 3);
    assert_eq!(accepting(&nfa), vec![3]);
}

#[test]
fn concatenated_literals_interleave_epsilons() {
    for pattern in ["a", "xy", "abc", "a1b2c3d4", "hello.world"] {
        let nfa = nfa(pattern);
        let n = pattern.len();
        assert_eq!(nfa.len(), 2 * n, "{}", pattern);
        assert_eq!(epsilon_edges(&nfa), n - 1, "{}", pattern);
        let labels: String = nfa
            .edges()
            .filter_map(|(_, _, label)| match label {
                Label::Char(c) => Some(c),
                Label::Epsilon => None,
            })
            .collect();
        assert_eq!(labels, pattern);
    }
}

#[test]
fn alternation() {
    let nfa = nfa("a|b");
    assert_eq!(nfa.len(), 6);
    assert_eq!(
        nfa.edges().collect::<Vec<_>>(),
        vec![
            (0, 1, E),
            (0, 3, E),
            (1, 2, Label::Char('a')),
            (2, 5, E),
            (3, 4, Label::Char('b')),
            (4, 5, E),
        ]
    );
    assert_eq!(accepting(&nfa), vec![5]);
}

#[test]
fn alternation_adds_two_states_and_four_epsilons() {
    let (a, b) = (nfa("ab"), nfa("c*"));
    let both = nfa("ab|c*");
    assert_eq!(both.len(), a.len() + b.len() + 2);
    assert_eq!(both.edges().count(), a.edges().count() + b.edges().count() + 4);
    assert_eq!(epsilon_edges(&both), epsilon_edges(&a) + epsilon_edges(&b) + 4);
}

#[test]
fn star() {
    let nfa = nfa("a*");
    assert_eq!(nfa.len(), 4);
    assert_eq!(
        nfa.edges().collect::<Vec<_>>(),
        vec![(0, 1, E), (0, 3, E), (1, 2, Label::Char('a')), (2, 1, E), (2, 3, E)]
    );
    assert_eq!(nfa.accept(), 3);
}

#[test]
fn star_and_plus_on_a_larger_fragment() {
    let inner = nfa("(ab)");
    let star = nfa("(ab)*");
    let plus = nfa("(ab)+");
    assert_eq!(star.len(), inner.len() + 2);
    assert_eq!(plus.len(), inner.len() + 2);

    let exit = star.len() - 1;
    // Bypass from the new entry straight to the new exit.
    assert_eq!(star.edges().filter(|&(s, t, _)| s == 0 && t == exit).count(), 1);
    assert_eq!(plus.edges().filter(|&(s, t, _)| s == 0 && t == exit).count(), 0);
    // Loop from the inner exit back to the inner entry.
    let (inner_entry, inner_exit) = (1, inner.len());
    for nfa in [&star, &plus] {
        assert_eq!(
            nfa.edges().filter(|&(s, t, _)| s == inner_exit && t == inner_entry).count(),
            1
        );
    }
    assert_eq!(epsilon_edges(&star), epsilon_edges(&plus) + 1);
}

#[test]
fn numbering_is_deterministic() {
    for pattern in ["a(b|c)*d", "{a-e}+x", "((a|b)+|c)*", ""] {
        let first = compile(pattern).unwrap();
        let second = compile(pattern).unwrap();
        assert_eq!(first, second, "{}", pattern);
        let ids: Vec<usize> = first.nfa.iter().map(|s| s.id).collect();
        assert_eq!(ids, (0..first.nfa.len()).collect::<Vec<_>>());
        // Walking twice gives the same sequence.
        assert!(first.nfa.iter().eq(first.nfa.iter()));
    }
}

#[test]
fn every_automaton_has_one_start_and_one_accept() {
    for pattern in ["a", "ab|c", "(a*b+)*", "{abc}*d", "{}", "()", "x{}y"] {
        let nfa = compile(pattern).unwrap().nfa;
        assert_eq!(nfa.start(), 0, "{}", pattern);
        assert_eq!(accepting(&nfa), vec![nfa.accept()], "{}", pattern);
        assert_eq!(nfa.accept(), nfa.len() - 1, "{}", pattern);
    }
}

#[test]
fn empty_alternation_branch_is_a_syntax_fault() {
    assert_eq!(
        compile("(a|)").unwrap_err(),
        Error::Pattern(thompson_nfa::Diagnostics {
            faults: vec![Fault::UnexpectedToken { found: TokenKind::RParen, pos: 3 }],
        })
    );
}

#[test]
fn lone_open_paren_is_a_syntax_fault() {
    let err = compile("(").unwrap_err();
    assert_eq!(
        err,
        Error::Pattern(thompson_nfa::Diagnostics {
            faults: vec![Fault::UnexpectedEnd { pos: 1 }],
        })
    );
}

#[test]
fn unmatched_parens_never_build() {
    for pattern in ["(a", "a(b|c", "((a)", "a)"] {
        let err = compile(pattern).unwrap_err();
        let diagnostics = err.diagnostics().unwrap();
        assert!(diagnostics.syntax_fault().is_some(), "{}", pattern);
    }
}

#[test]
fn illegal_characters_are_warnings() {
    let compiled = compile("a b").unwrap();
    assert_eq!(compiled.nfa, nfa("ab"));
    assert_eq!(
        compiled.warnings.faults,
        vec![Fault::IllegalCharacter { ch: ' ', pos: 1 }]
    );
}

#[test]
fn illegal_characters_are_kept_alongside_a_syntax_fault() {
    let err = compile("a?(").unwrap_err();
    let faults = &err.diagnostics().unwrap().faults;
    assert_eq!(
        faults,
        &vec![
            Fault::IllegalCharacter { ch: '?', pos: 1 },
            Fault::UnexpectedEnd { pos: 3 },
        ]
    );
}

#[test]
fn character_class_expands_ranges_in_order() {
    let compiled = compile("{c0-2}").unwrap();
    let labels: Vec<Label> = compiled
        .nfa
        .edges()
        .map(|(_, _, label)| label)
        .filter(|label| !label.is_epsilon())
        .collect();
    assert_eq!(
        labels,
        vec![Label::Char('c'), Label::Char('0'), Label::Char('1'), Label::Char('2')]
    );
    // Shared entry and exit around four two-state branches.
    assert_eq!(compiled.nfa.len(), 10);
    assert_eq!(compiled.nfa.state(0).unwrap().edges.len(), 4);
}

#[test]
fn repeated_class_matches_repeated_group() {
    assert_eq!(nfa("{ab}*").len(), nfa("(a|b)*").len());
    assert_eq!(nfa("{ab}+").len(), nfa("{ab}*").len());
}

#[test]
fn negated_class_is_a_construction_fault() {
    assert_eq!(
        compile("{^a}").unwrap_err(),
        Error::Construction(BuildError::UnsupportedNegation { class: "{^a}".to_string() })
    );
}

#[test]
fn empty_marker_and_empty_pattern_build_an_epsilon_edge() {
    for pattern in ["", "{}", "()"] {
        let nfa = nfa(pattern);
        assert_eq!(nfa.edges().collect::<Vec<_>>(), vec![(0, 1, E)], "{:?}", pattern);
    }
}

#[test]
fn deep_nesting_is_reported_instead_of_overflowing() {
    let pattern = format!("{}a{}", "(".repeat(100), ")".repeat(100));
    assert!(Config::new().max_depth(100).compile(&pattern).is_ok());
    let err = Config::new().max_depth(99).compile(&pattern).unwrap_err();
    assert_eq!(
        err.diagnostics().unwrap().faults,
        vec![Fault::NestingTooDeep { limit: 99, pos: 99 }]
    );
}

#[test]
fn long_flat_patterns_compile() {
    let pattern = "ab|".repeat(2000) + "c";
    let nfa = nfa(&pattern);
    // Each `|` adds an entry and an exit.
    assert_eq!(nfa.len(), 2000 * 4 + 2 + 2000 * 2);
}

#[test]
fn huge_depth_limits_are_capped_instead_of_overflowing() {
    let levels = 10 * DEPTH_CEILING;
    let pattern = format!("{}a{}", "(".repeat(levels), ")".repeat(levels));
    let err = Config::new().max_depth(100_000).compile(&pattern).unwrap_err();
    assert_eq!(
        err.diagnostics().unwrap().faults,
        vec![Fault::NestingTooDeep { limit: DEPTH_CEILING, pos: DEPTH_CEILING }]
    );

    let at_ceiling = format!(
        "{}a{}",
        "(".repeat(DEPTH_CEILING),
        ")".repeat(DEPTH_CEILING)
    );
    assert!(Config::new().max_depth(usize::MAX).compile(&at_ceiling).is_ok());
}
