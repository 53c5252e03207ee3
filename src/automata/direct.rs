//! Direct DFA construction from the augmented syntax tree.
//!
//! Each DFA state stands for a set of positions. The start state is
//! `firstpos(root)`; the state reached from `S` on `a` is the union of
//! `followpos(p)` over the positions `p` in `S` that match `a`. States
//! containing the end marker accept.

use std::collections::{BTreeSet, VecDeque};

use log::{debug, trace};

use crate::{
    automata::{
        dfa::{DFA, StateLabel},
        positions::{PositionId, Positions, Symbol},
        shunting_yard::{RegexToken, augment},
        syntax_tree::SyntaxTree,
    },
    error::{RegexError, Result},
};

/// Everything one compilation produced.
#[derive(Debug)]
pub struct DirectDfa {
    pub dfa: DFA,
    /// Annotated tree, absent for the empty regex and for an empty token stream.
    pub tree: Option<SyntaxTree>,
    /// Positions with their followpos sets.
    pub positions: Positions,
}

/// Compiles one pattern. A builder is consumed by the compilation, so every
/// pattern starts from its own position numbering.
#[derive(Debug, Default)]
pub struct DirectBuilder {
    positions: Positions,
}

impl DirectBuilder {
    pub fn new() -> Self {
        DirectBuilder {
            positions: Positions::new(),
        }
    }

    /// Reuses the storage of an earlier compilation's positions.
    pub fn with_positions(mut positions: Positions) -> Self {
        positions.reset();
        DirectBuilder { positions }
    }

    /// Builds the automaton for an expanded regex, marking its accepting
    /// states with `pattern_name`.
    pub fn build(self, regex: &str, pattern_name: &str) -> Result<DirectDfa> {
        if regex.is_empty() {
            debug!("pattern {}: empty regex", pattern_name);
            let mut dfa = DFA::new();
            let start = dfa.state_id_for(StateLabel::EpsilonOnly);
            dfa.set_start_state(start);
            dfa.set_accept(start, pattern_name);
            return Ok(DirectDfa {
                dfa,
                tree: None,
                positions: self.positions,
            });
        }

        let tokens = augment(regex)?;
        self.build_tokens(&tokens, pattern_name)
    }

    /// Builds the automaton from an already augmented token stream, i.e. one
    /// that ends with [`RegexToken::EndMarker`].
    pub fn build_tokens(mut self, tokens: &[RegexToken], pattern_name: &str) -> Result<DirectDfa> {
        let Some(mut tree) = SyntaxTree::parse(tokens, &mut self.positions)? else {
            debug!("pattern {}: no syntax tree", pattern_name);
            return Ok(DirectDfa {
                dfa: DFA::new(),
                tree: None,
                positions: self.positions,
            });
        };

        tree.compute_attributes()?;
        tree.compute_followpos(&mut self.positions)?;

        let dfa = explore(&tree, &self.positions, pattern_name)?;
        debug!(
            "pattern {}: {} positions, {} states, {} accepting",
            pattern_name,
            self.positions.len(),
            dfa.num_states(),
            dfa.accept_states().count()
        );

        Ok(DirectDfa {
            dfa,
            tree: Some(tree),
            positions: self.positions,
        })
    }
}

/// Worklist over position sets, starting from `firstpos(root)`.
fn explore(tree: &SyntaxTree, positions: &Positions, pattern_name: &str) -> Result<DFA> {
    let root = tree.root().attributes()?;
    let alphabet = positions.alphabet();
    let mut dfa = DFA::new();

    if root.firstpos.is_empty() {
        let label = if root.nullable {
            StateLabel::EpsilonOnly
        } else {
            StateLabel::EmptyLanguage
        };
        let start = dfa.state_id_for(label);
        dfa.set_start_state(start);
        if root.nullable {
            dfa.set_accept(start, pattern_name);
        }
        dfa.set_alphabet(alphabet);
        return Ok(dfa);
    }

    let end_marker = positions
        .find_symbol(Symbol::EndMarker)
        .ok_or(RegexError::Lookup(Symbol::EndMarker))?;

    let start_set: BTreeSet<PositionId> = root.firstpos.iter().copied().collect();
    let start = dfa.state_id_for(StateLabel::Positions(start_set.clone()));
    dfa.set_start_state(start);
    dfa.set_alphabet(alphabet.clone());

    let mut unmarked = VecDeque::from([(start, start_set)]);
    let mut processed = BTreeSet::new();

    while let Some((source, current)) = unmarked.pop_front() {
        if !processed.insert(source) {
            continue;
        }

        if current.contains(&end_marker) {
            dfa.set_accept(source, pattern_name);
        }

        for symbol in alphabet.iter().copied() {
            let target: BTreeSet<PositionId> = current
                .iter()
                .filter(|p| positions.symbol(**p) == Some(Symbol::Char(symbol)))
                .filter_map(|p| positions.followpos(*p))
                .flatten()
                .copied()
                .collect();

            if target.is_empty() {
                continue;
            }

            let label = StateLabel::Positions(target);
            let target_id = match dfa.state_id(&label) {
                Some(id) => id,
                None => {
                    let id = dfa.state_id_for(label.clone());
                    if let StateLabel::Positions(set) = label {
                        debug!("new state {} for {:?}", id, set);
                        unmarked.push_back((id, set));
                    }
                    id
                }
            };

            trace!("{} --{}--> {}", source, symbol, target_id);
            dfa.add_transition(source, symbol, target_id);
        }
    }

    Ok(dfa)
}

#[cfg(test)]
mod tests {
    use quickcheck::{Arbitrary, Gen, QuickCheck};

    use super::*;
    use crate::error::SyntaxError;

    fn accepts(dfa: &DFA, input: &str) -> bool {
        let Some(mut state) = dfa.start_state() else {
            return false;
        };
        for c in input.chars() {
            match dfa.move_c(state, c) {
                Some(next) => state = next,
                None => return false,
            }
        }
        dfa.is_accepting(state)
    }

    fn build(regex: &str) -> DFA {
        DFA::from_regex(regex, "test").unwrap()
    }

    #[test]
    fn single_literal() {
        let dfa = build("a");
        let start = dfa.start_state().unwrap();
        let next = dfa.move_c(start, 'a').unwrap();

        assert_eq!(dfa.num_states(), 2);
        assert!(!dfa.is_accepting(start));
        assert!(dfa.is_accepting(next));
        assert_eq!(dfa.transitions().count(), 1);
        assert_eq!(dfa.alphabet(), &BTreeSet::from(['a']));
    }

    #[test]
    fn union_shares_the_accepting_state() {
        let dfa = build("a|b");
        let start = dfa.start_state().unwrap();
        let on_a = dfa.move_c(start, 'a').unwrap();
        let on_b = dfa.move_c(start, 'b').unwrap();

        assert_eq!(on_a, on_b);
        assert!(dfa.is_accepting(on_a));
        assert_eq!(dfa.accept_states().count(), 1);
        assert_eq!(dfa.alphabet(), &BTreeSet::from(['a', 'b']));
    }

    #[test]
    fn star_loops_on_an_accepting_start() {
        let dfa = build("a*");
        let start = dfa.start_state().unwrap();

        assert!(dfa.is_accepting(start));
        assert_eq!(dfa.move_c(start, 'a'), Some(start));
        assert_eq!(dfa.num_states(), 1);
    }

    #[test]
    fn empty_regex_accepts_only_the_empty_string() {
        let built = DirectBuilder::new().build("", "empty").unwrap();
        let dfa = &built.dfa;
        let start = dfa.start_state().unwrap();

        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.label(start), Some(&StateLabel::EpsilonOnly));
        assert!(dfa.is_accepting(start));
        assert_eq!(dfa.transitions().count(), 0);
        assert!(dfa.alphabet().is_empty());
        assert!(built.tree.is_none());
    }

    #[test]
    fn concat_chain() {
        let dfa = build("ab");
        let start = dfa.start_state().unwrap();
        let after_a = dfa.move_c(start, 'a').unwrap();
        let after_ab = dfa.move_c(after_a, 'b').unwrap();

        assert_eq!(dfa.num_states(), 3);
        assert!(!dfa.is_accepting(start));
        assert!(!dfa.is_accepting(after_a));
        assert!(dfa.is_accepting(after_ab));
        assert_eq!(dfa.move_c(start, 'b'), None);
        assert!(!accepts(&dfa, "a"));
        assert!(!accepts(&dfa, "ba"));
        assert!(accepts(&dfa, "ab"));
    }

    #[test]
    fn textbook_golden_fixture() {
        let built = DirectBuilder::new().build("(a|b)*abb", "golden").unwrap();
        let dfa = &built.dfa;

        let states: Vec<StateLabel> = (0..dfa.num_states())
            .map(|s| dfa.label(s).unwrap().clone())
            .collect();
        let expected: Vec<StateLabel> = [
            vec![1, 2, 3],
            vec![1, 2, 3, 4],
            vec![1, 2, 3, 5],
            vec![1, 2, 3, 6],
        ]
        .into_iter()
        .map(|ids| StateLabel::Positions(ids.into_iter().map(PositionId::new).collect()))
        .collect();

        assert_eq!(states, expected);
        assert_eq!(dfa.alphabet(), &BTreeSet::from(['a', 'b']));
        assert_eq!(dfa.accept_states().collect::<Vec<_>>(), vec![3]);
        assert_eq!(
            dfa.transitions().collect::<Vec<_>>(),
            vec![
                (0, 'a', 1),
                (0, 'b', 0),
                (1, 'a', 1),
                (1, 'b', 2),
                (2, 'a', 1),
                (2, 'b', 3),
                (3, 'a', 1),
                (3, 'b', 0),
            ]
        );
    }

    #[test]
    fn accept_marks_carry_the_pattern_name() {
        let mut dfa = DFA::from_regex("if", "keyword").unwrap();
        let accepting: Vec<usize> = dfa.accept_states().collect();

        dfa.set_accept(accepting[0], "identifier");

        assert_eq!(
            dfa.accept_names(accepting[0]),
            Some(&BTreeSet::from([
                "identifier".to_string(),
                "keyword".to_string()
            ]))
        );
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let first = DirectBuilder::new().build("(a|b)*a(a|b)*", "p").unwrap();
        let second = DirectBuilder::with_positions(first.positions.clone())
            .build("(a|b)*a(a|b)*", "p")
            .unwrap();
        let fresh = DFA::from_regex("(a|b)*a(a|b)*", "p").unwrap();

        assert_eq!(first.dfa, second.dfa);
        assert_eq!(first.dfa, fresh);
        assert_eq!(first.positions, second.positions);
    }

    #[test]
    fn position_count_ignores_epsilon() {
        let built = DirectBuilder::new().build("aε|bε*", "p").unwrap();

        assert_eq!(built.positions.len(), 3);
        assert_eq!(built.positions.alphabet(), BTreeSet::from(['a', 'b']));
    }

    #[test]
    fn epsilon_alone_matches_the_empty_string() {
        let dfa = build("ε");

        assert!(accepts(&dfa, ""));
        assert!(!accepts(&dfa, "a"));
        assert_eq!(dfa.num_states(), 1);
    }

    #[test]
    fn unaugmented_epsilon_stream_is_epsilon_only() {
        let built = DirectBuilder::new()
            .build_tokens(&[RegexToken::Epsilon], "eps")
            .unwrap();
        let start = built.dfa.start_state().unwrap();

        assert_eq!(built.dfa.label(start), Some(&StateLabel::EpsilonOnly));
        assert!(built.dfa.is_accepting(start));
        assert!(built.positions.is_empty());
    }

    #[test]
    fn empty_token_stream_has_no_start_state() {
        let built = DirectBuilder::new().build_tokens(&[], "none").unwrap();

        assert_eq!(built.dfa.start_state(), None);
        assert_eq!(built.dfa.accept_states().count(), 0);
        assert!(built.tree.is_none());
    }

    #[test]
    fn missing_end_marker_is_a_lookup_error() {
        let err = DirectBuilder::new()
            .build_tokens(&[RegexToken::Literal('a')], "p")
            .unwrap_err();

        assert_eq!(err, RegexError::Lookup(Symbol::EndMarker));
        assert!(err.is_fatal());
    }

    #[test]
    fn errors_abort_only_the_failing_pattern() {
        assert_eq!(
            DFA::from_regex("a+", "p").unwrap_err(),
            RegexError::UnsupportedOperator {
                operator: '+',
                token_index: 2
            }
        );
        assert_eq!(
            DFA::from_regex("(ab", "p").unwrap_err(),
            RegexError::Syntax(SyntaxError::UnclosedOpenParen)
        );
        assert!(!DFA::from_regex("(ab", "p").unwrap_err().is_fatal());

        let dfa = build("aa*");
        assert!(accepts(&dfa, "a"));
        assert!(accepts(&dfa, "aaa"));
        assert!(!accepts(&dfa, ""));
    }

    #[test]
    fn hash_in_the_pattern_is_not_the_end_marker() {
        let dfa = build("a#");

        assert!(accepts(&dfa, "a#"));
        assert!(!accepts(&dfa, "a"));
        assert_eq!(dfa.alphabet(), &BTreeSet::from(['#', 'a']));
    }

    #[test]
    fn star_of_grouped_union() {
        let dfa = build("((a*|b)c)*");

        assert!(accepts(&dfa, ""));
        assert!(accepts(&dfa, "bc"));
        assert!(accepts(&dfa, "aaaac"));
        assert!(accepts(&dfa, "aaaacbc"));
        assert!(!accepts(&dfa, "aa"));
    }

    #[test]
    fn star_binds_tighter_than_concat() {
        let dfa = build("ab*c");

        assert!(accepts(&dfa, "ac"));
        assert!(accepts(&dfa, "abc"));
        assert!(accepts(&dfa, "abbbc"));
        assert!(!accepts(&dfa, "a"));
        assert!(!accepts(&dfa, "c"));
        assert!(!accepts(&dfa, "ab"));
        assert!(!accepts(&dfa, "bc"));
    }

    #[test]
    fn concat_with_group_union() {
        let dfa = build("a(b|c)d");

        assert!(accepts(&dfa, "abd"));
        assert!(accepts(&dfa, "acd"));
        assert!(!accepts(&dfa, "ad"));
        assert!(!accepts(&dfa, "abcd"));
    }

    #[test]
    fn nested_star() {
        let dfa = build("(a*)*");

        assert!(accepts(&dfa, ""));
        assert!(accepts(&dfa, "a"));
        assert!(accepts(&dfa, "aa"));
        assert!(!accepts(&dfa, "b"));
    }

    #[test]
    fn contains_at_least_one_a() {
        let dfa = build("(a|b)*a(a|b)*");

        for input in ["a", "aa", "ab", "ba", "bab", "bbaabb"] {
            assert!(accepts(&dfa, input), "{}", input);
        }
        for input in ["", "b", "bb", "bbbb"] {
            assert!(!accepts(&dfa, input), "{}", input);
        }
    }

    #[test]
    fn long_concatenation_compiles() {
        let pattern = "a".repeat(100_000);
        let built = DirectBuilder::new().build(&pattern, "long").unwrap();

        assert_eq!(built.positions.len(), 100_001);
        assert_eq!(built.dfa.num_states(), 100_001);
        assert!(accepts(&built.dfa, &pattern));
        assert!(!accepts(&built.dfa, &pattern[1..]));
        assert!(built.tree.unwrap().root().attributes().is_ok());
    }

    #[test]
    fn long_keyword_union_compiles() {
        let keywords: Vec<String> = (0..2_000).map(|i| format!("k{}", i)).collect();
        let dfa = build(&keywords.join("|"));

        assert!(accepts(&dfa, "k0"));
        assert!(accepts(&dfa, "k10"));
        assert!(accepts(&dfa, "k1999"));
        assert!(!accepts(&dfa, "k"));
        assert!(!accepts(&dfa, "k2000"));
        assert!(!accepts(&dfa, "k01"));
    }

    #[test]
    fn long_star_chain_compiles() {
        let pattern = format!("a{}", "*".repeat(50_000));
        let dfa = build(&pattern);
        let start = dfa.start_state().unwrap();

        assert_eq!(dfa.num_states(), 1);
        assert!(dfa.is_accepting(start));
        assert_eq!(dfa.move_c(start, 'a'), Some(start));
    }

    /// Reference regex with a brute-force matcher, used as an oracle.
    #[derive(Debug, Clone)]
    enum Re {
        Lit(char),
        Eps,
        Cat(Box<Re>, Box<Re>),
        Alt(Box<Re>, Box<Re>),
        Star(Box<Re>),
    }

    impl Re {
        fn render(&self) -> String {
            match self {
                Re::Lit(c) => c.to_string(),
                Re::Eps => "ε".to_string(),
                Re::Cat(a, b) => format!("({})({})", a.render(), b.render()),
                Re::Alt(a, b) => format!("({}|{})", a.render(), b.render()),
                Re::Star(a) => format!("({})*", a.render()),
            }
        }

        /// Every index at which a match starting at `start` can end.
        fn ends(&self, input: &[char], start: usize) -> BTreeSet<usize> {
            match self {
                Re::Lit(c) => {
                    if input.get(start) == Some(c) {
                        BTreeSet::from([start + 1])
                    } else {
                        BTreeSet::new()
                    }
                }
                Re::Eps => BTreeSet::from([start]),
                Re::Cat(a, b) => a
                    .ends(input, start)
                    .into_iter()
                    .flat_map(|middle| b.ends(input, middle))
                    .collect(),
                Re::Alt(a, b) => {
                    let mut ends = a.ends(input, start);
                    ends.extend(b.ends(input, start));
                    ends
                }
                Re::Star(a) => {
                    let mut reached = BTreeSet::from([start]);
                    let mut frontier = vec![start];
                    while let Some(i) = frontier.pop() {
                        for j in a.ends(input, i) {
                            if reached.insert(j) {
                                frontier.push(j);
                            }
                        }
                    }
                    reached
                }
            }
        }

        fn matches(&self, input: &str) -> bool {
            let chars: Vec<char> = input.chars().collect();
            self.ends(&chars, 0).contains(&chars.len())
        }
    }

    fn arbitrary_re(g: &mut Gen, depth: usize) -> Re {
        let choices: &[u8] = if depth == 0 { &[0, 0, 1] } else { &[0, 0, 1, 2, 3, 4] };
        match *g.choose(choices).unwrap() {
            0 => Re::Lit(*g.choose(&['a', 'b']).unwrap()),
            1 => Re::Eps,
            2 => Re::Cat(
                Box::new(arbitrary_re(g, depth - 1)),
                Box::new(arbitrary_re(g, depth - 1)),
            ),
            3 => Re::Alt(
                Box::new(arbitrary_re(g, depth - 1)),
                Box::new(arbitrary_re(g, depth - 1)),
            ),
            _ => Re::Star(Box::new(arbitrary_re(g, depth - 1))),
        }
    }

    impl Arbitrary for Re {
        fn arbitrary(g: &mut Gen) -> Self {
            arbitrary_re(g, 4)
        }
    }

    fn strings_up_to(len: usize) -> Vec<String> {
        let mut all = vec![String::new()];
        let mut layer = vec![String::new()];
        for _ in 0..len {
            layer = layer
                .iter()
                .flat_map(|s| [format!("{}a", s), format!("{}b", s)])
                .collect();
            all.extend(layer.iter().cloned());
        }
        all
    }

    fn agrees_with_backtracking(re: Re) -> bool {
        let dfa = match DFA::from_regex(&re.render(), "oracle") {
            Ok(dfa) => dfa,
            Err(_) => return false,
        };
        strings_up_to(5)
            .iter()
            .all(|input| accepts(&dfa, input) == re.matches(input))
    }

    #[test]
    fn agrees_with_backtracking_reference() {
        QuickCheck::new()
            .tests(200)
            .quickcheck(agrees_with_backtracking as fn(Re) -> bool);
    }
}
