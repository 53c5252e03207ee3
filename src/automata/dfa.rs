use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    automata::{direct::DirectBuilder, positions::PositionId, syntax_tree::format_set},
    error::Result,
};

/// The value a DFA state is identified by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StateLabel {
    /// A set of positions, compared by value.
    Positions(BTreeSet<PositionId>),
    /// Single state of an automaton whose language is exactly the empty string.
    EpsilonOnly,
    /// Single state of an automaton whose language is empty.
    EmptyLanguage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LabeledArrow {
    label: char,
    target: usize,
}

impl LabeledArrow {
    fn to_graphviz(&self, source: usize) -> String {
        format!(
            "{} -> {} [label=\"{}\"]",
            source,
            self.target,
            escape_label(self.label)
        )
    }

    fn move_c(&self, char: char) -> Option<usize> {
        if self.label == char {
            Some(self.target)
        } else {
            None
        }
    }
}

fn escape_label(label: char) -> String {
    match label {
        '"' => "\\\"".to_string(),
        '\\' => "\\\\".to_string(),
        c => c.to_string(),
    }
}

/// Deterministic finite automaton whose states are identified by
/// [`StateLabel`]s.
///
/// Missing transitions reject; no dead state is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DFA {
    /// Table of transitions, each row represents a state.
    table: Vec<Vec<LabeledArrow>>,
    labels: Vec<StateLabel>,
    ids: BTreeMap<StateLabel, usize>,
    start_state: Option<usize>,
    /// Accepting states and the names of the patterns they accept.
    final_states: BTreeMap<usize, BTreeSet<String>>,
    alphabet: BTreeSet<char>,
}

impl DFA {
    pub fn new() -> Self {
        DFA::default()
    }

    /// Builds the automaton for a single expanded regex.
    pub fn from_regex(regex: &str, pattern_name: &str) -> Result<Self> {
        Ok(DirectBuilder::new().build(regex, pattern_name)?.dfa)
    }

    /// Id of the state labeled `label`, if there is one.
    pub fn state_id(&self, label: &StateLabel) -> Option<usize> {
        self.ids.get(label).copied()
    }

    /// Id of the state labeled `label`, allocating a new state the first
    /// time a label is seen.
    pub fn state_id_for(&mut self, label: StateLabel) -> usize {
        if let Some(id) = self.state_id(&label) {
            return id;
        }

        let id = self.labels.len();
        self.labels.push(label.clone());
        self.table.push(Vec::new());
        self.ids.insert(label, id);
        id
    }

    /// Marks `state` as accepting `pattern_name`. A state may accept several
    /// patterns; repeating a call has no effect.
    pub fn set_accept(&mut self, state: usize, pattern_name: &str) {
        if state >= self.labels.len() {
            warn!("ignoring accept mark for unknown state {}", state);
            return;
        }
        self.final_states
            .entry(state)
            .or_default()
            .insert(pattern_name.to_string());
    }

    /// Adds `from --symbol--> to`, replacing any earlier transition of `from`
    /// on the same symbol.
    pub fn add_transition(&mut self, from: usize, symbol: char, to: usize) {
        if to >= self.labels.len() {
            warn!("ignoring transition to unknown state {}", to);
            return;
        }
        let Some(row) = self.table.get_mut(from) else {
            warn!("ignoring transition from unknown state {}", from);
            return;
        };

        match row.iter_mut().find(|arrow| arrow.label == symbol) {
            Some(arrow) => arrow.target = to,
            None => row.push(LabeledArrow {
                label: symbol,
                target: to,
            }),
        }
    }

    pub fn start_state(&self) -> Option<usize> {
        self.start_state
    }

    pub fn set_start_state(&mut self, state: usize) {
        self.start_state = Some(state);
    }

    pub fn alphabet(&self) -> &BTreeSet<char> {
        &self.alphabet
    }

    pub fn set_alphabet(&mut self, alphabet: BTreeSet<char>) {
        self.alphabet = alphabet;
    }

    pub fn num_states(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, state: usize) -> Option<&StateLabel> {
        self.labels.get(state)
    }

    pub fn is_accepting(&self, state: usize) -> bool {
        self.final_states.contains_key(&state)
    }

    pub fn accept_names(&self, state: usize) -> Option<&BTreeSet<String>> {
        self.final_states.get(&state)
    }

    pub fn accept_states(&self) -> impl Iterator<Item = usize> + '_ {
        self.final_states.keys().copied()
    }

    /// Target of the transition leaving `state` on `char`.
    pub fn move_c(&self, state: usize, char: char) -> Option<usize> {
        self.table.get(state)?.iter().find_map(|a| a.move_c(char))
    }

    /// All transitions as `(from, symbol, to)`, in insertion order per state.
    pub fn transitions(&self) -> impl Iterator<Item = (usize, char, usize)> + '_ {
        self.table
            .iter()
            .enumerate()
            .flat_map(|(source, row)| row.iter().map(move |a| (source, a.label, a.target)))
    }

    pub fn to_graphviz(&self) -> String {
        let preamble = r#"digraph {
rankdir = LR;
ranksep = .75;
    node [shape=circle style=filled]
    start [shape=none, label="start", style=""]"#;

        let mut lines = vec![preamble.to_string()];

        lines.extend(self.labels.iter().enumerate().map(|(state, label)| {
            let shape = if self.is_accepting(state) {
                "doublecircle"
            } else {
                "circle"
            };
            format!(
                "{} [shape={} tooltip=\"{}\"]",
                state,
                shape,
                describe(label)
            )
        }));

        if let Some(start) = self.start_state {
            lines.push(format!("start->{}", start));
        }

        lines.extend(
            self.table
                .iter()
                .enumerate()
                .flat_map(|(source, row)| row.iter().map(move |a| a.to_graphviz(source))),
        );

        lines.push("}".to_string());
        lines.join("\n")
    }
}

fn describe(label: &StateLabel) -> String {
    match label {
        StateLabel::Positions(set) => format_set(set),
        StateLabel::EpsilonOnly => "epsilon".to_string(),
        StateLabel::EmptyLanguage => "empty".to_string(),
    }
}
