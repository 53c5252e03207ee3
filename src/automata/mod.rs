//! Regex to DFA compilation by the followpos construction.
//!
//! The pipeline runs in one direction: tokens from [`augment`] feed the
//! tree builder, the attribute pass fills `nullable`, `firstpos` and
//! `lastpos`, the followpos pass links positions, and the worklist in
//! [`DirectBuilder`] turns position sets into DFA states.

mod attributes;
mod dfa;
mod direct;
mod followpos;
mod positions;
mod shunting_yard;
mod syntax_tree;

pub use attributes::{Attributes, PositionSet};
pub use dfa::{DFA, StateLabel};
pub use direct::{DirectBuilder, DirectDfa};
pub use positions::{Position, PositionId, Positions, Symbol};
pub use shunting_yard::{EPSILON, RegexToken, augment, explicit_concat, tokenize};
pub use syntax_tree::{NodeKind, SyntaxNode, SyntaxTree};

use crate::error::Result;

/// Compiles `regex` with a fresh position numbering, keeping the annotated
/// tree and the followpos table next to the automaton.
pub fn regex_to_direct_dfa(regex: &str, pattern_name: &str) -> Result<DirectDfa> {
    DirectBuilder::new().build(regex, pattern_name)
}
