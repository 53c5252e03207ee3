mod automata;
mod error;

pub use automata::Attributes;
pub use automata::DFA;
pub use automata::DirectBuilder;
pub use automata::DirectDfa;
pub use automata::EPSILON;
pub use automata::NodeKind;
pub use automata::Position;
pub use automata::PositionId;
pub use automata::PositionSet;
pub use automata::Positions;
pub use automata::RegexToken;
pub use automata::StateLabel;
pub use automata::Symbol;
pub use automata::SyntaxNode;
pub use automata::SyntaxTree;
pub use automata::augment;
pub use automata::explicit_concat;
pub use automata::regex_to_direct_dfa;
pub use automata::tokenize;
pub use error::RegexError;
pub use error::SyntaxError;
