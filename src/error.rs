use crate::automata::Symbol;

/// Malformed input to the syntax tree builder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// `offset` is the character index in the pattern.
    #[error("unknown token '{token}' at offset {offset}")]
    UnknownToken { token: char, offset: usize },

    /// `token_index` counts tokens of the augmented stream, not characters.
    #[error("mismatched parentheses: no '(' for the ')' at token index {token_index}")]
    UnmatchedCloseParen { token_index: usize },

    #[error("mismatched parentheses: '(' left open")]
    UnclosedOpenParen,

    #[error("not enough operands for '{operator}'")]
    MissingOperand { operator: char },

    /// The final reduction did not leave exactly one operand.
    #[error("invalid expression: {operands} operands left after parsing")]
    InvalidExpression { operands: usize },
}

/// Errors that abort the compilation of a single pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegexError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// `+` or `?` reached the tree builder; they must be expanded upstream.
    /// `token_index` counts tokens of the augmented stream, not characters.
    #[error(
        "operator '{operator}' at token index {token_index} must be expanded before building the syntax tree"
    )]
    UnsupportedOperator { operator: char, token_index: usize },

    #[error("syntax tree invariant violated: {0}")]
    StructuralInvariant(&'static str),

    #[error("no position found for {0}")]
    Lookup(Symbol),
}

impl RegexError {
    /// Fatal errors point at a defect in the builder rather than in the pattern.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RegexError::StructuralInvariant(_) | RegexError::Lookup(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RegexError>;
