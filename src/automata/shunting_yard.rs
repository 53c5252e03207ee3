use crate::error::{Result, SyntaxError};

/// Character used for an explicit empty-string operand.
pub const EPSILON: char = 'ε';

/// Metacharacters of unexpanded regex syntax (classes, counted repetition,
/// wildcard). They must be rewritten or escaped before reaching this stage.
const UNEXPANDED: [char; 5] = ['.', '[', ']', '{', '}'];

/// Represents a token in a preprocessed regular expression.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RegexToken {
    /// The Kleene star operator (`*`), for zero or more repetitions.
    Star,
    /// The positive closure operator (`+`). Only recognised so the tree
    /// builder can reject it.
    PositiveClosure,
    /// The optionality operator (`?`). Rejected by the tree builder as well.
    Optional,
    /// The explicit concatenation operator.
    Concat,
    /// The union operator (`|`).
    Union,
    OpenParen,
    CloseParen,
    /// A literal character.
    Literal(char),
    /// The empty string (`ε`).
    Epsilon,
    /// The synthetic end marker appended during augmentation.
    EndMarker,
}

impl RegexToken {
    /// Checks if the token is an operand (a leaf of the syntax tree).
    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            RegexToken::Literal(_) | RegexToken::Epsilon | RegexToken::EndMarker
        )
    }

    /// Returns the precedence of an operator. Higher numbers bind tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            RegexToken::Star => 3,
            RegexToken::PositiveClosure => 3,
            RegexToken::Optional => 3,
            RegexToken::Concat => 2,
            RegexToken::Union => 1,
            RegexToken::OpenParen => 0,
            RegexToken::CloseParen => 0,
            RegexToken::Literal(_) => 0,
            RegexToken::Epsilon => 0,
            RegexToken::EndMarker => 0,
        }
    }

    /// Printable form, used in error messages.
    pub fn as_char(&self) -> char {
        match self {
            RegexToken::Star => '*',
            RegexToken::PositiveClosure => '+',
            RegexToken::Optional => '?',
            RegexToken::Concat => '·',
            RegexToken::Union => '|',
            RegexToken::OpenParen => '(',
            RegexToken::CloseParen => ')',
            RegexToken::Literal(c) => *c,
            RegexToken::Epsilon => EPSILON,
            RegexToken::EndMarker => '#',
        }
    }

    /// Whether an operand may end right after this token.
    fn ends_operand(&self) -> bool {
        self.is_operand()
            || matches!(
                self,
                RegexToken::CloseParen
                    | RegexToken::Star
                    | RegexToken::PositiveClosure
                    | RegexToken::Optional
            )
    }

    /// Whether an operand may start with this token.
    fn starts_operand(&self) -> bool {
        self.is_operand() || matches!(self, RegexToken::OpenParen)
    }
}

/// Splits a regex into tokens, resolving `\` escapes.
pub fn tokenize(input: &str) -> Result<Vec<RegexToken>> {
    let mut chars = input.chars().enumerate();
    let mut output = Vec::new();

    while let Some((offset, current)) = chars.next() {
        let token = match current {
            '\\' => match chars.next() {
                Some((_, escaped)) => RegexToken::Literal(escaped),
                None => {
                    return Err(SyntaxError::UnknownToken {
                        token: '\\',
                        offset,
                    }
                    .into());
                }
            },
            '*' => RegexToken::Star,
            '+' => RegexToken::PositiveClosure,
            '?' => RegexToken::Optional,
            '|' => RegexToken::Union,
            '(' => RegexToken::OpenParen,
            ')' => RegexToken::CloseParen,
            EPSILON => RegexToken::Epsilon,
            c if UNEXPANDED.contains(&c) => {
                return Err(SyntaxError::UnknownToken { token: c, offset }.into());
            }
            c => RegexToken::Literal(c),
        };
        output.push(token);
    }

    Ok(output)
}

/// Inserts explicit concatenation operators between adjacent operands.
pub fn explicit_concat(tokens: &[RegexToken]) -> Vec<RegexToken> {
    let mut output = Vec::with_capacity(tokens.len() * 2);

    for (i, token) in tokens.iter().enumerate() {
        output.push(*token);
        if let Some(next) = tokens.get(i + 1) {
            if token.ends_operand() && next.starts_operand() {
                output.push(RegexToken::Concat);
            }
        }
    }

    output
}

/// Builds the augmented token stream `(R)#` for `regex`, with explicit
/// concatenation operators.
pub fn augment(regex: &str) -> Result<Vec<RegexToken>> {
    let mut tokens = vec![RegexToken::OpenParen];
    tokens.extend(tokenize(regex)?);
    tokens.push(RegexToken::CloseParen);
    tokens.push(RegexToken::EndMarker);

    Ok(explicit_concat(&tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegexError;
    use RegexToken::*;

    fn concat_of(input: &str) -> Vec<RegexToken> {
        explicit_concat(&tokenize(input).unwrap())
    }

    #[test]
    fn test_or() {
        assert_eq!(concat_of("a|b"), vec![Literal('a'), Union, Literal('b')]);
    }

    #[test]
    fn test_basic_concat() {
        assert_eq!(concat_of("ab"), vec![Literal('a'), Concat, Literal('b')]);
    }

    #[test]
    fn test_basic_concat_after_star() {
        let expected = vec![
            Literal('a'),
            Concat,
            Literal('b'),
            Star,
            Concat,
            Literal('c'),
        ];
        assert_eq!(concat_of("ab*c"), expected);
    }

    #[test]
    fn test_parens() {
        let expected = vec![
            OpenParen,
            Literal('a'),
            CloseParen,
            Concat,
            OpenParen,
            Literal('b'),
            CloseParen,
        ];
        assert_eq!(concat_of("(a)(b)"), expected);
    }

    #[test]
    fn test_parens_after_star() {
        let expected = vec![
            Literal('a'),
            Star,
            Concat,
            OpenParen,
            Literal('b'),
            CloseParen,
        ];
        assert_eq!(concat_of("a*(b)"), expected);
    }

    #[test]
    fn test_epsilon_is_an_operand() {
        let expected = vec![Literal('a'), Concat, Epsilon, Union, Literal('b')];
        assert_eq!(concat_of("aε|b"), expected);
    }

    #[test]
    fn test_quantifiers_pass_through() {
        let expected = vec![
            Literal('a'),
            PositiveClosure,
            Concat,
            Literal('b'),
            Optional,
        ];
        assert_eq!(concat_of("a+b?"), expected);
    }

    #[test]
    fn test_escapes_become_literals() {
        let expected = vec![Literal('*'), Concat, Literal('('), Concat, Literal('\\')];
        assert_eq!(concat_of(r"\*\(\\"), expected);
    }

    #[test]
    fn test_hash_is_an_ordinary_literal() {
        assert_eq!(concat_of("#"), vec![Literal('#')]);
    }

    #[test]
    fn test_unexpanded_metacharacters_are_unknown() {
        assert_eq!(
            tokenize("a[bc]"),
            Err(RegexError::Syntax(SyntaxError::UnknownToken {
                token: '[',
                offset: 1
            }))
        );
        assert_eq!(concat_of(r"\."), vec![Literal('.')]);
    }

    #[test]
    fn test_trailing_backslash() {
        assert_eq!(
            tokenize(r"ab\"),
            Err(RegexError::Syntax(SyntaxError::UnknownToken {
                token: '\\',
                offset: 2
            }))
        );
    }

    #[test]
    fn test_augment_wraps_and_appends_end_marker() {
        let expected = vec![
            OpenParen,
            Literal('a'),
            Union,
            Literal('b'),
            CloseParen,
            Concat,
            EndMarker,
        ];
        assert_eq!(augment("a|b").unwrap(), expected);
        assert_eq!(
            augment("").unwrap(),
            vec![OpenParen, CloseParen, Concat, EndMarker]
        );
    }

    #[test]
    fn test_precedence_order() {
        assert!(Star.precedence() > Concat.precedence());
        assert!(Concat.precedence() > Union.precedence());
        assert!(Union.precedence() > OpenParen.precedence());
    }
}
