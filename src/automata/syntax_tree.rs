use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
    mem,
};

use crate::{
    automata::{
        attributes::Attributes,
        positions::{PositionId, Positions, Symbol},
        shunting_yard::RegexToken,
    },
    error::{RegexError, Result, SyntaxError},
};

#[derive(Debug, PartialEq, Eq)]
pub enum NodeKind {
    Literal {
        position: PositionId,
        symbol: Symbol,
    },
    Epsilon,
    Concat(Box<SyntaxNode>, Box<SyntaxNode>),
    Union(Box<SyntaxNode>, Box<SyntaxNode>),
    Star(Box<SyntaxNode>),
}

/// A node of the augmented syntax tree. Attributes stay empty until the
/// attribute pass runs.
#[derive(Debug, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub(crate) attributes: Option<Attributes>,
}

impl SyntaxNode {
    pub(crate) fn new(kind: NodeKind) -> Self {
        SyntaxNode {
            kind,
            attributes: None,
        }
    }

    pub fn attributes(&self) -> Result<&Attributes> {
        self.attributes.as_ref().ok_or(RegexError::StructuralInvariant(
            "node attributes read before the attribute pass",
        ))
    }

    /// One line of the tree dump, without indentation or children.
    fn fmt_line(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Literal {
                position,
                symbol: Symbol::Char(c),
            } => write!(f, "Literal '{}' @{}", c, position)?,
            NodeKind::Literal {
                position,
                symbol: Symbol::EndMarker,
            } => write!(f, "EndMarker @{}", position)?,
            NodeKind::Epsilon => write!(f, "Epsilon")?,
            NodeKind::Concat(..) => write!(f, "Concat")?,
            NodeKind::Union(..) => write!(f, "Union")?,
            NodeKind::Star(..) => write!(f, "Star")?,
        }
        if let Some(attributes) = &self.attributes {
            write!(
                f,
                " nullable={} firstpos={} lastpos={}",
                attributes.nullable,
                format_set(&attributes.firstpos),
                format_set(&attributes.lastpos)
            )?;
        }
        writeln!(f)
    }
}

/// Takes a subtree apart node by node so dropping it never recurses.
fn dismantle(node: SyntaxNode) {
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        match node.kind {
            NodeKind::Concat(left, right) | NodeKind::Union(left, right) => {
                pending.extend([*left, *right]);
            }
            NodeKind::Star(child) => pending.push(*child),
            NodeKind::Literal { .. } | NodeKind::Epsilon => {}
        }
    }
}

pub(crate) fn format_set(set: &BTreeSet<PositionId>) -> String {
    let ids: Vec<String> = set.iter().map(|p| p.to_string()).collect();
    format!("{{{}}}", ids.join(", "))
}

/// Augmented syntax tree of one pattern.
///
/// Every walk over the tree, dropping included, keeps its own stack, so
/// pattern length is bounded by memory rather than by the call stack.
#[derive(Debug, PartialEq, Eq)]
pub struct SyntaxTree {
    pub(crate) root: SyntaxNode,
}

impl SyntaxTree {
    /// Builds the tree from a preprocessed token stream, allocating one
    /// position per literal and end marker.
    ///
    /// Returns `Ok(None)` for an empty stream. Errors locate the offending
    /// token by its index in `tokens`.
    pub fn parse(tokens: &[RegexToken], positions: &mut Positions) -> Result<Option<SyntaxTree>> {
        if tokens.is_empty() {
            return Ok(None);
        }

        let mut builder = TreeBuilder::new();
        for (token_index, token) in tokens.iter().enumerate() {
            builder.consume(*token, token_index, positions)?;
        }
        builder.finish().map(Some)
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }
}

impl Display for SyntaxTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut pending = vec![(&self.root, 0)];

        while let Some((node, depth)) = pending.pop() {
            write!(f, "{:indent$}", "", indent = depth * 2)?;
            node.fmt_line(f)?;
            match &node.kind {
                NodeKind::Concat(left, right) | NodeKind::Union(left, right) => {
                    pending.extend([(&**right, depth + 1), (&**left, depth + 1)]);
                }
                NodeKind::Star(child) => pending.push((&**child, depth + 1)),
                NodeKind::Literal { .. } | NodeKind::Epsilon => {}
            }
        }
        Ok(())
    }
}

impl Drop for SyntaxTree {
    fn drop(&mut self) {
        dismantle(mem::replace(&mut self.root, SyntaxNode::new(NodeKind::Epsilon)));
    }
}

/// Two-stack operator precedence parser producing tree nodes instead of
/// postfix output.
#[derive(Debug)]
struct TreeBuilder {
    operands: Vec<SyntaxNode>,
    operators: Vec<RegexToken>,
}

impl TreeBuilder {
    fn new() -> Self {
        TreeBuilder {
            operands: Vec::new(),
            operators: Vec::new(),
        }
    }

    fn consume(
        &mut self,
        token: RegexToken,
        token_index: usize,
        positions: &mut Positions,
    ) -> Result<()> {
        match token {
            RegexToken::Literal(c) => {
                let symbol = Symbol::Char(c);
                let position = positions.alloc(symbol);
                self.operands
                    .push(SyntaxNode::new(NodeKind::Literal { position, symbol }));
            }
            RegexToken::EndMarker => {
                let symbol = Symbol::EndMarker;
                let position = positions.alloc(symbol);
                self.operands
                    .push(SyntaxNode::new(NodeKind::Literal { position, symbol }));
            }
            RegexToken::Epsilon => self.operands.push(SyntaxNode::new(NodeKind::Epsilon)),
            RegexToken::OpenParen => self.operators.push(token),
            RegexToken::CloseParen => loop {
                match self.operators.pop() {
                    Some(RegexToken::OpenParen) => break,
                    Some(operator) => self.reduce(operator)?,
                    None => return Err(SyntaxError::UnmatchedCloseParen { token_index }.into()),
                }
            },
            RegexToken::Star | RegexToken::Concat | RegexToken::Union => {
                while let Some(top) = self.operators.last() {
                    if *top == RegexToken::OpenParen || top.precedence() < token.precedence() {
                        break;
                    }
                    let operator = *top;
                    self.operators.pop();
                    self.reduce(operator)?;
                }
                self.operators.push(token);
            }
            RegexToken::PositiveClosure | RegexToken::Optional => {
                return Err(RegexError::UnsupportedOperator {
                    operator: token.as_char(),
                    token_index,
                });
            }
        }
        Ok(())
    }

    /// Pops the operands of `operator` and pushes the combined node.
    fn reduce(&mut self, operator: RegexToken) -> Result<()> {
        let missing = SyntaxError::MissingOperand {
            operator: operator.as_char(),
        };

        let node = match operator {
            RegexToken::Star => {
                let child = self.operands.pop().ok_or(missing)?;
                NodeKind::Star(Box::new(child))
            }
            RegexToken::Concat | RegexToken::Union => {
                let Some(right) = self.operands.pop() else {
                    return Err(missing.into());
                };
                let Some(left) = self.operands.pop() else {
                    self.operands.push(right);
                    return Err(missing.into());
                };
                if operator == RegexToken::Concat {
                    NodeKind::Concat(Box::new(left), Box::new(right))
                } else {
                    NodeKind::Union(Box::new(left), Box::new(right))
                }
            }
            _ => {
                return Err(RegexError::StructuralInvariant(
                    "non-operator token on the operator stack",
                ));
            }
        };

        self.operands.push(SyntaxNode::new(node));
        Ok(())
    }

    fn finish(mut self) -> Result<SyntaxTree> {
        while let Some(operator) = self.operators.pop() {
            if operator == RegexToken::OpenParen {
                return Err(SyntaxError::UnclosedOpenParen.into());
            }
            self.reduce(operator)?;
        }

        if self.operands.len() != 1 {
            return Err(SyntaxError::InvalidExpression {
                operands: self.operands.len(),
            }
            .into());
        }
        match self.operands.pop() {
            Some(root) => Ok(SyntaxTree { root }),
            None => Err(SyntaxError::InvalidExpression { operands: 0 }.into()),
        }
    }
}

impl Drop for TreeBuilder {
    fn drop(&mut self) {
        for node in self.operands.drain(..) {
            dismantle(node);
        }
    }
}
