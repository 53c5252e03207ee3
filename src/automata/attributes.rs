use std::{collections::BTreeSet, mem, sync::Arc};

use crate::{
    automata::{
        positions::PositionId,
        syntax_tree::{NodeKind, SyntaxNode, SyntaxTree},
    },
    error::{RegexError, Result},
};

/// Immutable, shared set of positions.
///
/// Star nodes and the non-nullable side of a concatenation hand their
/// child's set up by reference count instead of copying it. Nothing mutates
/// these sets once the attribute pass is done.
pub type PositionSet = Arc<BTreeSet<PositionId>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    pub nullable: bool,
    pub firstpos: PositionSet,
    pub lastpos: PositionSet,
}

impl SyntaxTree {
    /// Computes `nullable`, `firstpos` and `lastpos` for every node, bottom up.
    pub fn compute_attributes(&mut self) -> Result<()> {
        let root = mem::replace(&mut self.root, SyntaxNode::new(NodeKind::Epsilon));
        self.root = annotate(root)?;
        Ok(())
    }
}

fn union(left: &PositionSet, right: &PositionSet) -> PositionSet {
    Arc::new(left.union(right).copied().collect())
}

/// Annotates a literal or epsilon leaf.
fn leaf(kind: NodeKind) -> SyntaxNode {
    let attributes = match &kind {
        NodeKind::Literal { position, .. } => {
            let only = Arc::new(BTreeSet::from([*position]));
            Attributes {
                nullable: false,
                firstpos: Arc::clone(&only),
                lastpos: only,
            }
        }
        _ => {
            let empty = Arc::new(BTreeSet::new());
            Attributes {
                nullable: true,
                firstpos: Arc::clone(&empty),
                lastpos: empty,
            }
        }
    };
    SyntaxNode {
        kind,
        attributes: Some(attributes),
    }
}

fn concat(left: SyntaxNode, right: SyntaxNode) -> Result<SyntaxNode> {
    let (l, r) = (left.attributes()?, right.attributes()?);
    let attributes = Attributes {
        nullable: l.nullable && r.nullable,
        firstpos: if l.nullable {
            union(&l.firstpos, &r.firstpos)
        } else {
            Arc::clone(&l.firstpos)
        },
        lastpos: if r.nullable {
            union(&r.lastpos, &l.lastpos)
        } else {
            Arc::clone(&r.lastpos)
        },
    };
    Ok(SyntaxNode {
        kind: NodeKind::Concat(Box::new(left), Box::new(right)),
        attributes: Some(attributes),
    })
}

fn alternate(left: SyntaxNode, right: SyntaxNode) -> Result<SyntaxNode> {
    let (l, r) = (left.attributes()?, right.attributes()?);
    let attributes = Attributes {
        nullable: l.nullable || r.nullable,
        firstpos: union(&l.firstpos, &r.firstpos),
        lastpos: union(&l.lastpos, &r.lastpos),
    };
    Ok(SyntaxNode {
        kind: NodeKind::Union(Box::new(left), Box::new(right)),
        attributes: Some(attributes),
    })
}

fn star(child: SyntaxNode) -> Result<SyntaxNode> {
    let c = child.attributes()?;
    let attributes = Attributes {
        nullable: true,
        firstpos: Arc::clone(&c.firstpos),
        lastpos: Arc::clone(&c.lastpos),
    };
    Ok(SyntaxNode {
        kind: NodeKind::Star(Box::new(child)),
        attributes: Some(attributes),
    })
}

/// Work item of the post-order walk: a subtree still to take apart, or an
/// operator waiting for its annotated children on the `done` stack.
enum Step {
    Visit(SyntaxNode),
    Concat,
    Union,
    Star,
}

/// Post-order walk over an explicit stack. Each node is taken apart on the
/// way down and rebuilt with its attributes on the way up, so tree depth
/// never reaches the call stack.
fn annotate(root: SyntaxNode) -> Result<SyntaxNode> {
    let mut pending = vec![Step::Visit(root)];
    let mut done: Vec<SyntaxNode> = Vec::new();

    let missing = || RegexError::StructuralInvariant("operator rebuilt without its children");

    while let Some(step) = pending.pop() {
        let node = match step {
            Step::Visit(node) => match node.kind {
                NodeKind::Concat(left, right) => {
                    pending.extend([Step::Concat, Step::Visit(*right), Step::Visit(*left)]);
                    continue;
                }
                NodeKind::Union(left, right) => {
                    pending.extend([Step::Union, Step::Visit(*right), Step::Visit(*left)]);
                    continue;
                }
                NodeKind::Star(child) => {
                    pending.extend([Step::Star, Step::Visit(*child)]);
                    continue;
                }
                kind => leaf(kind),
            },
            Step::Concat => {
                let right = done.pop().ok_or_else(missing)?;
                let left = done.pop().ok_or_else(missing)?;
                concat(left, right)?
            }
            Step::Union => {
                let right = done.pop().ok_or_else(missing)?;
                let left = done.pop().ok_or_else(missing)?;
                alternate(left, right)?
            }
            Step::Star => star(done.pop().ok_or_else(missing)?)?,
        };
        done.push(node);
    }

    match (done.pop(), done.is_empty()) {
        (Some(root), true) => Ok(root),
        _ => Err(RegexError::StructuralInvariant(
            "attribute pass did not end with a single root",
        )),
    }
}
