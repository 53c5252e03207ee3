use crate::{
    automata::{
        attributes::PositionSet,
        positions::Positions,
        syntax_tree::{NodeKind, SyntaxTree},
    },
    error::{RegexError, Result},
};

impl SyntaxTree {
    /// Fills the followpos set of every position reachable from the tree.
    ///
    /// Must run after [`SyntaxTree::compute_attributes`].
    pub fn compute_followpos(&self, positions: &mut Positions) -> Result<()> {
        // Links only ever add to sets, so visiting order does not matter.
        let mut pending = vec![&self.root];

        while let Some(node) = pending.pop() {
            match &node.kind {
                NodeKind::Concat(left, right) => {
                    let lastpos = &left.attributes()?.lastpos;
                    let firstpos = &right.attributes()?.firstpos;
                    link(positions, lastpos, firstpos)?;
                    pending.extend([&**left, &**right]);
                }
                NodeKind::Star(child) => {
                    let attributes = child.attributes()?;
                    // Loops back into the child; this is where cycles appear.
                    link(positions, &attributes.lastpos, &attributes.firstpos)?;
                    pending.push(&**child);
                }
                NodeKind::Union(left, right) => pending.extend([&**left, &**right]),
                NodeKind::Literal { .. } | NodeKind::Epsilon => {}
            }
        }
        Ok(())
    }
}

fn link(positions: &mut Positions, from: &PositionSet, to: &PositionSet) -> Result<()> {
    for position in from.iter() {
        if !positions.extend_followpos(*position, to.iter()) {
            return Err(RegexError::StructuralInvariant(
                "lastpos refers to an unallocated position",
            ));
        }
    }
    Ok(())
}
