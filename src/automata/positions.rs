use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};

use serde::{Deserialize, Serialize};

/// Identifier of one literal occurrence in the augmented pattern.
///
/// Ids are dense and start at 1 within a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(u32);

impl PositionId {
    pub fn new(id: u32) -> Self {
        PositionId(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    fn index(&self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl Display for PositionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a position matches: an input character or the synthetic end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Char(char),
    EndMarker,
}

impl Symbol {
    pub fn as_char(&self) -> Option<char> {
        match self {
            Symbol::Char(c) => Some(*c),
            Symbol::EndMarker => None,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "'{}'", c),
            Symbol::EndMarker => write!(f, "end marker"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub id: PositionId,
    pub symbol: Symbol,
    /// Positions that may immediately follow this one. Only grows, and only
    /// during the followpos pass.
    pub followpos: BTreeSet<PositionId>,
}

/// Arena of positions for one compilation.
///
/// Positions are addressed by id, so the followpos graph can hold cycles
/// without any shared ownership between entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positions {
    arena: Vec<Position>,
}

impl Positions {
    pub fn new() -> Self {
        Positions { arena: Vec::new() }
    }

    /// Hands out the next id for `symbol`.
    pub fn alloc(&mut self, symbol: Symbol) -> PositionId {
        let id = PositionId(self.arena.len() as u32 + 1);
        self.arena.push(Position {
            id,
            symbol,
            followpos: BTreeSet::new(),
        });
        id
    }

    /// Drops every position; the next allocation gets id 1 again.
    pub fn reset(&mut self) {
        self.arena.clear();
    }

    pub fn get(&self, id: PositionId) -> Option<&Position> {
        id.index().and_then(|i| self.arena.get(i))
    }

    pub fn symbol(&self, id: PositionId) -> Option<Symbol> {
        self.get(id).map(|p| p.symbol)
    }

    pub fn followpos(&self, id: PositionId) -> Option<&BTreeSet<PositionId>> {
        self.get(id).map(|p| &p.followpos)
    }

    /// Unions `ids` into the followpos set of `id`. Returns `false` if `id`
    /// was never allocated.
    pub fn extend_followpos<'a, I>(&mut self, id: PositionId, ids: I) -> bool
    where
        I: IntoIterator<Item = &'a PositionId>,
    {
        match id.index().and_then(|i| self.arena.get_mut(i)) {
            Some(position) => {
                position.followpos.extend(ids);
                true
            }
            None => false,
        }
    }

    /// First position carrying `symbol`, in allocation order.
    pub fn find_symbol(&self, symbol: Symbol) -> Option<PositionId> {
        self.arena.iter().find(|p| p.symbol == symbol).map(|p| p.id)
    }

    /// Distinct input characters over all positions; the end marker is left out.
    pub fn alphabet(&self) -> BTreeSet<char> {
        self.arena.iter().filter_map(|p| p.symbol.as_char()).collect()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.arena.iter()
    }
}
