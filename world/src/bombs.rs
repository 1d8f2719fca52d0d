//! Authoritative bomb state and fuse bookkeeping.

use std::{collections::BTreeMap, time::Duration};

use blast_arena_core::{AgentId, BombId, BombSnapshot, CellCoord};

/// Bomb stored inside the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BombState {
    /// Identifier allocated by the world for the bomb.
    pub(crate) id: BombId,
    /// Agent that placed the bomb.
    pub(crate) owner: AgentId,
    /// Cell holding the bomb.
    pub(crate) cell: CellCoord,
    /// Fuse length the bomb was armed with.
    pub(crate) fuse_total: Duration,
    /// Fuse time left. Zero means the bomb detonates on the next sweep.
    pub(crate) fuse_remaining: Duration,
    /// Blast radius fixed at placement.
    pub(crate) blast_radius: u32,
}

impl BombState {
    pub(crate) fn snapshot(&self) -> BombSnapshot {
        BombSnapshot {
            id: self.id,
            owner: self.owner,
            cell: self.cell,
            fuse_total: self.fuse_total,
            fuse_remaining: self.fuse_remaining,
            blast_radius: self.blast_radius,
        }
    }
}

/// Registry that stores live bombs and manages identifier allocation.
#[derive(Debug)]
pub(crate) struct BombRegistry {
    entries: BTreeMap<BombId, BombState>,
    next_bomb_id: BombId,
}

impl BombRegistry {
    /// Creates an empty bomb registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_bomb_id: BombId::new(0),
        }
    }

    /// Arms a new bomb and returns its identifier.
    pub(crate) fn arm(
        &mut self,
        owner: AgentId,
        cell: CellCoord,
        fuse: Duration,
        blast_radius: u32,
    ) -> BombId {
        let id = self.next_bomb_id;
        self.next_bomb_id = BombId::new(id.get().wrapping_add(1));
        let _ = self.entries.insert(
            id,
            BombState {
                id,
                owner,
                cell,
                fuse_total: fuse,
                fuse_remaining: fuse,
                blast_radius,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: BombId) -> Option<&BombState> {
        self.entries.get(&id)
    }

    /// Live bomb lying on `cell`.
    pub(crate) fn at(&self, cell: CellCoord) -> Option<&BombState> {
        self.entries.values().find(|bomb| bomb.cell == cell)
    }

    /// Burns `dt` off every fuse and returns the bombs now due, in id order.
    ///
    /// Bombs whose fuse was already forced to zero are due as well.
    pub(crate) fn advance(&mut self, dt: Duration) -> Vec<BombId> {
        let mut due = Vec::new();
        for bomb in self.entries.values_mut() {
            bomb.fuse_remaining = bomb.fuse_remaining.saturating_sub(dt);
            if bomb.fuse_remaining.is_zero() {
                due.push(bomb.id);
            }
        }
        due
    }

    /// Cuts the fuse of a live bomb to zero.
    ///
    /// Returns `true` only when the fuse was still burning, so repeated
    /// triggers of the same bomb are no-ops.
    pub(crate) fn force_detonation(&mut self, id: BombId) -> bool {
        match self.entries.get_mut(&id) {
            Some(bomb) if !bomb.fuse_remaining.is_zero() => {
                bomb.fuse_remaining = Duration::ZERO;
                true
            }
            _ => false,
        }
    }

    /// Removes a bomb, handing its final state to the caller.
    pub(crate) fn take(&mut self, id: BombId) -> Option<BombState> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BombState> {
        self.entries.values()
    }
}
