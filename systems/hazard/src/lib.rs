#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Conservative blast-danger queries over the live bomb set.
//!
//! A tile is dangerous when a live bomb shares its row or column within the
//! bomb's blast radius and that bomb's fuse has burnt into its danger window.
//! Walls between the bomb and the tile are ignored, so the analyzer may flag
//! tiles a Solid tile would actually shield.

use blast_arena_core::{BombSnapshot, BombView, CellCoord};

/// Share of the original fuse, in tenths, at or below which a bomb is a threat.
const DANGER_WINDOW_TENTHS: u128 = 9;

/// Read-only danger oracle bound to one tick's bomb snapshot.
#[derive(Clone, Copy, Debug)]
pub struct HazardAnalyzer<'a> {
    bombs: &'a BombView,
}

impl<'a> HazardAnalyzer<'a> {
    /// Creates an analyzer over the live bombs of the current tick.
    #[must_use]
    pub fn new(bombs: &'a BombView) -> Self {
        Self { bombs }
    }

    /// Reports whether `cell` may be struck by an imminent detonation.
    #[must_use]
    pub fn is_dangerous(&self, cell: CellCoord) -> bool {
        self.threats(cell).next().is_some()
    }

    /// Bombs currently threatening `cell`, in id order.
    pub fn threats(&self, cell: CellCoord) -> impl Iterator<Item = &'a BombSnapshot> + 'a {
        let bombs = self.bombs;
        bombs
            .iter()
            .filter(move |bomb| in_danger_window(bomb) && within_reach(bomb, cell))
    }
}

/// Reports whether the bomb's remaining fuse is at or below 90% of its total.
#[must_use]
pub fn in_danger_window(bomb: &BombSnapshot) -> bool {
    bomb.fuse_remaining.as_nanos() * 10 <= bomb.fuse_total.as_nanos() * DANGER_WINDOW_TENTHS
}

/// Reports whether `cell` lies on the bomb's row or column within its radius.
#[must_use]
pub fn within_reach(bomb: &BombSnapshot, cell: CellCoord) -> bool {
    let radius = bomb.blast_radius;
    if bomb.cell.row() == cell.row() {
        bomb.cell.column().abs_diff(cell.column()) <= radius
    } else if bomb.cell.column() == cell.column() {
        bomb.cell.row().abs_diff(cell.row()) <= radius
    } else {
        false
    }
}
