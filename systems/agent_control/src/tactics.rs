//! Geometry helpers shared by the controller states.

use blast_arena_core::{CellCoord, Direction, MapView, Passability, TargetSnapshot};
use blast_arena_system_hazard::HazardAnalyzer;

/// Chebyshev distance within which a target may provoke a bomb placement.
pub(crate) const STRIKE_RANGE: u32 = 3;

/// Nearest target by Manhattan distance, ties broken by target id.
pub(crate) fn nearest_target(
    from: CellCoord,
    targets: &[TargetSnapshot],
) -> Option<TargetSnapshot> {
    targets
        .iter()
        .min_by_key(|target| (from.manhattan_distance(target.cell), target.id))
        .copied()
}

/// Reports whether a bomb of `radius` at `from` would reach `to`.
///
/// Unlike the hazard check this one is precise: any Solid tile strictly
/// between the two cells blocks the line.
pub(crate) fn in_line_of_fire(
    map: &MapView<'_>,
    from: CellCoord,
    to: CellCoord,
    radius: u32,
) -> bool {
    let solid = |cell: CellCoord| map.passability(cell) == Some(Passability::Solid);

    if from.row() == to.row() {
        let (low, high) = ordered(from.column(), to.column());
        high - low <= radius
            && (low + 1..high).all(|column| !solid(CellCoord::new(from.row(), column)))
    } else if from.column() == to.column() {
        let (low, high) = ordered(from.row(), to.row());
        high - low <= radius
            && (low + 1..high).all(|row| !solid(CellCoord::new(row, from.column())))
    } else {
        false
    }
}

/// Reports whether stepping from `cell` in `direction` lands on a safe Open tile.
pub(crate) fn is_safe_step(
    map: &MapView<'_>,
    hazards: &HazardAnalyzer<'_>,
    cell: CellCoord,
    direction: Direction,
) -> bool {
    map.neighbor(cell, direction)
        .is_some_and(|next| map.is_walkable(next) && !hazards.is_dangerous(next))
}

/// Reports whether a Destructible tile touches `cell`.
pub(crate) fn touches_crate(map: &MapView<'_>, cell: CellCoord) -> bool {
    Direction::ALL.iter().any(|direction| {
        map.neighbor(cell, *direction)
            .and_then(|next| map.passability(next))
            == Some(Passability::Destructible)
    })
}

/// Cell following `current` on `path`, if any.
pub(crate) fn next_on_path(path: &[CellCoord], current: CellCoord) -> Option<CellCoord> {
    let position = path.iter().position(|cell| *cell == current)?;
    path.get(position + 1).copied()
}

/// Reports whether a cached chase path must be recomputed.
pub(crate) fn path_is_stale(
    path: &[CellCoord],
    current: CellCoord,
    goal: CellCoord,
    map: &MapView<'_>,
    hazards: &HazardAnalyzer<'_>,
) -> bool {
    if path.last() != Some(&goal) || !path.contains(&current) {
        return true;
    }
    next_on_path(path, current)
        .is_some_and(|next| !map.is_walkable(next) || hazards.is_dangerous(next))
}

fn ordered(first: u32, second: u32) -> (u32, u32) {
    if first <= second {
        (first, second)
    } else {
        (second, first)
    }
}
