#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Breadth-first search for hazard-free paths across the arena.

use std::collections::VecDeque;

use blast_arena_core::{CellCoord, Direction, MapView};
use blast_arena_system_hazard::HazardAnalyzer;

/// Shortest-path search that avoids walls, crates and dangerous tiles.
///
/// Scratch buffers survive between searches so repeated queries on the same
/// map do not allocate.
#[derive(Clone, Debug, Default)]
pub struct PathFinder {
    visited: VisitedSet,
    parents: Vec<usize>,
    queue: VecDeque<CellCoord>,
}

impl PathFinder {
    /// Creates a path finder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a shortest path from `start` to `goal` over Open, non-dangerous
    /// tiles, visiting neighbours north, south, west, east.
    ///
    /// The path includes both endpoints. The start tile itself is never
    /// tested, so an agent standing in danger can still route out of it.
    /// Returns an empty path when the goal cannot be reached or is not Open.
    pub fn find_safe_path(
        &mut self,
        map: &MapView<'_>,
        hazards: &HazardAnalyzer<'_>,
        start: CellCoord,
        goal: CellCoord,
    ) -> Vec<CellCoord> {
        let (Some(start_index), Some(goal_index)) = (map.flat_index(start), map.flat_index(goal))
        else {
            return Vec::new();
        };
        if !map.is_walkable(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        self.reset(map.cell_count());
        let _ = self.visited.insert(start_index);
        self.parents[start_index] = start_index;
        self.queue.push_back(start);

        while let Some(cell) = self.queue.pop_front() {
            let Some(cell_index) = map.flat_index(cell) else {
                continue;
            };

            for direction in Direction::ALL {
                let Some(neighbor) = map.neighbor(cell, direction) else {
                    continue;
                };
                let Some(neighbor_index) = map.flat_index(neighbor) else {
                    continue;
                };
                if self.visited.contains(neighbor_index) {
                    continue;
                }
                if !map.is_walkable(neighbor) || hazards.is_dangerous(neighbor) {
                    continue;
                }

                let _ = self.visited.insert(neighbor_index);
                self.parents[neighbor_index] = cell_index;
                if neighbor_index == goal_index {
                    return self.reconstruct(map, start_index, goal_index);
                }
                self.queue.push_back(neighbor);
            }
        }

        Vec::new()
    }

    fn reset(&mut self, cell_count: usize) {
        self.visited.reset(cell_count);
        self.parents.clear();
        self.parents.resize(cell_count, usize::MAX);
        self.queue.clear();
    }

    fn reconstruct(&self, map: &MapView<'_>, start: usize, goal: usize) -> Vec<CellCoord> {
        let mut path = Vec::new();
        let mut current = goal;
        loop {
            let Some(cell) = map.cell_at(current) else {
                return Vec::new();
            };
            path.push(cell);
            if current == start {
                break;
            }
            current = self.parents[current];
        }
        path.reverse();
        path
    }
}

/// Dense visited set keyed by the flattened cell index.
#[derive(Clone, Debug, Default)]
struct VisitedSet {
    words: Vec<u64>,
}

impl VisitedSet {
    fn reset(&mut self, len: usize) {
        self.words.clear();
        self.words.resize(len.div_ceil(64), 0);
    }

    fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .is_some_and(|word| word & (1u64 << (index % 64)) != 0)
    }

    fn insert(&mut self, index: usize) -> bool {
        let Some(word) = self.words.get_mut(index / 64) else {
            return false;
        };
        let mask = 1u64 << (index % 64);
        let fresh = *word & mask == 0;
        *word |= mask;
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_arena_core::{AgentId, BombId, BombSnapshot, BombView, Tile};
    use std::time::Duration;

    fn parse(rows: &[&str]) -> (Vec<Tile>, u32, u32) {
        let tiles = rows
            .iter()
            .flat_map(|row| {
                row.chars().map(|glyph| match glyph {
                    '#' => Tile::SOLID,
                    '+' => Tile::DESTRUCTIBLE,
                    _ => Tile::OPEN,
                })
            })
            .collect();
        (tiles, rows.len() as u32, rows[0].len() as u32)
    }

    fn search(
        rows: &[&str],
        bombs: &BombView,
        start: CellCoord,
        goal: CellCoord,
    ) -> Vec<CellCoord> {
        let (tiles, height, width) = parse(rows);
        let map = MapView::new(&tiles, height, width);
        let hazards = HazardAnalyzer::new(bombs);
        PathFinder::new().find_safe_path(&map, &hazards, start, goal)
    }

    #[test]
    fn start_equal_to_goal_yields_single_cell() {
        let path = search(
            &["...", "...", "..."],
            &BombView::default(),
            CellCoord::new(1, 1),
            CellCoord::new(1, 1),
        );
        assert_eq!(path, vec![CellCoord::new(1, 1)]);
    }

    #[test]
    fn standing_on_a_wall_yields_no_path() {
        let path = search(
            &["#..", "...", "..."],
            &BombView::default(),
            CellCoord::new(0, 0),
            CellCoord::new(0, 0),
        );
        assert!(path.is_empty());
    }

    #[test]
    fn neighbours_are_tried_north_first() {
        let path = search(
            &["...", "...", "..."],
            &BombView::default(),
            CellCoord::new(1, 1),
            CellCoord::new(0, 0),
        );
        assert_eq!(
            path,
            vec![
                CellCoord::new(1, 1),
                CellCoord::new(0, 1),
                CellCoord::new(0, 0)
            ]
        );
    }

    #[test]
    fn walls_and_crates_block_the_search() {
        let rows = [".#.", "+#.", "..."];
        let path = search(
            &rows,
            &BombView::default(),
            CellCoord::new(0, 0),
            CellCoord::new(0, 2),
        );
        assert!(path.is_empty());

        let rows = [".#.", ".#.", "..."];
        let path = search(
            &rows,
            &BombView::default(),
            CellCoord::new(0, 0),
            CellCoord::new(0, 2),
        );
        assert_eq!(path.len(), 7);
        assert_eq!(path.last(), Some(&CellCoord::new(0, 2)));
    }

    #[test]
    fn dangerous_tiles_force_a_detour() {
        let bomb = BombSnapshot {
            id: BombId::new(0),
            owner: AgentId::new(0),
            cell: CellCoord::new(0, 2),
            fuse_total: Duration::from_secs(2),
            fuse_remaining: Duration::from_secs(1),
            blast_radius: 1,
        };
        let bombs = BombView::from_snapshots(vec![bomb]);
        let path = search(
            &[".....", ".....", "....."],
            &bombs,
            CellCoord::new(1, 0),
            CellCoord::new(1, 4),
        );

        assert_eq!(path.len(), 7);
        assert!(!path.contains(&CellCoord::new(1, 2)));
        assert!(path.contains(&CellCoord::new(2, 2)));
    }

    #[test]
    fn out_of_bounds_endpoints_yield_empty_paths() {
        let path = search(
            &["..", ".."],
            &BombView::default(),
            CellCoord::new(0, 0),
            CellCoord::new(5, 5),
        );
        assert!(path.is_empty());
    }

    #[test]
    fn visited_set_reports_fresh_insertions() {
        let mut set = VisitedSet::default();
        set.reset(128);
        assert!(set.insert(127));
        assert!(!set.insert(127));
        assert!(set.contains(127));
        assert!(!set.contains(126));
        assert!(!set.insert(200));
    }
}
