//! Tile storage, map generation and ASCII layouts.

use std::ops::Index;

use blast_arena_core::{CellCoord, MapError, MapSpec, MapView, Passability, PickupKind, Tile};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Dense row-major grid of tiles owned by the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridMap {
    rows: u32,
    columns: u32,
    tiles: Vec<Tile>,
}

impl GridMap {
    /// Creates a map where every tile equals `tile`.
    #[must_use]
    pub fn filled(rows: u32, columns: u32, tile: Tile) -> Self {
        let capacity = usize::try_from(u64::from(rows) * u64::from(columns)).unwrap_or(0);
        Self {
            rows,
            columns,
            tiles: vec![tile; capacity],
        }
    }

    /// Builds the map described by `spec`, keeping every spawn point usable.
    ///
    /// Explicit layouts take precedence over generation. The resulting map is
    /// checked for spawn points on open tiles and for at least one open tile.
    pub fn from_spec(spec: &MapSpec, spawns: &[CellCoord]) -> Result<Self, MapError> {
        let map = match &spec.layout {
            Some(rows) => Self::from_layout(rows)?,
            None => Self::generate(spec, spawns)?,
        };
        map.check_playable(spawns)?;
        Ok(map)
    }

    /// Generates a classic arena: a Solid border, Solid pillars on every even
    /// row/column intersection, crates scattered with the configured density
    /// and clear ground around the spawn points.
    pub fn generate(spec: &MapSpec, spawns: &[CellCoord]) -> Result<Self, MapError> {
        spec.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(spec.seed);
        let density = f64::from(spec.destructible_density.clamp(0.0, 1.0));
        let mut map = Self::filled(spec.rows, spec.columns, Tile::OPEN);

        for row in 0..spec.rows {
            for column in 0..spec.columns {
                let cell = CellCoord::new(row, column);
                let border =
                    row == 0 || column == 0 || row + 1 == spec.rows || column + 1 == spec.columns;
                let pillar = row % 2 == 0 && column % 2 == 0;
                let tile = if border || pillar {
                    Tile::SOLID
                } else if spawns
                    .iter()
                    .any(|spawn| spawn.manhattan_distance(cell) <= spec.spawn_clearance)
                {
                    Tile::OPEN
                } else if rng.gen_bool(density) {
                    Tile::DESTRUCTIBLE
                } else {
                    Tile::OPEN
                };
                let _ = map.set(cell, tile);
            }
        }

        Ok(map)
    }

    /// Parses an ASCII layout.
    ///
    /// `#` is Solid, `+` Destructible and `.` Open. The letters `r`, `b` and
    /// `s` are Open tiles carrying a blast-radius, extra-bomb or speed pickup.
    pub fn from_layout<S: AsRef<str>>(rows: &[S]) -> Result<Self, MapError> {
        let Some(first) = rows.first() else {
            return Err(MapError::EmptyLayout);
        };
        let expected = first.as_ref().chars().count();
        if expected == 0 {
            return Err(MapError::EmptyLayout);
        }

        let mut tiles = Vec::with_capacity(expected * rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let row_index = row_index as u32;
            let found = row.as_ref().chars().count();
            if found != expected {
                return Err(MapError::RaggedLayout {
                    row: row_index,
                    expected: expected as u32,
                    found: found as u32,
                });
            }

            for (column_index, glyph) in row.as_ref().chars().enumerate() {
                let tile = tile_for_glyph(glyph).ok_or(MapError::UnknownGlyph {
                    glyph,
                    row: row_index,
                    column: column_index as u32,
                })?;
                tiles.push(tile);
            }
        }

        Ok(Self {
            rows: rows.len() as u32,
            columns: expected as u32,
            tiles,
        })
    }

    /// Renders the map back into layout rows.
    #[must_use]
    pub fn to_layout(&self) -> Vec<String> {
        self.tiles
            .chunks(self.columns.max(1) as usize)
            .map(|row| row.iter().map(|tile| glyph_for_tile(*tile)).collect())
            .collect()
    }

    /// Number of rows in the map.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the map.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Read-only view handed to systems.
    #[must_use]
    pub fn view(&self) -> MapView<'_> {
        MapView::new(&self.tiles, self.rows, self.columns)
    }

    /// Tile at `cell`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<Tile> {
        self.view().get(cell)
    }

    /// Number of tiles of the given passability.
    #[must_use]
    pub fn count(&self, passability: Passability) -> usize {
        self.tiles
            .iter()
            .filter(|tile| tile.passability() == passability)
            .count()
    }

    /// Replaces the tile at `cell`, reporting whether anything changed.
    pub(crate) fn set(&mut self, cell: CellCoord, tile: Tile) -> bool {
        let Some(index) = self.view().flat_index(cell) else {
            return false;
        };
        let slot = &mut self.tiles[index];
        if *slot == tile {
            return false;
        }
        *slot = tile;
        true
    }

    fn check_playable(&self, spawns: &[CellCoord]) -> Result<(), MapError> {
        for &spawn in spawns {
            match self.get(spawn) {
                None => return Err(MapError::SpawnOutOfBounds(spawn)),
                Some(tile) if !tile.is_walkable() => return Err(MapError::SpawnBlocked(spawn)),
                Some(_) => {}
            }
        }
        if self.count(Passability::Open) == 0 {
            return Err(MapError::NoOpenTile);
        }
        Ok(())
    }
}

impl Index<CellCoord> for GridMap {
    type Output = Tile;

    fn index(&self, cell: CellCoord) -> &Tile {
        match self.view().flat_index(cell) {
            Some(index) => &self.tiles[index],
            None => panic!(
                "cell {cell} lies outside the {}x{} map",
                self.rows, self.columns
            ),
        }
    }
}

fn tile_for_glyph(glyph: char) -> Option<Tile> {
    let tile = match glyph {
        '#' => Tile::SOLID,
        '+' => Tile::DESTRUCTIBLE,
        '.' => Tile::OPEN,
        'r' => Tile::new(Passability::Open, Some(PickupKind::BlastRadius)),
        'b' => Tile::new(Passability::Open, Some(PickupKind::ExtraBomb)),
        's' => Tile::new(Passability::Open, Some(PickupKind::Speed)),
        _ => return None,
    };
    Some(tile)
}

fn glyph_for_tile(tile: Tile) -> char {
    match (tile.passability(), tile.pickup()) {
        (Passability::Solid, _) => '#',
        (Passability::Destructible, _) => '+',
        (Passability::Open, None) => '.',
        (Passability::Open, Some(PickupKind::BlastRadius)) => 'r',
        (Passability::Open, Some(PickupKind::ExtraBomb)) => 'b',
        (Passability::Open, Some(PickupKind::Speed)) => 's',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(rows: u32, columns: u32, density: f32) -> MapSpec {
        MapSpec {
            rows,
            columns,
            destructible_density: density,
            seed: 7,
            spawn_clearance: 1,
            layout: None,
        }
    }

    #[test]
    fn generated_map_has_border_and_pillars() {
        let map = GridMap::generate(&spec(7, 9, 0.5), &[]).expect("valid spec");

        for column in 0..9 {
            assert_eq!(map[CellCoord::new(0, column)], Tile::SOLID);
            assert_eq!(map[CellCoord::new(6, column)], Tile::SOLID);
        }
        for row in 0..7 {
            assert_eq!(map[CellCoord::new(row, 0)], Tile::SOLID);
            assert_eq!(map[CellCoord::new(row, 8)], Tile::SOLID);
        }
        assert_eq!(map[CellCoord::new(2, 2)], Tile::SOLID);
        assert_eq!(map[CellCoord::new(4, 6)], Tile::SOLID);
        assert_ne!(map[CellCoord::new(1, 1)], Tile::SOLID);
        assert_ne!(map[CellCoord::new(3, 3)], Tile::SOLID);
    }

    #[test]
    fn full_density_fills_everything_outside_spawn_clearance() {
        let spawn = CellCoord::new(1, 1);
        let map = GridMap::generate(&spec(7, 7, 1.0), &[spawn]).expect("valid spec");

        assert_eq!(map[spawn], Tile::OPEN);
        assert_eq!(map[CellCoord::new(1, 2)], Tile::OPEN);
        assert_eq!(map[CellCoord::new(2, 1)], Tile::OPEN);
        assert_eq!(map[CellCoord::new(1, 3)], Tile::DESTRUCTIBLE);
        assert_eq!(map[CellCoord::new(5, 5)], Tile::DESTRUCTIBLE);
    }

    #[test]
    fn generation_is_deterministic_for_same_seed() {
        let first = GridMap::generate(&spec(11, 13, 0.6), &[]).expect("valid spec");
        let second = GridMap::generate(&spec(11, 13, 0.6), &[]).expect("valid spec");
        assert_eq!(first, second);
    }

    #[test]
    fn layout_round_trips_through_glyphs() {
        let rows = ["#####", "#.+r#", "#b.s#", "#####"];
        let map = GridMap::from_layout(&rows).expect("valid layout");

        assert_eq!(map.rows(), 4);
        assert_eq!(map.columns(), 5);
        assert_eq!(map[CellCoord::new(1, 2)], Tile::DESTRUCTIBLE);
        assert_eq!(
            map[CellCoord::new(1, 3)].pickup(),
            Some(PickupKind::BlastRadius)
        );
        assert_eq!(map.to_layout(), rows);
    }

    #[test]
    fn malformed_layouts_are_rejected() {
        assert_eq!(
            GridMap::from_layout::<&str>(&[]),
            Err(MapError::EmptyLayout)
        );
        assert_eq!(
            GridMap::from_layout(&["###", "##"]),
            Err(MapError::RaggedLayout {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            GridMap::from_layout(&["#?#"]),
            Err(MapError::UnknownGlyph {
                glyph: '?',
                row: 0,
                column: 1
            })
        );
    }

    #[test]
    fn from_spec_checks_spawns_and_open_tiles() {
        let walled = MapSpec {
            layout: Some(vec!["###".to_owned(), "###".to_owned()]),
            ..MapSpec::default()
        };
        assert_eq!(
            GridMap::from_spec(&walled, &[]),
            Err(MapError::NoOpenTile)
        );

        let open = MapSpec {
            layout: Some(vec!["#.#".to_owned(), "#+#".to_owned()]),
            ..MapSpec::default()
        };
        assert_eq!(
            GridMap::from_spec(&open, &[CellCoord::new(1, 1)]),
            Err(MapError::SpawnBlocked(CellCoord::new(1, 1)))
        );
        assert_eq!(
            GridMap::from_spec(&open, &[CellCoord::new(4, 1)]),
            Err(MapError::SpawnOutOfBounds(CellCoord::new(4, 1)))
        );
        assert!(GridMap::from_spec(&open, &[CellCoord::new(0, 1)]).is_ok());
    }

    #[test]
    #[should_panic(expected = "outside the 3x3 map")]
    fn indexing_outside_the_map_panics() {
        let map = GridMap::filled(3, 3, Tile::OPEN);
        let _tile: Tile = map[CellCoord::new(3, 0)];
    }
}
