//! Setup-time failures. Nothing in here is raised mid-tick.

use thiserror::Error;

use crate::CellCoord;

/// Reasons an [`ArenaConfig`](crate::ArenaConfig) is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The fuse duration must be a finite, positive number of seconds.
    #[error("fuse duration must be positive, got {0} seconds")]
    NonPositiveFuse(f32),
    /// Drop chances are probabilities.
    #[error("pickup drop chance must lie in [0, 1], got {0}")]
    DropChanceOutOfRange(f32),
    /// Agents could never place a bomb.
    #[error("concurrent bomb cap must be at least one")]
    ZeroBombCap,
    /// Bombs would never reach a neighbouring tile.
    #[error("base blast radius must be at least one tile")]
    ZeroBlastRadius,
    /// Cooldowns cannot run backwards.
    #[error("placement cooldown must be finite and non-negative, got {0} seconds")]
    NegativeCooldown(f32),
    /// Pickups can drop but no kind carries any weight.
    #[error("pickup weights must not all be zero while drops are enabled")]
    EmptyPickupWeights,
}

/// Reasons a map cannot be set up for a round.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MapError {
    /// Generated maps need room for the border and at least one interior tile.
    #[error("map of {rows}x{columns} tiles is too small; both sides need at least 3 tiles")]
    TooSmall {
        /// Requested row count.
        rows: u32,
        /// Requested column count.
        columns: u32,
    },
    /// Densities are probabilities.
    #[error("destructible density must lie in [0, 1], got {0}")]
    DensityOutOfRange(f32),
    /// A layout without rows describes no map.
    #[error("map layout contains no rows")]
    EmptyLayout,
    /// Every layout row must have the same width.
    #[error("layout row {row} has {found} tiles, expected {expected}")]
    RaggedLayout {
        /// Zero-based index of the offending row.
        row: u32,
        /// Width of the first row.
        expected: u32,
        /// Width of the offending row.
        found: u32,
    },
    /// Layout glyphs are `#`, `+`, `.` and the pickup letters `r`, `b`, `s`.
    #[error("unknown layout glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        /// Character that could not be interpreted.
        glyph: char,
        /// Row of the glyph.
        row: u32,
        /// Column of the glyph.
        column: u32,
    },
    /// A spawn point lies outside the grid.
    #[error("spawn point {0} lies outside the map")]
    SpawnOutOfBounds(CellCoord),
    /// A spawn point lies on a tile agents cannot stand on.
    #[error("spawn point {0} is not an open tile")]
    SpawnBlocked(CellCoord),
    /// Nobody could ever stand anywhere.
    #[error("map contains no open tile")]
    NoOpenTile,
}
