//! Externally supplied tuning for a round.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, MapError, PickupKind};

/// Gameplay tuning consumed by the world and the agent controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Fuse length of every placed bomb, in seconds.
    pub fuse_secs: f32,
    /// Blast radius agents start the round with.
    pub base_blast_radius: u32,
    /// Blast radius added by each collected [`PickupKind::BlastRadius`].
    pub blast_radius_growth: u32,
    /// Concurrent-bomb cap agents start the round with.
    pub bomb_cap: u32,
    /// Probability that a destroyed crate reveals a pickup.
    pub drop_chance: f32,
    /// Relative weights used to pick the kind of a revealed pickup.
    pub pickup_weights: PickupWeights,
    /// Time an autonomous agent waits between two bomb placements, in seconds.
    pub placement_cooldown_secs: f32,
    /// Seed of the world's pickup-drop generator.
    pub rng_seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            fuse_secs: 2.0,
            base_blast_radius: 2,
            blast_radius_growth: 1,
            bomb_cap: 1,
            drop_chance: 0.3,
            pickup_weights: PickupWeights::default(),
            placement_cooldown_secs: 1.0,
            rng_seed: 0x5eed_b1a5_7a2e_0001,
        }
    }
}

impl ArenaConfig {
    /// Fuse length as a [`Duration`].
    #[must_use]
    pub fn fuse(&self) -> Duration {
        Duration::try_from_secs_f32(self.fuse_secs).unwrap_or(Duration::ZERO)
    }

    /// Placement cooldown as a [`Duration`].
    #[must_use]
    pub fn placement_cooldown(&self) -> Duration {
        Duration::try_from_secs_f32(self.placement_cooldown_secs).unwrap_or(Duration::ZERO)
    }

    /// Checks every value for its permitted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fuse_secs.is_finite() || self.fuse_secs <= 0.0 || self.fuse().is_zero() {
            return Err(ConfigError::NonPositiveFuse(self.fuse_secs));
        }
        if !(0.0..=1.0).contains(&self.drop_chance) {
            return Err(ConfigError::DropChanceOutOfRange(self.drop_chance));
        }
        if self.bomb_cap == 0 {
            return Err(ConfigError::ZeroBombCap);
        }
        if self.base_blast_radius == 0 {
            return Err(ConfigError::ZeroBlastRadius);
        }
        if !self.placement_cooldown_secs.is_finite() || self.placement_cooldown_secs < 0.0 {
            return Err(ConfigError::NegativeCooldown(self.placement_cooldown_secs));
        }
        if self.drop_chance > 0.0 && self.pickup_weights.total() == 0 {
            return Err(ConfigError::EmptyPickupWeights);
        }
        Ok(())
    }
}

/// Weight table for revealed pickups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupWeights {
    /// Weight of [`PickupKind::BlastRadius`].
    pub blast_radius: u32,
    /// Weight of [`PickupKind::ExtraBomb`].
    pub extra_bomb: u32,
    /// Weight of [`PickupKind::Speed`].
    pub speed: u32,
}

impl Default for PickupWeights {
    fn default() -> Self {
        Self {
            blast_radius: 4,
            extra_bomb: 3,
            speed: 3,
        }
    }
}

impl PickupWeights {
    /// Every pickup kind paired with its weight, in a fixed order.
    #[must_use]
    pub const fn entries(&self) -> [(PickupKind, u32); 3] {
        [
            (PickupKind::BlastRadius, self.blast_radius),
            (PickupKind::ExtraBomb, self.extra_bomb),
            (PickupKind::Speed, self.speed),
        ]
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.entries()
            .iter()
            .map(|(_, weight)| u64::from(*weight))
            .sum()
    }
}

/// Description of the arena consumed once at round setup.
///
/// When `layout` is present it is used verbatim (`#` Solid, `+` Destructible,
/// `.` Open) and the generation parameters are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSpec {
    /// Number of tile rows of a generated map.
    pub rows: u32,
    /// Number of tile columns of a generated map.
    pub columns: u32,
    /// Probability that a free interior tile becomes a crate.
    pub destructible_density: f32,
    /// Seed of the generator placing crates.
    pub seed: u64,
    /// Manhattan radius around each spawn point kept free of crates.
    pub spawn_clearance: u32,
    /// Explicit layout rows, top to bottom.
    pub layout: Option<Vec<String>>,
}

impl Default for MapSpec {
    fn default() -> Self {
        Self {
            rows: 11,
            columns: 13,
            destructible_density: 0.6,
            seed: 0x6d61_7073_6565_6421,
            spawn_clearance: 2,
            layout: None,
        }
    }
}

impl MapSpec {
    /// Checks the generation parameters. Layouts are checked while parsing.
    pub fn validate(&self) -> Result<(), MapError> {
        if self.layout.is_some() {
            return Ok(());
        }
        if self.rows < 3 || self.columns < 3 {
            return Err(MapError::TooSmall {
                rows: self.rows,
                columns: self.columns,
            });
        }
        if !(0.0..=1.0).contains(&self.destructible_density) {
            return Err(MapError::DensityOutOfRange(self.destructible_density));
        }
        Ok(())
    }
}
