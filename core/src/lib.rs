#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Blast Arena engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing every observable change. Systems read immutable views such as
//! [`MapView`] and [`BombView`] and respond exclusively with new command
//! batches.

use std::{fmt, ops::Index, time::Duration};

use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;

pub use config::{ArenaConfig, MapSpec, PickupWeights};
pub use error::{ConfigError, MapError};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock, burning down every armed fuse.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that a new agent enter the arena at the provided cell.
    SpawnAgent {
        /// Cell the agent should occupy after spawning.
        cell: CellCoord,
        /// Whether the agent is driven by the controller or by external input.
        control: ControlMode,
    },
    /// Submits the action an agent decided on for the current tick.
    IssueIntent {
        /// Agent performing the action.
        agent: AgentId,
        /// Action requested for the agent.
        intent: AgentIntent,
    },
    /// Forces the fuse of a live bomb to zero so it detonates on the next tick.
    TriggerBomb {
        /// Bomb whose fuse should be cut.
        bomb: BombId,
    },
    /// Removes a defeated agent from the arena. Its bombs keep ticking.
    RemoveAgent {
        /// Agent leaving the arena.
        agent: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an agent entered the arena.
    AgentSpawned {
        /// Identifier assigned to the agent by the world.
        agent: AgentId,
        /// Cell the agent occupies after spawning.
        cell: CellCoord,
        /// Control mode of the new agent.
        control: ControlMode,
    },
    /// Reports that a spawn request targeted a cell agents cannot stand on.
    AgentSpawnRejected {
        /// Cell named in the rejected request.
        cell: CellCoord,
    },
    /// Announces the action an agent decided on for the tick.
    IntentIssued {
        /// Agent that issued the intent.
        agent: AgentId,
        /// Decided action.
        intent: AgentIntent,
    },
    /// Confirms that an agent moved between two adjacent cells.
    AgentAdvanced {
        /// Agent that moved.
        agent: AgentId,
        /// Cell occupied before the move.
        from: CellCoord,
        /// Cell occupied after the move.
        to: CellCoord,
    },
    /// Reports that a step was refused because the destination is not walkable.
    AgentBlocked {
        /// Agent whose step was refused.
        agent: AgentId,
        /// Direction of the refused step.
        direction: Direction,
    },
    /// Confirms that an agent picked up a power-up.
    PickupCollected {
        /// Agent that collected the pickup.
        agent: AgentId,
        /// Cell the pickup was lying on.
        cell: CellCoord,
        /// Kind of pickup collected.
        kind: PickupKind,
    },
    /// Confirms that a bomb was armed.
    BombPlaced {
        /// Identifier assigned to the bomb.
        bomb: BombId,
        /// Cell holding the bomb.
        cell: CellCoord,
        /// Agent that placed the bomb.
        owner: AgentId,
        /// Blast radius fixed for the lifetime of the bomb.
        blast_radius: u32,
    },
    /// Reports that a placement request was a no-op.
    BombPlacementRejected {
        /// Agent that requested the placement.
        agent: AgentId,
        /// Reason the placement was refused.
        reason: PlacementError,
    },
    /// Announces that a bomb detonated at its cell.
    BombDetonated {
        /// Identifier of the bomb that detonated.
        bomb: BombId,
        /// Cell the bomb occupied.
        cell: CellCoord,
        /// Blast radius applied by the explosion.
        blast_radius: u32,
        /// Agent that placed the bomb.
        owner: AgentId,
    },
    /// Marks a cell as struck by an explosion this tick.
    TileBlasted {
        /// Cell covered by the blast.
        cell: CellCoord,
    },
    /// Reports a terrain mutation so presentation layers can resynchronise.
    TileChanged {
        /// Cell whose tile changed.
        cell: CellCoord,
        /// Passability after the change.
        passability: Passability,
        /// Pickup lying on the tile after the change.
        pickup: Option<PickupKind>,
    },
    /// Reports that an explosion reached another live bomb and cut its fuse.
    ChainReaction {
        /// Bomb whose fuse was forced to zero.
        bomb: BombId,
        /// Bomb whose explosion reached it.
        triggered_by: BombId,
    },
    /// Reports that an agent stood on a cell struck by an explosion.
    AgentCaught {
        /// Agent standing in the blast.
        agent: AgentId,
        /// Cell the agent occupied.
        cell: CellCoord,
        /// Bomb responsible for the blast.
        bomb: BombId,
    },
    /// Confirms that an agent left the arena.
    AgentRemoved {
        /// Agent that was removed.
        agent: AgentId,
    },
}

/// Cardinal directions, listed in the fixed visitation order used by searches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
    /// Movement toward increasing column indices.
    East,
}

impl Direction {
    /// Every direction in visitation order: up, down, left, right.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Row and column deltas applied by a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i64, i64) {
        match self {
            Self::North => (-1, 0),
            Self::South => (1, 0),
            Self::West => (0, -1),
            Self::East => (0, 1),
        }
    }
}

/// Location of a single grid cell expressed as row and column indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate from a row and a column.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }

    /// Computes the Chebyshev distance, the larger of the two axis distances.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.row
            .abs_diff(other.row)
            .max(self.column.abs_diff(other.column))
    }

    /// Returns the neighbouring cell in `direction`, if it lies inside a
    /// `rows` x `columns` grid.
    #[must_use]
    pub fn neighbor(self, direction: Direction, rows: u32, columns: u32) -> Option<CellCoord> {
        let (row_delta, column_delta) = direction.offset();
        let row = i64::from(self.row) + row_delta;
        let column = i64::from(self.column) + column_delta;
        if row < 0 || column < 0 || row >= i64::from(rows) || column >= i64::from(columns) {
            return None;
        }

        Some(CellCoord::new(
            u32::try_from(row).ok()?,
            u32::try_from(column).ok()?,
        ))
    }

    /// Direction of a single step from `self` to an adjacent `other`.
    #[must_use]
    pub fn direction_to(self, other: CellCoord) -> Option<Direction> {
        let row_diff = self.row.abs_diff(other.row);
        let column_diff = self.column.abs_diff(other.column);
        if row_diff + column_diff != 1 {
            return None;
        }

        if row_diff == 1 {
            if other.row > self.row {
                Some(Direction::South)
            } else {
                Some(Direction::North)
            }
        } else if other.column > self.column {
            Some(Direction::East)
        } else {
            Some(Direction::West)
        }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Passability class of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Passability {
    /// Walkable floor.
    Open,
    /// Permanent wall that blocks movement and explosions.
    Solid,
    /// Crate that blocks movement until an explosion destroys it.
    Destructible,
}

/// Power-ups that may be revealed when a destructible tile is destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PickupKind {
    /// Grows the collecting agent's blast radius.
    BlastRadius,
    /// Raises the collecting agent's concurrent-bomb cap by one.
    ExtraBomb,
    /// Increments the collecting agent's speed bonus for the movement layer.
    Speed,
}

/// Single grid cell: a passability class and an optional latent pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    passability: Passability,
    pickup: Option<PickupKind>,
}

impl Tile {
    /// Walkable tile without a pickup.
    pub const OPEN: Tile = Tile::new(Passability::Open, None);
    /// Permanent wall.
    pub const SOLID: Tile = Tile::new(Passability::Solid, None);
    /// Destructible crate.
    pub const DESTRUCTIBLE: Tile = Tile::new(Passability::Destructible, None);

    /// Creates a tile from its parts.
    #[must_use]
    pub const fn new(passability: Passability, pickup: Option<PickupKind>) -> Self {
        Self {
            passability,
            pickup,
        }
    }

    /// Passability class of the tile.
    #[must_use]
    pub const fn passability(&self) -> Passability {
        self.passability
    }

    /// Pickup lying on the tile, if any.
    #[must_use]
    pub const fn pickup(&self) -> Option<PickupKind> {
        self.pickup
    }

    /// Reports whether agents may stand on the tile.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        matches!(self.passability, Passability::Open)
    }
}

/// Unique identifier assigned to a bomb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BombId(u32);

impl BombId {
    /// Creates a new bomb identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier of an externally supplied target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(u32);

impl TargetId {
    /// Creates a new target identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Describes who decides an agent's actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlMode {
    /// Driven by the agent controller's state machine.
    Autonomous,
    /// Driven by direct external input, bypassing the state machine.
    External,
}

/// Action an agent performs during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentIntent {
    /// Move one tile in the given direction.
    Step(Direction),
    /// Arm a bomb on the agent's current tile.
    PlaceBomb,
}

/// Tactical behaviour selected by the controller for an autonomous agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentState {
    /// No target is reachable; the agent explores by clearing crates.
    #[default]
    Idle,
    /// The agent follows a path toward a live target.
    Chase,
    /// The agent's tile is threatened and it is fleeing.
    Evade,
    /// The agent is arming a bomb against a target in range.
    PlaceBomb,
}

/// Reasons a bomb placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// A live bomb already occupies the agent's tile.
    Occupied,
    /// The agent already has as many live bombs as its cap allows.
    CapReached,
    /// No agent with the provided identifier exists.
    MissingAgent,
}

/// Read-only view into the tile grid.
#[derive(Clone, Copy, Debug)]
pub struct MapView<'a> {
    tiles: &'a [Tile],
    rows: u32,
    columns: u32,
}

impl<'a> MapView<'a> {
    /// Captures a new map view backed by the provided row-major tile slice.
    #[must_use]
    pub fn new(tiles: &'a [Tile], rows: u32, columns: u32) -> Self {
        debug_assert_eq!(
            tiles.len() as u64,
            u64::from(rows) * u64::from(columns),
            "tile slice must match the grid dimensions"
        );
        Self {
            tiles,
            rows,
            columns,
        }
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether `cell` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.row() < self.rows && cell.column() < self.columns
    }

    /// Flattened `row * columns + column` index of an in-bounds cell.
    #[must_use]
    pub fn flat_index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Cell addressed by a flattened index.
    #[must_use]
    pub fn cell_at(&self, index: usize) -> Option<CellCoord> {
        if index >= self.tiles.len() || self.columns == 0 {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let row = u32::try_from(index / width).ok()?;
        let column = u32::try_from(index % width).ok()?;
        Some(CellCoord::new(row, column))
    }

    /// Tile stored at `cell`, or `None` when out of bounds.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<Tile> {
        self.flat_index(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Passability of `cell`, or `None` when out of bounds.
    #[must_use]
    pub fn passability(&self, cell: CellCoord) -> Option<Passability> {
        self.get(cell).map(|tile| tile.passability())
    }

    /// Reports whether agents may stand on `cell`. Out-of-bounds cells are not walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.get(cell).is_some_and(|tile| tile.is_walkable())
    }

    /// Neighbour of `cell` in `direction`, if inside the grid.
    #[must_use]
    pub fn neighbor(&self, cell: CellCoord, direction: Direction) -> Option<CellCoord> {
        cell.neighbor(direction, self.rows, self.columns)
    }

    /// Iterator over every cell and its tile in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, Tile)> + 'a {
        let columns = self.columns.max(1);
        self.tiles.iter().enumerate().map(move |(index, tile)| {
            let index = index as u64;
            let columns = u64::from(columns);
            let cell = CellCoord::new((index / columns) as u32, (index % columns) as u32);
            (cell, *tile)
        })
    }
}

impl Index<CellCoord> for MapView<'_> {
    type Output = Tile;

    fn index(&self, cell: CellCoord) -> &Tile {
        match self.flat_index(cell) {
            Some(index) => &self.tiles[index],
            None => panic!(
                "cell {cell} lies outside the {}x{} map",
                self.rows, self.columns
            ),
        }
    }
}

/// Immutable representation of a single bomb's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BombSnapshot {
    /// Unique identifier assigned to the bomb.
    pub id: BombId,
    /// Agent that placed the bomb.
    pub owner: AgentId,
    /// Cell holding the bomb.
    pub cell: CellCoord,
    /// Fuse length the bomb was armed with.
    pub fuse_total: Duration,
    /// Fuse time left before detonation.
    pub fuse_remaining: Duration,
    /// Number of tiles the explosion travels in each cardinal direction.
    pub blast_radius: u32,
}

/// Read-only snapshot describing every live bomb.
#[derive(Clone, Debug, Default)]
pub struct BombView {
    snapshots: Vec<BombSnapshot>,
}

impl BombView {
    /// Creates a new bomb view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BombSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured bomb snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &BombSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the bomb with the provided identifier, if it is still live.
    #[must_use]
    pub fn get(&self, bomb: BombId) -> Option<&BombSnapshot> {
        self.snapshots
            .binary_search_by_key(&bomb, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Live bomb lying on `cell`, if any.
    #[must_use]
    pub fn at(&self, cell: CellCoord) -> Option<&BombSnapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.cell == cell)
    }

    /// Number of live bombs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no bomb is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BombSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Cell currently occupied by the agent.
    pub cell: CellCoord,
    /// Who decides the agent's actions.
    pub control: ControlMode,
    /// Number of the agent's bombs that are still live.
    pub bombs_outstanding: u32,
    /// Maximum number of live bombs the agent may own.
    pub bomb_cap: u32,
    /// Blast radius applied to bombs the agent places.
    pub blast_radius: u32,
    /// Speed pickups collected, consumed by the movement layer.
    pub speed_bonus: u32,
}

impl AgentSnapshot {
    /// Reports whether the agent is below its concurrent-bomb cap.
    #[must_use]
    pub const fn below_bomb_cap(&self) -> bool {
        self.bombs_outstanding < self.bomb_cap
    }
}

/// Read-only snapshot describing every agent in the arena.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the agent with the provided identifier.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Live target supplied by the caller each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Identifier of the target.
    pub id: TargetId,
    /// Cell the target currently occupies.
    pub cell: CellCoord,
}
