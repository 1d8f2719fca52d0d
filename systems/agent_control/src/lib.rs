#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick tactical state machine driving autonomous agents.
//!
//! Each tick every autonomous agent is evaluated once, in ascending id order,
//! against the priorities Evade, PlaceBomb, Chase and Explore. The controller
//! only reads immutable views and answers with [`Command::IssueIntent`]
//! values; it never emits a step onto a tile that is not Open.

use std::{collections::BTreeMap, time::Duration};

use blast_arena_core::{
    AgentId, AgentIntent, AgentSnapshot, AgentState, AgentView, ArenaConfig, BombId,
    BombSnapshot, BombView, CellCoord, Command, ControlMode, Direction, Event, MapView,
    Passability, TargetSnapshot,
};
use blast_arena_system_hazard::HazardAnalyzer;
use blast_arena_system_pathfinding::PathFinder;
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

mod tactics;

use tactics::{
    in_line_of_fire, is_safe_step, nearest_target, next_on_path, path_is_stale, touches_crate,
    STRIKE_RANGE,
};

/// Placeholder identifier of a bomb requested this tick but not yet armed.
const PENDING_BOMB_ID: BombId = BombId::new(u32::MAX);

/// Stream of the shared seed reserved for controller decisions.
const CONTROLLER_STREAM: u64 = 1;

/// Pure system that turns world snapshots into agent intents.
#[derive(Debug)]
pub struct AgentController {
    memories: BTreeMap<AgentId, AgentMemory>,
    path_finder: PathFinder,
    rng: ChaCha8Rng,
    fuse: Duration,
    placement_cooldown: Duration,
}

/// Everything the controller remembers about one agent between ticks.
#[derive(Clone, Debug, Default)]
struct AgentMemory {
    state: AgentState,
    path: Vec<CellCoord>,
    explore_target: Option<CellCoord>,
    cooldown: Duration,
}

enum ChaseOutcome {
    Step(Direction),
    Hold,
    Unreachable,
}

impl AgentController {
    /// Creates a controller using the fuse, cooldown and seed of `config`.
    #[must_use]
    pub fn new(config: &ArenaConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        rng.set_stream(CONTROLLER_STREAM);
        Self {
            memories: BTreeMap::new(),
            path_finder: PathFinder::new(),
            rng,
            fuse: config.fuse(),
            placement_cooldown: config.placement_cooldown(),
        }
    }

    /// State the agent settled in during the last evaluated tick.
    #[must_use]
    pub fn state(&self, agent: AgentId) -> Option<AgentState> {
        self.memories.get(&agent).map(|memory| memory.state)
    }

    /// Consumes world events and immutable views to emit agent intents.
    ///
    /// Nothing is decided unless `events` contains a [`Event::TimeAdvanced`].
    pub fn handle(
        &mut self,
        events: &[Event],
        map: &MapView<'_>,
        bombs: &BombView,
        agents: &AgentView,
        targets: &[TargetSnapshot],
        out: &mut Vec<Command>,
    ) {
        let mut elapsed = Duration::ZERO;
        let mut ticked = false;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    elapsed = elapsed.saturating_add(*dt);
                    ticked = true;
                }
                Event::AgentRemoved { agent } => {
                    let _ = self.memories.remove(agent);
                }
                _ => {}
            }
        }
        if !ticked {
            return;
        }

        self.memories.retain(|id, _| agents.get(*id).is_some());

        let mut live = bombs.clone();
        for agent in agents
            .iter()
            .filter(|agent| agent.control == ControlMode::Autonomous)
        {
            let mut memory = self.memories.remove(&agent.id).unwrap_or_default();
            memory.cooldown = memory.cooldown.saturating_sub(elapsed);
            let previous = memory.state;

            self.decide(agent, &mut memory, map, &mut live, targets, out);

            if memory.state != previous {
                debug!(
                    agent = agent.id.get(),
                    from = ?previous,
                    to = ?memory.state,
                    "agent state changed"
                );
            }
            let _ = self.memories.insert(agent.id, memory);
        }
    }

    fn decide(
        &mut self,
        agent: &AgentSnapshot,
        memory: &mut AgentMemory,
        map: &MapView<'_>,
        live: &mut BombView,
        targets: &[TargetSnapshot],
        out: &mut Vec<Command>,
    ) {
        if evade(agent, memory, map, live, out) {
            return;
        }

        let striking = targets.iter().any(|target| {
            agent.cell.chebyshev_distance(target.cell) <= STRIKE_RANGE
                && in_line_of_fire(map, agent.cell, target.cell, agent.blast_radius)
        });
        if striking && agent.below_bomb_cap() && memory.cooldown.is_zero() {
            memory.state = AgentState::PlaceBomb;
            self.place_bomb(agent, memory, live, out);
            let _ = evade(agent, memory, map, live, out);
            return;
        }

        match nearest_target(agent.cell, targets) {
            Some(target) => match self.chase(agent, memory, map, live, target.cell) {
                ChaseOutcome::Step(direction) => {
                    memory.state = AgentState::Chase;
                    out.push(step(agent.id, direction));
                    return;
                }
                ChaseOutcome::Hold => {
                    memory.state = AgentState::Chase;
                    return;
                }
                ChaseOutcome::Unreachable => {}
            },
            None => memory.path.clear(),
        }

        memory.state = AgentState::Idle;
        self.explore(agent, memory, map, live, out);
    }

    fn chase(
        &mut self,
        agent: &AgentSnapshot,
        memory: &mut AgentMemory,
        map: &MapView<'_>,
        live: &BombView,
        goal: CellCoord,
    ) -> ChaseOutcome {
        let hazards = HazardAnalyzer::new(live);
        if path_is_stale(&memory.path, agent.cell, goal, map, &hazards) {
            memory.path = self
                .path_finder
                .find_safe_path(map, &hazards, agent.cell, goal);
            debug!(
                agent = agent.id.get(),
                %goal,
                length = memory.path.len(),
                "chase path recomputed"
            );
        }
        if memory.path.is_empty() {
            return ChaseOutcome::Unreachable;
        }

        let next = next_on_path(&memory.path, agent.cell);
        match next.and_then(|next| agent.cell.direction_to(next)) {
            Some(direction) => ChaseOutcome::Step(direction),
            None => ChaseOutcome::Hold,
        }
    }

    fn explore(
        &mut self,
        agent: &AgentSnapshot,
        memory: &mut AgentMemory,
        map: &MapView<'_>,
        live: &mut BombView,
        out: &mut Vec<Command>,
    ) {
        let placement_legal = agent.below_bomb_cap()
            && memory.cooldown.is_zero()
            && live.at(agent.cell).is_none();
        if placement_legal && touches_crate(map, agent.cell) {
            self.place_bomb(agent, memory, live, out);
            let _ = evade(agent, memory, map, live, out);
            return;
        }

        let crate_standing = memory
            .explore_target
            .is_some_and(|cell| map.passability(cell) == Some(Passability::Destructible));
        if !crate_standing {
            memory.explore_target = self.pick_crate(map);
        }

        let hazards = HazardAnalyzer::new(live);
        if let Some(target) = memory.explore_target {
            let route = Direction::ALL
                .iter()
                .filter_map(|direction| map.neighbor(target, *direction))
                .filter(|cell| map.is_walkable(*cell))
                .map(|goal| {
                    self.path_finder
                        .find_safe_path(map, &hazards, agent.cell, goal)
                })
                .find(|path| !path.is_empty());

            match route {
                Some(path) => {
                    let direction = path
                        .get(1)
                        .and_then(|next| agent.cell.direction_to(*next));
                    if let Some(direction) = direction {
                        out.push(step(agent.id, direction));
                        return;
                    }
                }
                None => memory.explore_target = None,
            }
        }

        let options: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|direction| is_safe_step(map, &hazards, agent.cell, *direction))
            .collect();
        match options.choose(&mut self.rng) {
            Some(direction) => out.push(step(agent.id, *direction)),
            None => trace!(agent = agent.id.get(), "no safe move; holding"),
        }
    }

    fn pick_crate(&mut self, map: &MapView<'_>) -> Option<CellCoord> {
        let crates: Vec<CellCoord> = map
            .iter()
            .filter(|(_, tile)| tile.passability() == Passability::Destructible)
            .map(|(cell, _)| cell)
            .collect();
        crates.choose(&mut self.rng).copied()
    }

    /// Requests a bomb on the agent's tile and records it as pending so the
    /// rest of the tick treats it as live.
    fn place_bomb(
        &self,
        agent: &AgentSnapshot,
        memory: &mut AgentMemory,
        live: &mut BombView,
        out: &mut Vec<Command>,
    ) {
        memory.cooldown = self.placement_cooldown;
        if live.at(agent.cell).is_some() {
            return;
        }

        out.push(Command::IssueIntent {
            agent: agent.id,
            intent: AgentIntent::PlaceBomb,
        });
        let mut snapshots = std::mem::take(live).into_vec();
        snapshots.push(BombSnapshot {
            id: PENDING_BOMB_ID,
            owner: agent.id,
            cell: agent.cell,
            fuse_total: self.fuse,
            fuse_remaining: self.fuse,
            blast_radius: agent.blast_radius,
        });
        *live = BombView::from_snapshots(snapshots);
    }
}

/// Moves the agent off a dangerous tile onto the first safe neighbour.
///
/// Returns `true` when the agent's tile is dangerous, whether or not a safe
/// neighbour existed.
fn evade(
    agent: &AgentSnapshot,
    memory: &mut AgentMemory,
    map: &MapView<'_>,
    live: &BombView,
    out: &mut Vec<Command>,
) -> bool {
    let hazards = HazardAnalyzer::new(live);
    if !hazards.is_dangerous(agent.cell) {
        return false;
    }

    memory.state = AgentState::Evade;
    memory.path.clear();
    match Direction::ALL
        .into_iter()
        .find(|direction| is_safe_step(map, &hazards, agent.cell, *direction))
    {
        Some(direction) => out.push(step(agent.id, direction)),
        None => trace!(agent = agent.id.get(), "trapped; holding"),
    }
    true
}

fn step(agent: AgentId, direction: Direction) -> Command {
    Command::IssueIntent {
        agent,
        intent: AgentIntent::Step(direction),
    }
}
