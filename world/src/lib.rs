#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Blast Arena.

use std::collections::{BTreeSet, VecDeque};

use blast_arena_core::{
    AgentId, AgentIntent, AgentSnapshot, ArenaConfig, BombId, CellCoord, Command, ControlMode,
    Direction, Event, Passability, PickupKind, PlacementError, Tile,
};
use tracing::{debug, trace, warn};

mod bombs;
mod explosion;
mod map;

pub use map::GridMap;

use bombs::BombRegistry;
use explosion::PickupDropper;

/// Represents the authoritative Blast Arena world state.
#[derive(Debug)]
pub struct World {
    map: GridMap,
    config: ArenaConfig,
    bombs: BombRegistry,
    agents: Vec<AgentRecord>,
    next_agent_id: AgentId,
    drops: PickupDropper,
    tick_index: u64,
}

impl World {
    /// Creates a world over `map` tuned by an already validated `config`.
    #[must_use]
    pub fn new(map: GridMap, config: ArenaConfig) -> Self {
        let drops = PickupDropper::new(&config);
        Self {
            map,
            config,
            bombs: BombRegistry::new(),
            agents: Vec::new(),
            next_agent_id: AgentId::new(0),
            drops,
            tick_index: 0,
        }
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents
            .binary_search_by_key(&agent, |record| record.id)
            .ok()
    }

    fn agent_mut(&mut self, agent: AgentId) -> Option<&mut AgentRecord> {
        let index = self.agent_index(agent)?;
        self.agents.get_mut(index)
    }

    fn spawn_agent(&mut self, cell: CellCoord, control: ControlMode, out_events: &mut Vec<Event>) {
        if !self.map.view().is_walkable(cell) {
            debug!(%cell, "spawn rejected on non-open tile");
            out_events.push(Event::AgentSpawnRejected { cell });
            return;
        }

        let id = self.next_agent_id;
        self.next_agent_id = AgentId::new(id.get().wrapping_add(1));
        self.agents.push(AgentRecord {
            id,
            cell,
            control,
            bombs_outstanding: 0,
            bomb_cap: self.config.bomb_cap,
            blast_radius: self.config.base_blast_radius,
            speed_bonus: 0,
        });
        debug!(agent = id.get(), %cell, ?control, "agent spawned");
        out_events.push(Event::AgentSpawned {
            agent: id,
            cell,
            control,
        });
    }

    fn step_agent(&mut self, agent: AgentId, direction: Direction, out_events: &mut Vec<Event>) {
        let view = self.map.view();
        let Some(index) = self.agent_index(agent) else {
            return;
        };
        let from = self.agents[index].cell;
        let destination = view
            .neighbor(from, direction)
            .filter(|cell| view.is_walkable(*cell));
        let Some(to) = destination else {
            trace!(agent = agent.get(), ?direction, "step blocked");
            out_events.push(Event::AgentBlocked { agent, direction });
            return;
        };

        self.agents[index].cell = to;
        out_events.push(Event::AgentAdvanced { agent, from, to });

        let Some(kind) = self.map.get(to).and_then(|tile| tile.pickup()) else {
            return;
        };
        let growth = self.config.blast_radius_growth;
        let record = &mut self.agents[index];
        match kind {
            PickupKind::BlastRadius => {
                record.blast_radius = record.blast_radius.saturating_add(growth);
            }
            PickupKind::ExtraBomb => record.bomb_cap = record.bomb_cap.saturating_add(1),
            PickupKind::Speed => record.speed_bonus = record.speed_bonus.saturating_add(1),
        }
        let _ = self.map.set(to, Tile::OPEN);
        debug!(agent = agent.get(), cell = %to, ?kind, "pickup collected");
        out_events.push(Event::PickupCollected {
            agent,
            cell: to,
            kind,
        });
        out_events.push(Event::TileChanged {
            cell: to,
            passability: Passability::Open,
            pickup: None,
        });
    }

    fn place_bomb(&mut self, agent: AgentId) -> Result<Event, PlacementError> {
        let index = self
            .agent_index(agent)
            .ok_or(PlacementError::MissingAgent)?;
        let record = &self.agents[index];
        if self.bombs.at(record.cell).is_some() {
            return Err(PlacementError::Occupied);
        }
        if record.bombs_outstanding >= record.bomb_cap {
            return Err(PlacementError::CapReached);
        }

        let cell = record.cell;
        let blast_radius = record.blast_radius;
        let bomb = self
            .bombs
            .arm(agent, cell, self.config.fuse(), blast_radius);
        self.agents[index].bombs_outstanding += 1;
        Ok(Event::BombPlaced {
            bomb,
            cell,
            owner: agent,
            blast_radius,
        })
    }

    fn detonate(&mut self, due: Vec<BombId>, out_events: &mut Vec<Event>) {
        let mut queued: BTreeSet<BombId> = due.iter().copied().collect();
        let mut pending: VecDeque<BombId> = due.into();

        while let Some(id) = pending.pop_front() {
            let Some(bomb) = self.bombs.take(id) else {
                continue;
            };
            if let Some(owner) = self.agent_mut(bomb.owner) {
                owner.bombs_outstanding = owner.bombs_outstanding.saturating_sub(1);
            }

            debug!(
                bomb = bomb.id.get(),
                cell = %bomb.cell,
                radius = bomb.blast_radius,
                "bomb detonated"
            );
            out_events.push(Event::BombDetonated {
                bomb: bomb.id,
                cell: bomb.cell,
                blast_radius: bomb.blast_radius,
                owner: bomb.owner,
            });

            let reached = explosion::propagate(
                &bomb,
                &mut self.map,
                &self.bombs,
                &self.agents,
                &mut self.drops,
                out_events,
            );
            for other in reached {
                let _ = self.bombs.force_detonation(other);
                if queued.insert(other) {
                    debug!(bomb = other.get(), triggered_by = bomb.id.get(), "chain reaction");
                    out_events.push(Event::ChainReaction {
                        bomb: other,
                        triggered_by: bomb.id,
                    });
                    pending.push_back(other);
                }
            }
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });

            let due = world.bombs.advance(dt);
            if !due.is_empty() {
                world.detonate(due, out_events);
            }
        }
        Command::SpawnAgent { cell, control } => world.spawn_agent(cell, control, out_events),
        Command::IssueIntent { agent, intent } => {
            if world.agent_index(agent).is_none() {
                warn!(agent = agent.get(), ?intent, "intent for unknown agent");
                if intent == AgentIntent::PlaceBomb {
                    out_events.push(Event::BombPlacementRejected {
                        agent,
                        reason: PlacementError::MissingAgent,
                    });
                }
                return;
            }

            out_events.push(Event::IntentIssued { agent, intent });
            match intent {
                AgentIntent::Step(direction) => world.step_agent(agent, direction, out_events),
                AgentIntent::PlaceBomb => match world.place_bomb(agent) {
                    Ok(event) => out_events.push(event),
                    Err(reason) => {
                        let external = world.agent_index(agent).is_some_and(|index| {
                            world.agents[index].control == ControlMode::External
                        });
                        if external {
                            warn!(agent = agent.get(), ?reason, "placement rejected");
                        } else {
                            trace!(agent = agent.get(), ?reason, "placement rejected");
                        }
                        out_events.push(Event::BombPlacementRejected { agent, reason });
                    }
                },
            }
        }
        Command::TriggerBomb { bomb } => {
            if world.bombs.force_detonation(bomb) {
                debug!(bomb = bomb.get(), "fuse cut");
            }
        }
        Command::RemoveAgent { agent } => {
            if let Some(index) = world.agent_index(agent) {
                let _ = world.agents.remove(index);
                debug!(agent = agent.get(), "agent removed");
                out_events.push(Event::AgentRemoved { agent });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{GridMap, World};
    use blast_arena_core::{
        AgentId, AgentSnapshot, AgentView, ArenaConfig, BombId, BombSnapshot, BombView, CellCoord,
        MapView,
    };

    /// Provides read-only access to the world's tile grid.
    #[must_use]
    pub fn map(world: &World) -> &GridMap {
        &world.map
    }

    /// Captures a read-only view of the tile grid handed to systems.
    #[must_use]
    pub fn map_view(world: &World) -> MapView<'_> {
        world.map.view()
    }

    /// Captures a read-only view of every live bomb.
    #[must_use]
    pub fn bomb_view(world: &World) -> BombView {
        BombView::from_snapshots(world.bombs.iter().map(|bomb| bomb.snapshot()).collect())
    }

    /// Snapshot of a single live bomb.
    #[must_use]
    pub fn bomb(world: &World, bomb: BombId) -> Option<BombSnapshot> {
        world.bombs.get(bomb).map(|state| state.snapshot())
    }

    /// Snapshot of the live bomb lying on `cell`.
    #[must_use]
    pub fn bomb_at(world: &World, cell: CellCoord) -> Option<BombSnapshot> {
        world.bombs.at(cell).map(|state| state.snapshot())
    }

    /// Captures a read-only view of every agent in the arena.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(world.agents.iter().map(|agent| agent.snapshot()).collect())
    }

    /// Snapshot of a single agent.
    #[must_use]
    pub fn agent(world: &World, agent: AgentId) -> Option<AgentSnapshot> {
        let index = world.agent_index(agent)?;
        world.agents.get(index).map(|record| record.snapshot())
    }

    /// Tuning the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &ArenaConfig {
        &world.config
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}

#[derive(Clone, Debug)]
struct AgentRecord {
    id: AgentId,
    cell: CellCoord,
    control: ControlMode,
    bombs_outstanding: u32,
    bomb_cap: u32,
    blast_radius: u32,
    speed_bonus: u32,
}

impl AgentRecord {
    fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            cell: self.cell,
            control: self.control,
            bombs_outstanding: self.bombs_outstanding,
            bomb_cap: self.bomb_cap,
            blast_radius: self.blast_radius,
            speed_bonus: self.speed_bonus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn world_from(rows: &[&str]) -> World {
        let map = GridMap::from_layout(rows).expect("valid layout");
        let config = ArenaConfig {
            drop_chance: 0.0,
            ..ArenaConfig::default()
        };
        World::new(map, config)
    }

    fn spawn(world: &mut World, cell: CellCoord) -> AgentId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnAgent {
                cell,
                control: ControlMode::External,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::AgentSpawned { agent, .. }] => *agent,
            other => panic!("unexpected spawn events: {other:?}"),
        }
    }

    #[test]
    fn spawning_on_walls_is_rejected() {
        let mut world = world_from(&["###", "#.#", "###"]);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SpawnAgent {
                cell: CellCoord::new(0, 0),
                control: ControlMode::Autonomous,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::AgentSpawnRejected {
                cell: CellCoord::new(0, 0)
            }]
        );
        assert!(query::agent_view(&world).into_vec().is_empty());
    }

    #[test]
    fn steps_move_only_onto_open_tiles() {
        let mut world = world_from(&["#####", "#..+#", "#####"]);
        let agent = spawn(&mut world, CellCoord::new(1, 1));
        let mut events = Vec::new();

        let step_east = Command::IssueIntent {
            agent,
            intent: AgentIntent::Step(Direction::East),
        };
        apply(&mut world, step_east.clone(), &mut events);
        apply(&mut world, step_east, &mut events);

        assert_eq!(
            events,
            vec![
                Event::IntentIssued {
                    agent,
                    intent: AgentIntent::Step(Direction::East)
                },
                Event::AgentAdvanced {
                    agent,
                    from: CellCoord::new(1, 1),
                    to: CellCoord::new(1, 2)
                },
                Event::IntentIssued {
                    agent,
                    intent: AgentIntent::Step(Direction::East)
                },
                Event::AgentBlocked {
                    agent,
                    direction: Direction::East
                },
            ]
        );
    }

    #[test]
    fn pickups_upgrade_the_collecting_agent() {
        let mut world = world_from(&["######", "#.rbs#", "######"]);
        let agent = spawn(&mut world, CellCoord::new(1, 1));
        let mut events = Vec::new();

        for _ in 0..3 {
            apply(
                &mut world,
                Command::IssueIntent {
                    agent,
                    intent: AgentIntent::Step(Direction::East),
                },
                &mut events,
            );
        }

        let snapshot = query::agent(&world, agent).expect("agent exists");
        assert_eq!(snapshot.blast_radius, 3);
        assert_eq!(snapshot.bomb_cap, 2);
        assert_eq!(snapshot.speed_bonus, 1);
        assert_eq!(query::map(&world).to_layout()[1], "#....#");
        assert!(events.contains(&Event::PickupCollected {
            agent,
            cell: CellCoord::new(1, 3),
            kind: PickupKind::ExtraBomb,
        }));
    }

    #[test]
    fn placement_respects_occupancy_and_cap() {
        let mut world = world_from(&["#####", "#...#", "#####"]);
        let agent = spawn(&mut world, CellCoord::new(1, 1));
        let mut events = Vec::new();
        let place = Command::IssueIntent {
            agent,
            intent: AgentIntent::PlaceBomb,
        };

        apply(&mut world, place.clone(), &mut events);
        apply(&mut world, place.clone(), &mut events);
        apply(
            &mut world,
            Command::IssueIntent {
                agent,
                intent: AgentIntent::Step(Direction::East),
            },
            &mut events,
        );
        apply(&mut world, place, &mut events);

        let rejections: Vec<PlacementError> = events
            .iter()
            .filter_map(|event| match event {
                Event::BombPlacementRejected { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            rejections,
            vec![PlacementError::Occupied, PlacementError::CapReached]
        );
        assert_eq!(query::bomb_view(&world).len(), 1);

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::IssueIntent {
                agent: AgentId::new(42),
                intent: AgentIntent::PlaceBomb,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::BombPlacementRejected {
                agent: AgentId::new(42),
                reason: PlacementError::MissingAgent
            }]
        );
    }

    #[test]
    fn fuse_burns_down_across_ticks() {
        let mut world = world_from(&["#####", "#...#", "#####"]);
        let agent = spawn(&mut world, CellCoord::new(1, 1));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::IssueIntent {
                agent,
                intent: AgentIntent::PlaceBomb,
            },
            &mut events,
        );

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(1500),
            },
            &mut events,
        );
        let bomb = query::bomb_at(&world, CellCoord::new(1, 1)).expect("bomb is live");
        assert_eq!(bomb.fuse_remaining, Duration::from_millis(500));

        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(500),
            },
            &mut events,
        );
        assert!(query::bomb_view(&world).is_empty());
        assert_eq!(
            query::agent(&world, agent).map(|agent| agent.bombs_outstanding),
            Some(0)
        );
        assert!(events.contains(&Event::AgentCaught {
            agent,
            cell: CellCoord::new(1, 1),
            bomb: bomb.id,
        }));
        assert_eq!(query::tick_index(&world), 2);
    }

    #[test]
    fn removed_agents_leave_their_bombs_armed() {
        let mut world = world_from(&["#####", "#...#", "#####"]);
        let agent = spawn(&mut world, CellCoord::new(1, 1));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::IssueIntent {
                agent,
                intent: AgentIntent::PlaceBomb,
            },
            &mut events,
        );
        apply(&mut world, Command::RemoveAgent { agent }, &mut events);
        assert!(events.contains(&Event::AgentRemoved { agent }));

        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(5),
            },
            &mut events,
        );
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::BombDetonated { owner, .. } if *owner == agent)));
    }
}
