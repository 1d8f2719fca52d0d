#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round context owning the world and the agent controller.
//!
//! A [`Round`] is built once at round start from a [`RoundSpec`] and then
//! driven by [`Round::tick`]. Each tick burns fuses and resolves explosions,
//! lets the controller decide on the settled state, and finally applies the
//! autonomous and external intents in that order.

use std::time::Duration;

use blast_arena_core::{
    AgentId, AgentIntent, ArenaConfig, CellCoord, Command, ConfigError, ControlMode, Event,
    MapError, MapSpec, TargetSnapshot,
};
use blast_arena_system_agent_control::AgentController;
use blast_arena_world::{self as world, query, GridMap, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Everything needed to set up a round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundSpec {
    /// Arena layout or generation parameters.
    pub map: MapSpec,
    /// Gameplay tuning.
    pub arena: ArenaConfig,
    /// Agents entering the arena at round start, in id order.
    pub agents: Vec<AgentSpec>,
}

/// Starting position and control mode of one agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Cell the agent spawns on. Must be an Open tile.
    pub spawn: CellCoord,
    /// Who drives the agent.
    pub control: ControlMode,
}

/// Reasons a round cannot be set up.
#[derive(Debug, Error)]
pub enum RoundError {
    /// The map could not be generated or parsed.
    #[error("invalid map: {0}")]
    Map(#[from] MapError),
    /// The arena tuning is out of range.
    #[error("invalid arena configuration: {0}")]
    Config(#[from] ConfigError),
    /// The world refused to spawn an agent.
    #[error("agent could not spawn at {0}")]
    SpawnRejected(CellCoord),
}

/// One running round: the authoritative world plus the systems reading it.
#[derive(Debug)]
pub struct Round {
    world: World,
    controller: AgentController,
    agents: Vec<AgentId>,
}

impl Round {
    /// Builds the map described by `spec` and spawns its agents.
    pub fn new(spec: &RoundSpec) -> Result<Self, RoundError> {
        spec.arena.validate()?;
        let spawns: Vec<CellCoord> = spec.agents.iter().map(|agent| agent.spawn).collect();
        let map = GridMap::from_spec(&spec.map, &spawns)?;
        Self::from_map(map, spec.arena.clone(), &spec.agents)
    }

    /// Starts a round on an already built map.
    pub fn from_map(
        map: GridMap,
        arena: ArenaConfig,
        agents: &[AgentSpec],
    ) -> Result<Self, RoundError> {
        arena.validate()?;
        let controller = AgentController::new(&arena);
        let mut world = World::new(map, arena);

        let mut spawned = Vec::with_capacity(agents.len());
        for agent in agents {
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::SpawnAgent {
                    cell: agent.spawn,
                    control: agent.control,
                },
                &mut events,
            );
            let id = events
                .iter()
                .find_map(|event| match event {
                    Event::AgentSpawned { agent, .. } => Some(*agent),
                    _ => None,
                })
                .ok_or(RoundError::SpawnRejected(agent.spawn))?;
            spawned.push(id);
        }

        let map = query::map(&world);
        info!(
            rows = map.rows(),
            columns = map.columns(),
            agents = spawned.len(),
            "round started"
        );
        Ok(Self {
            world,
            controller,
            agents: spawned,
        })
    }

    /// Advances the round by `dt`.
    ///
    /// `targets` lists the live targets for this tick. External intents are
    /// applied after the controller's, and only for agents under external
    /// control; intents naming any other agent are dropped.
    pub fn tick(
        &mut self,
        dt: Duration,
        targets: &[TargetSnapshot],
        external: &[(AgentId, AgentIntent)],
    ) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        let agents = query::agent_view(&self.world);
        let mut commands = Vec::new();
        self.controller.handle(
            &events,
            &query::map_view(&self.world),
            &query::bomb_view(&self.world),
            &agents,
            targets,
            &mut commands,
        );

        for &(agent, intent) in external {
            let is_external = agents
                .get(agent)
                .is_some_and(|snapshot| snapshot.control == ControlMode::External);
            if is_external {
                commands.push(Command::IssueIntent { agent, intent });
            } else {
                warn!(
                    agent = agent.get(),
                    ?intent,
                    "external intent for non-external agent dropped"
                );
            }
        }

        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        events
    }

    /// Applies a command outside the tick cycle, such as a remote trigger or
    /// the removal of a defeated agent.
    pub fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        events
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the agent controller.
    #[must_use]
    pub fn controller(&self) -> &AgentController {
        &self.controller
    }

    /// Identifiers of the agents spawned at round start, in spec order.
    #[must_use]
    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawns_on_blocked_tiles_fail_setup() {
        let spec = RoundSpec {
            map: MapSpec {
                layout: Some(vec!["###".to_owned(), "#.#".to_owned(), "###".to_owned()]),
                ..MapSpec::default()
            },
            agents: vec![AgentSpec {
                spawn: CellCoord::new(0, 0),
                control: ControlMode::Autonomous,
            }],
            ..RoundSpec::default()
        };

        let error = Round::new(&spec).expect_err("spawn on a wall");
        assert!(matches!(
            error,
            RoundError::Map(MapError::SpawnBlocked(cell)) if cell == CellCoord::new(0, 0)
        ));
    }

    #[test]
    fn invalid_tuning_fails_setup() {
        let spec = RoundSpec {
            arena: ArenaConfig {
                bomb_cap: 0,
                ..ArenaConfig::default()
            },
            ..RoundSpec::default()
        };

        let error = Round::new(&spec).expect_err("zero bomb cap");
        assert!(matches!(error, RoundError::Config(ConfigError::ZeroBombCap)));
    }

    #[test]
    fn default_spec_starts_an_empty_round() {
        let round = Round::new(&RoundSpec::default()).expect("default round");
        assert!(round.agents().is_empty());
        assert_eq!(query::map(round.world()).rows(), 11);
    }
}
