//! TOML description of a headless round.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use blast_arena_core::{ArenaConfig, CellCoord, ControlMode, MapSpec, TargetId, TargetSnapshot};
use blast_arena_round::{AgentSpec, RoundSpec};
use serde::Deserialize;

/// Round setup plus the targets fed to the controller every tick.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct RoundFile {
    /// Arena layout or generation parameters.
    pub(crate) map: MapSpec,
    /// Gameplay tuning.
    pub(crate) arena: ArenaConfig,
    /// Agents spawned at round start.
    pub(crate) agents: Vec<AgentSpec>,
    /// Static targets presented to autonomous agents.
    pub(crate) targets: Vec<TargetSnapshot>,
}

impl Default for RoundFile {
    fn default() -> Self {
        let map = MapSpec::default();
        let far_corner = CellCoord::new(map.rows - 2, map.columns - 2);
        Self {
            map,
            arena: ArenaConfig::default(),
            agents: vec![AgentSpec {
                spawn: CellCoord::new(1, 1),
                control: ControlMode::Autonomous,
            }],
            targets: vec![TargetSnapshot {
                id: TargetId::new(0),
                cell: far_corner,
            }],
        }
    }
}

impl RoundFile {
    /// Reads a round description from disk, or the defaults without a path.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read round file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Parses a round description from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid round description")
    }

    /// Round setup carried by this file.
    pub(crate) fn spec(&self) -> RoundSpec {
        RoundSpec {
            map: self.map.clone(),
            arena: self.arena.clone(),
            agents: self.agents.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layouts_agents_and_targets() {
        let text = r######"
            [map]
            layout = ["#####", "#...#", "#.+.#", "#####"]

            [arena]
            fuse_secs = 1.5
            bomb_cap = 2

            [[agents]]
            spawn = { row = 1, column = 1 }
            control = "Autonomous"

            [[agents]]
            spawn = { row = 2, column = 3 }
            control = "External"

            [[targets]]
            id = 4
            cell = { row = 1, column = 3 }
        "######;

        let file = RoundFile::parse(text).expect("valid round file");
        assert_eq!(file.map.layout.as_ref().map(Vec::len), Some(4));
        assert_eq!(file.arena.fuse_secs, 1.5);
        assert_eq!(file.arena.bomb_cap, 2);
        assert_eq!(file.arena.drop_chance, ArenaConfig::default().drop_chance);
        assert_eq!(file.agents.len(), 2);
        assert_eq!(file.agents[1].control, ControlMode::External);
        assert_eq!(
            file.targets,
            vec![TargetSnapshot {
                id: TargetId::new(4),
                cell: CellCoord::new(1, 3),
            }]
        );
    }

    #[test]
    fn omitted_sections_keep_their_defaults() {
        let file = RoundFile::parse("[map]\nseed = 7").expect("partial file");
        assert_eq!(file.map.seed, 7);
        assert_eq!(file.map.rows, MapSpec::default().rows);
        assert_eq!(file.agents, RoundFile::default().agents);
        assert_eq!(file.arena, ArenaConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let file = RoundFile::load(None).expect("defaults");
        assert_eq!(file, RoundFile::default());
        assert_eq!(file.targets[0].cell, CellCoord::new(9, 11));
    }

    #[test]
    fn malformed_files_are_reported() {
        assert!(RoundFile::parse("[arena]\nbomb_cap = \"many\"").is_err());
    }
}
