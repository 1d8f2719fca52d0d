//! Cross-shaped blast propagation and pickup drops.

use blast_arena_core::{
    ArenaConfig, BombId, CellCoord, Direction, Event, Passability, PickupKind, Tile,
};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng, SeedableRng,
};
use rand_chacha::ChaCha8Rng;

use crate::{bombs::BombRegistry, bombs::BombState, map::GridMap, AgentRecord};

/// Seeded source of pickups revealed by destroyed crates.
#[derive(Debug)]
pub(crate) struct PickupDropper {
    rng: ChaCha8Rng,
    drop_chance: f64,
    kinds: [PickupKind; 3],
    weights: Option<WeightedIndex<u32>>,
}

impl PickupDropper {
    pub(crate) fn new(config: &ArenaConfig) -> Self {
        let entries = config.pickup_weights.entries();
        let weights = WeightedIndex::new(entries.iter().map(|(_, weight)| *weight)).ok();
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            drop_chance: f64::from(config.drop_chance.clamp(0.0, 1.0)),
            kinds: entries.map(|(kind, _)| kind),
            weights,
        }
    }

    /// Rolls for a pickup. Without any weighted kind nothing ever drops.
    pub(crate) fn roll(&mut self) -> Option<PickupKind> {
        let weights = self.weights.as_ref()?;
        if self.drop_chance <= 0.0 || !self.rng.gen_bool(self.drop_chance) {
            return None;
        }
        Some(self.kinds[weights.sample(&mut self.rng)])
    }
}

/// Applies the explosion of `bomb`, which must already be removed from the
/// registry.
///
/// The centre is always struck. Each arm then walks up to `blast_radius`
/// tiles: Solid tiles and the grid edge stop it unmarked, a Destructible tile
/// is struck, destroyed and stops it, and Open tiles are struck and let it
/// continue. Returns the live bombs reached by the blast in propagation order.
pub(crate) fn propagate(
    bomb: &BombState,
    map: &mut GridMap,
    bombs: &BombRegistry,
    agents: &[AgentRecord],
    drops: &mut PickupDropper,
    out: &mut Vec<Event>,
) -> Vec<BombId> {
    let mut reached = Vec::new();
    strike(bomb, bomb.cell, bombs, agents, &mut reached, out);

    for direction in Direction::ALL {
        let mut cell = bomb.cell;
        for _ in 0..bomb.blast_radius {
            let Some(next) = map.view().neighbor(cell, direction) else {
                break;
            };
            cell = next;

            let tile = map[cell];
            match tile.passability() {
                Passability::Solid => break,
                Passability::Open => strike(bomb, cell, bombs, agents, &mut reached, out),
                Passability::Destructible => {
                    strike(bomb, cell, bombs, agents, &mut reached, out);
                    let pickup = drops.roll();
                    let _ = map.set(cell, Tile::new(Passability::Open, pickup));
                    out.push(Event::TileChanged {
                        cell,
                        passability: Passability::Open,
                        pickup,
                    });
                    break;
                }
            }
        }
    }

    reached
}

fn strike(
    bomb: &BombState,
    cell: CellCoord,
    bombs: &BombRegistry,
    agents: &[AgentRecord],
    reached: &mut Vec<BombId>,
    out: &mut Vec<Event>,
) {
    out.push(Event::TileBlasted { cell });
    for agent in agents.iter().filter(|agent| agent.cell == cell) {
        out.push(Event::AgentCaught {
            agent: agent.id,
            cell,
            bomb: bomb.id,
        });
    }
    if let Some(other) = bombs.at(cell) {
        reached.push(other.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_arena_core::{AgentId, PickupWeights};
    use std::time::Duration;

    fn detonate(rows: &[&str], cell: CellCoord, radius: u32) -> (GridMap, Vec<Event>) {
        let mut map = GridMap::from_layout(rows).expect("valid layout");
        let bomb = BombState {
            id: BombId::new(9),
            owner: AgentId::new(0),
            cell,
            fuse_total: Duration::from_secs(1),
            fuse_remaining: Duration::ZERO,
            blast_radius: radius,
        };
        let config = ArenaConfig {
            drop_chance: 0.0,
            ..ArenaConfig::default()
        };
        let mut drops = PickupDropper::new(&config);
        let mut events = Vec::new();
        let reached = propagate(
            &bomb,
            &mut map,
            &BombRegistry::new(),
            &[],
            &mut drops,
            &mut events,
        );
        assert!(reached.is_empty());
        (map, events)
    }

    fn blasted(events: &[Event]) -> Vec<CellCoord> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::TileBlasted { cell } => Some(*cell),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn solid_tiles_stop_the_arm_unmarked() {
        let rows = ["#######", "#.....#", "#..#..#", "#.....#", "#######"];
        let (_, events) = detonate(&rows, CellCoord::new(2, 2), 3);

        let cells = blasted(&events);
        assert_eq!(cells[0], CellCoord::new(2, 2));
        assert!(cells.contains(&CellCoord::new(2, 1)));
        assert!(!cells.contains(&CellCoord::new(2, 3)));
        assert!(!cells.contains(&CellCoord::new(2, 4)));
        assert!(!cells.contains(&CellCoord::new(0, 2)));
    }

    #[test]
    fn crates_absorb_the_blast() {
        let rows = ["#######", "#.+++.#", "#######"];
        let (map, events) = detonate(&rows, CellCoord::new(1, 1), 4);

        assert_eq!(
            blasted(&events),
            vec![CellCoord::new(1, 1), CellCoord::new(1, 2)]
        );
        assert_eq!(map[CellCoord::new(1, 2)], Tile::OPEN);
        assert_eq!(map[CellCoord::new(1, 3)], Tile::DESTRUCTIBLE);
        assert!(events.contains(&Event::TileChanged {
            cell: CellCoord::new(1, 2),
            passability: Passability::Open,
            pickup: None,
        }));
    }

    #[test]
    fn destroyed_crates_only_reveal_rolled_pickups() {
        let mut map = GridMap::from_layout(&["#####", "#.+.#", "#####"]).expect("valid layout");
        let crate_cell = CellCoord::new(1, 2);
        let _ = map.set(
            crate_cell,
            Tile::new(Passability::Destructible, Some(PickupKind::Speed)),
        );
        let bomb = BombState {
            id: BombId::new(0),
            owner: AgentId::new(0),
            cell: CellCoord::new(1, 1),
            fuse_total: Duration::from_secs(1),
            fuse_remaining: Duration::ZERO,
            blast_radius: 2,
        };
        let config = ArenaConfig {
            drop_chance: 0.0,
            ..ArenaConfig::default()
        };
        let mut drops = PickupDropper::new(&config);
        let mut events = Vec::new();
        let _ = propagate(
            &bomb,
            &mut map,
            &BombRegistry::new(),
            &[],
            &mut drops,
            &mut events,
        );

        assert_eq!(map[crate_cell], Tile::OPEN);
        assert!(events.contains(&Event::TileChanged {
            cell: crate_cell,
            passability: Passability::Open,
            pickup: None,
        }));
    }

    #[test]
    fn open_arms_reach_exactly_the_radius() {
        let rows = ["#########", "#.......#", "#########"];
        let (_, events) = detonate(&rows, CellCoord::new(1, 1), 3);

        assert_eq!(
            blasted(&events),
            vec![
                CellCoord::new(1, 1),
                CellCoord::new(1, 2),
                CellCoord::new(1, 3),
                CellCoord::new(1, 4),
            ]
        );
    }

    #[test]
    fn certain_drops_follow_the_weights() {
        let config = ArenaConfig {
            drop_chance: 1.0,
            pickup_weights: PickupWeights {
                blast_radius: 0,
                extra_bomb: 5,
                speed: 0,
            },
            ..ArenaConfig::default()
        };
        let mut drops = PickupDropper::new(&config);
        for _ in 0..16 {
            assert_eq!(drops.roll(), Some(PickupKind::ExtraBomb));
        }
    }

    #[test]
    fn disabled_drops_never_roll() {
        let config = ArenaConfig {
            drop_chance: 0.0,
            ..ArenaConfig::default()
        };
        let mut drops = PickupDropper::new(&config);
        assert!((0..64).all(|_| drops.roll().is_none()));
    }
}
