#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Blast Arena rounds without a renderer.

mod round_file;

use std::{collections::BTreeSet, fmt, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use blast_arena_core::{AgentId, AgentState, CellCoord, Command, ControlMode, Event, Passability};
use blast_arena_round::Round;
use blast_arena_world::query;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, trace};
use tracing_subscriber::{fmt as log_fmt, EnvFilter};

use crate::round_file::RoundFile;

#[derive(Parser)]
#[command(name = "blast-arena")]
#[command(about = "Headless bomberman arena runner", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a round and print a summary
    Run {
        /// TOML round description; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of ticks to simulate
        #[arg(long, default_value_t = 600)]
        ticks: u32,

        /// Simulated milliseconds per tick
        #[arg(long, default_value_t = 100)]
        dt_ms: u64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Entry point for the Blast Arena command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    log_fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            dt_ms,
            json,
        } => {
            let file = RoundFile::load(config.as_deref())?;
            let summary = run_round(&file, ticks, Duration::from_millis(dt_ms))?;
            if json {
                let text =
                    serde_json::to_string_pretty(&summary).context("failed to encode summary")?;
                println!("{text}");
            } else {
                print!("{summary}");
            }
            Ok(())
        }
    }
}

/// Runs `ticks` ticks of the described round, removing caught agents as the
/// game layer would, and stops early once no agent is left.
fn run_round(file: &RoundFile, ticks: u32, dt: Duration) -> Result<Summary> {
    let mut round = Round::new(&file.spec()).context("failed to set up round")?;
    let crates_at_start = query::map(round.world()).count(Passability::Destructible);
    let mut tally = Tally::default();

    for tick in 0..ticks {
        let events = round.tick(dt, &file.targets, &[]);
        let mut defeated = BTreeSet::new();
        for event in &events {
            trace!(tick, ?event, "event");
            tally.record(event);
            if let Event::AgentCaught { agent, .. } = event {
                let _ = defeated.insert(*agent);
            }
        }

        for agent in defeated {
            info!(tick, agent = agent.get(), "agent defeated");
            tally.agents_defeated += 1;
            let _ = round.apply(Command::RemoveAgent { agent });
        }

        if query::agent_view(round.world()).iter().next().is_none() {
            info!(tick, "no agents left");
            break;
        }
    }

    let map = query::map(round.world());
    let crates_destroyed = crates_at_start.saturating_sub(map.count(Passability::Destructible));
    let agents = query::agent_view(round.world())
        .iter()
        .map(|agent| AgentSummary {
            id: agent.id,
            cell: agent.cell,
            control: agent.control,
            state: round.controller().state(agent.id),
            bomb_cap: agent.bomb_cap,
            blast_radius: agent.blast_radius,
        })
        .collect();

    Ok(Summary {
        ticks: query::tick_index(round.world()),
        bombs_placed: tally.bombs_placed,
        detonations: tally.detonations,
        chain_reactions: tally.chain_reactions,
        crates_destroyed,
        pickups_collected: tally.pickups_collected,
        agents_defeated: tally.agents_defeated,
        agents,
        map: render(&round),
    })
}

/// Event counters accumulated over a run.
#[derive(Debug, Default)]
struct Tally {
    bombs_placed: usize,
    detonations: usize,
    chain_reactions: usize,
    pickups_collected: usize,
    agents_defeated: usize,
}

impl Tally {
    fn record(&mut self, event: &Event) {
        match event {
            Event::BombPlaced { .. } => self.bombs_placed += 1,
            Event::BombDetonated { .. } => self.detonations += 1,
            Event::ChainReaction { .. } => self.chain_reactions += 1,
            Event::PickupCollected { .. } => self.pickups_collected += 1,
            _ => {}
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Serialize)]
struct Summary {
    ticks: u64,
    bombs_placed: usize,
    detonations: usize,
    chain_reactions: usize,
    crates_destroyed: usize,
    pickups_collected: usize,
    agents_defeated: usize,
    agents: Vec<AgentSummary>,
    map: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AgentSummary {
    id: AgentId,
    cell: CellCoord,
    control: ControlMode,
    state: Option<AgentState>,
    bomb_cap: u32,
    blast_radius: u32,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ticks:             {}", self.ticks)?;
        writeln!(f, "bombs placed:      {}", self.bombs_placed)?;
        writeln!(f, "detonations:       {}", self.detonations)?;
        writeln!(f, "chain reactions:   {}", self.chain_reactions)?;
        writeln!(f, "crates destroyed:  {}", self.crates_destroyed)?;
        writeln!(f, "pickups collected: {}", self.pickups_collected)?;
        writeln!(f, "agents defeated:   {}", self.agents_defeated)?;
        for agent in &self.agents {
            let state = agent
                .state
                .map_or_else(|| "-".to_owned(), |state| format!("{state:?}"));
            writeln!(
                f,
                "agent {} at {} ({:?}, {state}, cap {}, radius {})",
                agent.id.get(),
                agent.cell,
                agent.control,
                agent.bomb_cap,
                agent.blast_radius
            )?;
        }
        writeln!(f)?;
        for row in &self.map {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// ASCII rendering of the arena with bombs (`o`) and agents (`A` autonomous,
/// `E` external) drawn over the terrain.
fn render(round: &Round) -> Vec<String> {
    let world = round.world();
    let mut rows: Vec<Vec<char>> = query::map(world)
        .to_layout()
        .into_iter()
        .map(|row| row.chars().collect())
        .collect();

    let mut mark = |cell: CellCoord, glyph: char| {
        if let Some(slot) = rows
            .get_mut(cell.row() as usize)
            .and_then(|row| row.get_mut(cell.column() as usize))
        {
            *slot = glyph;
        }
    };
    for bomb in query::bomb_view(world).iter() {
        mark(bomb.cell, 'o');
    }
    for agent in query::agent_view(world).iter() {
        let glyph = match agent.control {
            ControlMode::Autonomous => 'A',
            ControlMode::External => 'E',
        };
        mark(agent.cell, glyph);
    }

    rows.into_iter().map(|row| row.into_iter().collect()).collect()
}
