//! Tumble Headless Runner
//!
//! Builds a small demo board, drops a few balls through it and logs where
//! they go. Usage: `tumble-headless [config.json] [ticks]`.

use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tumble_core::{Part, PartType, SimConfig, Simulation};

const DEFAULT_TICKS: u32 = 1200;

fn load_config(path: &Path) -> anyhow::Result<SimConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    SimConfig::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
}

/// Two ramps feeding a bit, with a gear pair beside it.
fn build_demo(sim: &mut Simulation) {
    let board = &mut sim.board;
    board.set_part(Part::new(PartType::Ramp), 2, 2);
    let mut flipped = Part::new(PartType::Ramp);
    flipped.set_flipped(true);
    board.set_part(flipped, 4, 4);
    board.set_part(Part::new(PartType::Bit), 2, 6);
    board.set_part(Part::new(PartType::Gearbit), 4, 6);
    board.set_part(Part::new(PartType::Gear), 5, 6);
    board.set_part(Part::new(PartType::Crossover), 4, 8);

    for column in [1.8, 2.2] {
        board.add_ball(Part::new(PartType::Ball), column, 0.5);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => SimConfig::default(),
    };
    let ticks = match args.next() {
        Some(ticks) => ticks.parse().context("ticks must be a whole number")?,
        None => DEFAULT_TICKS,
    };

    let mut sim = Simulation::new(9, 11, config);
    build_demo(&mut sim);
    tracing::info!(
        "[headless] running {} ticks on a {}x{} board",
        ticks,
        sim.board.column_count(),
        sim.board.row_count()
    );

    let tick_rate = sim.animator.tick_rate().max(1.0) as u32;
    for tick in 0..ticks {
        sim.update(1.0);
        if tick % tick_rate == 0 {
            for &ball in sim.board.balls() {
                if let Some(part) = sim.board.part(ball) {
                    tracing::info!(
                        "[headless] tick {} ball #{} at ({:.2}, {:.2}), {} bodies live",
                        tick,
                        ball,
                        part.column(),
                        part.row(),
                        sim.router.active_count()
                    );
                }
            }
        }
        if sim.board.balls().is_empty() {
            tracing::info!("[headless] all balls left the board after {} ticks", tick + 1);
            break;
        }
    }

    for part in sim.board.parts() {
        if part.traits().body_can_rotate && !part.traits().body_can_move {
            tracing::info!(
                "[headless] {:?} at {:?} rests at rotation {}",
                part.part_type(),
                part.cell(),
                part.rotation()
            );
        }
    }
    Ok(())
}
