//! combat_sim - headless Monte-Carlo driver for combat_core
//!
//! Demonstrates:
//! - Spells loaded from TOML definitions
//! - A first-ready priority rotation driven by the event queue
//! - Proc auras feeding dynamic spell mods (Clearcasting)
//! - Exclusive debuffs sharing a category on the boss
//! - Item and enchant effects wired through the effect catalog
//!
//! Run with `RUST_LOG=combat_core=debug` to trace individual events.

mod cli;
mod items;
mod report;
mod simulation;

use simulation::SimulationConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();
    init_logging(args.verbose);

    let config = SimulationConfig::from_args(&args)?;
    let report = simulation::run(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
