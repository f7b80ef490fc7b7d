use clap::Parser;
use std::path::PathBuf;

/// Monte-Carlo damage simulation of a caster against a raid boss
#[derive(Parser, Debug)]
#[command(name = "combat_sim")]
#[command(about = "Runs repeated fight iterations and reports damage per second", version)]
pub struct Args {
    /// Number of fight iterations
    #[arg(short, long, default_value = "1000")]
    pub iterations: u32,

    /// Fight length in seconds
    #[arg(short, long, default_value = "180")]
    pub duration: u64,

    /// Seed for the random source
    #[arg(short, long, default_value = "42")]
    pub seed: u64,

    /// Spell ids in priority order; the first castable one is used
    #[arg(short, long, value_delimiter = ',', default_value = "corruption,fireball,frostbolt")]
    pub rotation: Vec<String>,

    /// Spell definitions TOML replacing the bundled set
    #[arg(long)]
    pub spells: Option<PathBuf>,

    /// Combat constants TOML replacing the defaults
    #[arg(long)]
    pub constants: Option<PathBuf>,

    /// Skip the external spell vulnerability debuff on the boss
    #[arg(long)]
    pub no_curse: bool,

    /// Let the boss melee the caster, causing pushback
    #[arg(long)]
    pub boss_melee: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn parse_args() -> Args {
    Args::parse()
}
