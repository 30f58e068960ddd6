//! Eldoria headless runner
//! Sets up a world, runs it to completion or a step limit, prints statistics

use std::path::PathBuf;

use clap::Parser;
use eldoria::core::config::SimulationConfig;
use eldoria::core::error::Result;
use eldoria::simulation::{EntityCounts, Simulation, SimulationEvent};

/// Eldoria - treasure hunters versus knights on a wraparound grid
#[derive(Parser, Debug)]
#[command(name = "eldoria_sim")]
#[command(about = "Run a headless Eldoria simulation")]
struct Args {
    /// TOML config file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum steps to run
    #[arg(long, default_value_t = 1000)]
    steps: usize,

    #[arg(long, default_value_t = 10)]
    treasures: usize,

    #[arg(long, default_value_t = 3)]
    hunters: usize,

    #[arg(long, default_value_t = 2)]
    knights: usize,

    #[arg(long, default_value_t = 2)]
    hideouts: usize,

    #[arg(long, default_value_t = 1)]
    garrisons: usize,

    /// Print every event as it happens
    #[arg(long, default_value_t = false)]
    verbose: bool,

    /// Print a JSON snapshot of the final world
    #[arg(long, default_value_t = false)]
    snapshot: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("eldoria=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut sim = Simulation::new(config);
    sim.setup(EntityCounts {
        treasures: args.treasures,
        hunters: args.hunters,
        knights: args.knights,
        hideouts: args.hideouts,
        garrisons: args.garrisons,
    })?;

    for _ in 0..args.steps {
        if sim.is_complete() {
            break;
        }
        let tick = sim.world().current_tick();
        let events = sim.step();
        if args.verbose {
            for event in &events {
                print_event(tick, event);
            }
        }
    }

    let stats = sim.statistics();
    println!("\n=== ELDORIA ===");
    println!("Steps run:          {}", stats.step);
    println!(
        "Outcome:            {}",
        stats.completion.as_deref().unwrap_or("step limit reached")
    );
    println!("Treasures loose:    {}", stats.loose_treasures);
    println!("Treasures carried:  {}", stats.carried_treasures);
    println!("Collected:          {}", stats.treasures_collected);
    println!("Depleted:           {}", stats.treasures_depleted);
    println!(
        "Deposited value:    {:.2} (bronze {:.2}, silver {:.2}, gold {:.2})",
        stats.total_deposited,
        stats.deposited_by_kind.bronze,
        stats.deposited_by_kind.silver,
        stats.deposited_by_kind.gold
    );
    println!("Hunters alive:      {}", stats.hunters_alive);
    println!("Hunters recruited:  {}", stats.hunters_recruited);
    println!("Hunters collapsed:  {}", stats.hunters_collapsed);
    println!("Knights raised:     {}", stats.knights_spawned);
    println!("Captures:           {} detain, {} challenge", stats.detains, stats.challenges);
    println!("Average stamina:    {:.1}", stats.average_stamina);
    println!("Average energy:     {:.1}", stats.average_energy);

    if args.snapshot {
        println!("{}", sim.snapshot_json()?);
    }
    Ok(())
}

fn print_event(tick: u64, event: &SimulationEvent) {
    match event {
        SimulationEvent::TreasureCollected { hunter, kind, value, .. } => {
            println!("[{:>5}] hunter {} collected {:?} ({:.2})", tick, hunter, kind, value)
        }
        SimulationEvent::TreasureDeposited { hunter, hideout, value, .. } => {
            println!("[{:>5}] hunter {} deposited {:.2} at {}", tick, hunter, value, hideout)
        }
        SimulationEvent::Capture { knight, hunter, outcome, stamina_after } => println!(
            "[{:>5}] knight {} caught hunter {} ({:?}, stamina {:.1})",
            tick, knight, hunter, outcome, stamina_after
        ),
        SimulationEvent::HunterCollapsed { hunter, position } => {
            println!("[{:>5}] hunter {} collapsed at {}", tick, hunter, position)
        }
        SimulationEvent::Completed { reason } => println!("[{:>5}] complete: {}", tick, reason),
        other => println!("[{:>5}] {:?}", tick, other),
    }
}
