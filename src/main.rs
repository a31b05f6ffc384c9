//! CLI entry point for the duel simulator

use clap::{Parser, ValueEnum};
use duel_sim::{
    config::{merge_deep, read_override, ConfigRegistry, Flags, MatchupFile, RunOptions, DEFAULT_MAX_TURNS},
    error::Result,
    rng::FastRng,
    simulation::{default_threads, run_matchup, Simulator},
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "duel-sim")]
#[command(version = "0.1")]
#[command(about = "Predicts one-on-one fights between two character builds", long_about = None)]
struct Args {
    /// Matchup file (YAML or JSON) with two fighters, an optional config override and flags
    #[arg(short, long)]
    matchup: PathBuf,

    /// Config override file, merged over the defaults after the matchup's own override
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of fights to run
    #[arg(short, long, default_value = "10000")]
    num_fights: usize,

    /// Use parallel processing
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Worker threads for parallel runs (defaults to about 70% of the cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Base seed; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Turns before a fight is called a draw
    #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
    max_turns: u32,

    /// Treat every gladiator level as 15
    #[arg(long, default_value = "false")]
    gladiator_15: bool,

    /// Ignore the opponent's gladiator level
    #[arg(long, default_value = "false")]
    no_gladiator_reduction: bool,

    /// Ignore the defender's attribute in the damage formula
    #[arg(long, default_value = "false")]
    no_attribute_reduction: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,

    /// Debug: print derived fighter stats and exit
    #[arg(long, default_value = "false")]
    debug_stats: bool,

    /// Run a single logged fight and print the fight log as JSON
    #[arg(long, default_value = "false")]
    dump_log: bool,
}

fn load(args: &Args) -> Result<Simulator> {
    let matchup = MatchupFile::from_file(&args.matchup)?;
    let players = matchup.players()?;

    // The override file wins over the matchup's own override
    let mut overrides = matchup.config.clone();
    if let Some(path) = &args.config {
        let file = read_override(path)?;
        overrides = Some(match overrides {
            Some(tree) => merge_deep(&tree, &file),
            None => file,
        });
    }

    let mut registry = ConfigRegistry::new();
    registry.set_override(overrides)?;
    for difference in registry.differences() {
        debug!(
            path = %difference.path.join("."),
            default = %difference.default,
            custom = %difference.custom,
            "config override"
        );
    }
    let config = registry.resolve()?;

    let flags = Flags {
        gladiator_15: args.gladiator_15 || matchup.flags.gladiator_15,
        no_gladiator_reduction: args.no_gladiator_reduction || matchup.flags.no_gladiator_reduction,
        no_attribute_reduction: args.no_attribute_reduction || matchup.flags.no_attribute_reduction,
    };
    let options = RunOptions {
        flags,
        log_enabled: args.dump_log,
        max_turns: args.max_turns,
    };

    Simulator::from_players(players, &config, options)
}

fn print_stats(sim: &Simulator) {
    for fighter in sim.fighters() {
        let data = fighter.data();
        println!("============================================================");
        println!("FIGHTER {} ({})", fighter.index(), fighter.class());
        println!("============================================================");
        println!("Health:        {:.0}", fighter.total_health());
        println!("Weapon 1:      {:.2} - {:.2} (base {:.4})", data.weapon1.min, data.weapon1.max, data.weapon1.base);
        if let Some(weapon2) = data.weapon2 {
            println!("Weapon 2:      {:.2} - {:.2} (base {:.4})", weapon2.min, weapon2.max, weapon2.base);
        }
        println!("Skip:          {:.4} ({:.2}%)", data.baseline.skip_chance, data.baseline.skip_chance * 100.0);
        println!("Critical:      {:.4} ({:.2}%)", data.baseline.critical_chance, data.baseline.critical_chance * 100.0);
        println!("Crit Mult:     {:.4}", data.baseline.critical_multiplier);
        if let Some(rage) = data.rage {
            println!();
            println!("RAGE:");
            println!("  Skip:        {:.4}", rage.skip_chance);
            println!("  Critical:    {:.4}", rage.critical_chance);
            println!("  Crit Mult:   {:.4}", rage.critical_multiplier);
        }
        println!();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut sim = match load(&args) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Error loading matchup: {}", e);
            std::process::exit(1);
        }
    };

    if args.debug_stats {
        print_stats(&sim);
        return;
    }

    let seed = args.seed.unwrap_or_else(rand::random::<u64>);
    debug!(seed, "base seed");

    if args.dump_log {
        sim.fresh_fight(&mut FastRng::new(seed));
        match serde_json::to_string_pretty(sim.log().dump()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error writing fight log: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if args.parallel {
        let threads = args.threads.unwrap_or_else(default_threads);
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            warn!(error = %e, "using the default thread pool");
        }
    }

    let start = Instant::now();
    let stats = run_matchup(&sim, args.num_fights, args.parallel, seed);
    let elapsed = start.elapsed();

    match args.output {
        OutputFormat::Text => {
            let [a, b] = sim.fighters();
            println!("=== Duel Simulation Results ===");
            println!("Fights: {}", stats.fights);
            println!("{} (0) vs {} (1)", a.class(), b.class());
            println!();
            println!("Win Rate (0): {:.2}%", stats.win_rate * 100.0);
            println!("Wins: {} - {}", stats.wins[0], stats.wins[1]);
            println!("Draws: {}", stats.draws);
            println!();
            println!("Average Rounds: {:.2} ± {:.2}", stats.avg_rounds, stats.std_rounds);
            println!("Round Range: {} - {}", stats.min_rounds, stats.max_rounds);
            println!(
                "Avg Health Left: {:.0} / {:.0}",
                stats.avg_health_left[0], stats.avg_health_left[1]
            );

            if args.timing {
                println!();
                println!("--- Performance ---");
                println!("Total time: {:.3}s", elapsed.as_secs_f64());
                println!("Per fight: {:.4}ms", elapsed.as_secs_f64() * 1000.0 / args.num_fights.max(1) as f64);
                println!("Fights/sec: {:.0}", args.num_fights as f64 / elapsed.as_secs_f64());
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "fights": args.num_fights,
                "parallel": args.parallel,
                "seed": seed,
                "elapsed_seconds": elapsed.as_secs_f64(),
                "stats": stats,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error writing results: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
