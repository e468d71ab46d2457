// fplsquad entry point.
//
// Startup sequence:
// 1. Parse arguments, initialize tracing (log to file, not terminal)
// 2. Ensure config files exist, load config
// 3. Apply command-line overrides, re-validate
// 4. Load and validate the player pool
// 5. Select the squad (single-shot or Monte Carlo) and suggest a lineup
// 6. Print the recommendation

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use fplsquad_core::config::{self, Config, TieBreak};
use fplsquad_core::lineup::{self, Lineup};
use fplsquad_core::optimizer::SquadOptimizer;
use fplsquad_core::pool::{self, PlayerPool};
use fplsquad_core::report::Recommendation;
use fplsquad_core::simulation;

#[derive(Parser)]
#[command(name = "fplsquad")]
#[command(about = "Pick a fantasy football squad under budget, quota and team constraints", long_about = None)]
struct Cli {
    /// Directory holding config/, defaults/, data/ and logs/
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Player pool CSV (overrides [data] pool)
    #[arg(long)]
    pool: Option<PathBuf>,

    /// Player ids to leave out, comma separated
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<u32>,

    /// Override the configured tie-break rule
    #[arg(long, value_enum)]
    tie_break: Option<TieBreakArg>,

    /// Skip the lineup suggestion
    #[arg(long, default_value = "false")]
    no_lineup: bool,

    /// Print the recommendation as JSON
    #[arg(long, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Single optimization on the base scores
    Optimize,

    /// Monte Carlo robust selection (default)
    Simulate {
        /// Number of perturbed trials
        #[arg(long)]
        trials: Option<usize>,

        /// Base RNG seed; a random one is drawn and logged when absent
        #[arg(long)]
        seed: Option<u64>,

        /// Run trials on a Rayon thread pool
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Worker threads for --parallel (0 = Rayon default)
        #[arg(long)]
        workers: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    Solver,
    LowestPrice,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::Solver => TieBreak::Solver,
            TieBreakArg::LowestPrice => TieBreak::LowestPrice,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // 1. Parse arguments, initialize tracing
    let cli = Cli::parse();
    init_tracing(&cli.base_dir)?;
    info!("fplsquad starting up");

    // 2. Ensure config files exist, load config
    if let Some(path) = config::ensure_config_file(&cli.base_dir)
        .context("failed to prepare configuration file")?
    {
        info!("Copied default config to {}", path.display());
    }
    let mut config =
        config::load_config_from(&cli.base_dir).context("failed to load configuration")?;

    // 3. Apply command-line overrides
    apply_overrides(&mut config, &cli);
    config::validate(&config).context("invalid command-line overrides")?;
    info!(
        "Config loaded: budget {}, team cap {}, squad size {}, tie-break {:?}",
        config.rules.budget,
        config.rules.max_per_team,
        config.rules.squad_size(),
        config.rules.tie_break
    );

    // 4. Load the player pool
    let pool_path = resolve(&cli.base_dir, &config.data.pool);
    let report = pool::load_pool(&pool_path)
        .with_context(|| format!("failed to load player pool from {}", pool_path.display()))?;
    info!(
        "Pool loaded: {} players, {} rows excluded, {} rows sanitized",
        report.pool.len(),
        report.excluded_count(),
        report.issues.len() - report.excluded_count()
    );
    let pool = if cli.exclude.is_empty() {
        report.pool
    } else {
        info!("Excluding players {:?}", cli.exclude);
        report.pool.excluding(&cli.exclude)
    };

    // 5. Select the squad and suggest a lineup
    let optimizer = SquadOptimizer::new(config.rules.clone());
    let recommendation = match cli.command {
        Some(Commands::Optimize) => {
            let squad = optimizer
                .select_by_score(&pool)
                .context("optimization failed")?;
            info!(
                "Selected squad: price {}, score {:.2}",
                squad.total_price, squad.total_objective
            );
            let lineup = suggest(&pool, &squad, &config, cli.no_lineup)?;
            Recommendation::from_squad(&pool, &squad, &config.rules, lineup)
        }
        Some(Commands::Simulate { .. }) | None => {
            let selection = simulation::run_robust_selection(&pool, &optimizer, &config.simulation)
                .context("robust selection failed")?;
            let lineup = suggest(&pool, &selection.squad, &config, cli.no_lineup)?;
            Recommendation::from_robust(&pool, &selection, &config.rules, lineup)
        }
    };

    // 6. Print the recommendation
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&recommendation)
                .context("failed to serialize recommendation")?
        );
    } else {
        print!("{}", recommendation.render_text());
    }

    info!("fplsquad finished");
    Ok(())
}

fn suggest(
    pool: &PlayerPool,
    squad: &fplsquad_core::optimizer::Squad,
    config: &Config,
    skip: bool,
) -> anyhow::Result<Option<Lineup>> {
    if skip {
        return Ok(None);
    }
    let lineup = lineup::suggest_lineup(pool, squad, &config.lineup)
        .context("failed to build lineup")?;
    info!(
        "Lineup {}: captain {}, vice captain {}",
        lineup.formation, lineup.captain, lineup.vice_captain
    );
    Ok(Some(lineup))
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(path) = &cli.pool {
        config.data.pool = path.display().to_string();
    }
    if let Some(tie_break) = cli.tie_break {
        config.rules.tie_break = tie_break.into();
    }
    if let Some(Commands::Simulate {
        trials,
        seed,
        parallel,
        workers,
    }) = &cli.command
    {
        if let Some(trials) = trials {
            config.simulation.trials = *trials;
        }
        if seed.is_some() {
            config.simulation.seed = *seed;
        }
        if *parallel {
            config.simulation.parallel = true;
        }
        if let Some(workers) = workers {
            config.simulation.workers = *workers;
        }
    }
}

/// Relative paths are taken from `base_dir`.
fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Initialize tracing to log to a file so stdout carries only the report.
fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("fplsquad.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fplsquad=info,fplsquad_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
