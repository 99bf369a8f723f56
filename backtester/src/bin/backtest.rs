use std::path::PathBuf;

use anyhow::{Context, Result};
use backtester::{
    Backtester, build_llm_oracle, load_config_path,
    oracle::{DecisionOracle, HoldOracle},
    report::FileRecorder,
    store::TimeframeStore,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Clone, Copy, ValueEnum)]
enum OracleKind {
    /// OpenAI-compatible chat completions
    Llm,
    /// Always hold; no network
    Hold,
}

#[derive(Parser)]
#[command(version, about = "Replay price history against an LLM trading oracle")]
struct Cli {
    /// Run configuration (TOML)
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    #[arg(long, value_enum, default_value = "llm")]
    oracle: OracleKind,

    /// Overrides `data_dir` from the config
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Overrides `output_dir` from the config
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(fmt::layer())
        .init();

    let mut config = load_config_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let store = TimeframeStore::load(&config.data_dir, &config.symbol, config.primary_timeframe)
        .context("loading price history")?;
    let engine = Backtester::from_config(&config, &store)?;

    let oracle: Box<dyn DecisionOracle> = match cli.oracle {
        OracleKind::Llm => Box::new(build_llm_oracle(&config).context("building oracle")?),
        OracleKind::Hold => Box::new(HoldOracle),
    };
    let mut recorder = FileRecorder::create(&config.output_dir)?;

    let outcome = engine.run(oracle.as_ref(), &mut recorder).await?;

    let perf = &outcome.performance;
    println!("bars processed : {}", outcome.stats.bars_processed);
    println!("trades         : {}", outcome.stats.trades);
    println!("oracle failures: {}", outcome.stats.oracle_failures);
    println!("total return   : {:.2}%", perf.total_return * 100.0);
    println!("max drawdown   : {:.2}%", perf.max_drawdown * 100.0);
    match perf.ratio {
        Some(r) => println!("sharpe ratio   : {r:.2}"),
        None => println!("sharpe ratio   : n/a"),
    }
    println!("output         : {}", recorder.dir().display());
    Ok(())
}
