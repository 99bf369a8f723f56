use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use market_data_ingestor::{
    cli::commands::{Cli, Commands},
    download::{DownloadRequest, download},
    io::CsvSink,
    providers::{ProviderId, build_provider},
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Download {
            symbol,
            start,
            end,
            intervals,
            out,
        } => {
            let provider =
                build_provider(ProviderId::Binance).context("building Binance provider")?;
            let request = DownloadRequest {
                symbol: symbol.to_uppercase(),
                timeframes: intervals,
                start,
                end: end.unwrap_or_else(Utc::now),
            };
            let paths = download(provider.as_ref(), &CsvSink::new(&out), &request)
                .await
                .with_context(|| format!("downloading {}", request.symbol))?;
            for path in paths {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}
