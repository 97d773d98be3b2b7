use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::{error, info};

use legalscraper::output::{self, JsonExport};
use legalscraper::{ConfigBuilder, HttpFetcher, ScrapeEngine, ScrapeError};

#[derive(Parser)]
#[command(name = "legalscraper", about = "Scrape catalog page metadata and performer profiles to JSON")]
struct Cli {
    /// Page URLs or free-text searches
    #[arg(required = true)]
    url: Vec<String>,

    /// Also write the records to a JSON file
    #[arg(short, long)]
    json: bool,

    /// Output file or directory (defaults to the Desktop)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail when a page has no release date
    #[arg(long)]
    require_date: bool,

    /// Emit performers as lists of single-entry objects
    #[arg(long)]
    legacy: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<ScrapeError>() {
            Some(scrape_err) => error!("{}: {}", scrape_err.kind(), scrape_err),
            None => error!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigBuilder::new().require_date(cli.require_date).build()?;
    let engine = ScrapeEngine::new(config, HttpFetcher::new())?;

    let export = cli.json.then(|| {
        let filename = output::export_filename(Local::now());
        let fallback_dir = output::default_output_dir();
        let path = output::resolve_output_path(cli.output.as_deref(), &fallback_dir, &filename);
        JsonExport::new(path, fallback_dir.join(&filename))
    });

    let mut stdout = std::io::stdout().lock();
    let total = output::run_inputs(&engine, &cli.url, export, cli.legacy, &mut stdout).await?;

    info!("Processed {} input(s)", total);
    Ok(())
}
