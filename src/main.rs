// src/main.rs

//! One-shot evaluation entry point.
//!
//! 1. Load the configuration directory, initialise tracing.
//! 2. Wire the live collaborators (document fetcher, table-extraction
//!    service, model endpoints, chain/market data provider).
//! 3. Read an evaluation request from a JSON file, run it, print the
//!    response envelope to stdout.
//!
//! Exit code 1 when the evaluation carried an error status, so shell
//! pipelines can branch without parsing the JSON.

use clap::Parser;
use eyre::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use pegscore::chain_data::LiveChainDataProvider;
use pegscore::extraction::{
    ExtractionPipeline, OllamaReserveModel, ReserveModel, TableServiceExtractor,
};
use pegscore::fetch::HttpDocumentFetcher;
use pegscore::{Config, EvaluationRequest, Evaluator};

const DEFAULT_MARKET_API_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Parser, Debug)]
#[command(name = "pegscore", about = "Stablecoin reserve and on-chain risk scoring")]
struct Cli {
    /// Directory holding main.json, chains.json, thresholds.json, extraction.json.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,
    /// Path to the evaluation request JSON.
    #[arg(long)]
    request: PathBuf,
    /// Pretty-print the response envelope.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(
        Config::load_from_directory(&cli.config_dir)
            .await
            .wrap_err("configuration loading failed")?,
    );

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pegscore={}", config.log_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let fetcher = Arc::new(HttpDocumentFetcher::new());
    let extractor = Arc::new(TableServiceExtractor::new(config.extraction.extractor_url.clone()));
    let models: Vec<Arc<dyn ReserveModel>> = config
        .extraction
        .models
        .iter()
        .map(|model| {
            Arc::new(OllamaReserveModel::new(config.extraction.model_host.clone(), model.clone()))
                as Arc<dyn ReserveModel>
        })
        .collect();
    let pipeline =
        Arc::new(ExtractionPipeline::new(extractor, models, config.extraction.clone()));

    let market_api_url =
        std::env::var("MARKET_API_URL").unwrap_or_else(|_| DEFAULT_MARKET_API_URL.to_string());
    let market_api_key = std::env::var("MARKET_API_KEY").ok();
    let provider = Arc::new(LiveChainDataProvider::new(market_api_url, market_api_key));

    let evaluator = Evaluator::new(Arc::clone(&config), fetcher, pipeline, provider);

    let raw = tokio::fs::read_to_string(&cli.request)
        .await
        .wrap_err_with(|| format!("failed to read request file {}", cli.request.display()))?;
    let request: EvaluationRequest =
        serde_json::from_str(&raw).wrap_err("request file is not a valid evaluation request")?;

    info!(ticker = %request.stablecoin_ticker, "starting evaluation");
    let response = evaluator.evaluate(request).await;
    let failed = response.error_status.is_some();

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{rendered}");

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
