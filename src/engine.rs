// src/engine.rs

//! # Evaluation Orchestrator
//!
//! One [`Evaluator`] owns the wired collaborators and runs evaluations
//! end-to-end: validate the request, fetch and hash the report, reuse the
//! cached reserve table or run the extraction pipeline, collect the on-chain
//! snapshot concurrently, compute the three indices, and assemble the
//! response envelope.
//!
//! `evaluate` never fails: any error inside one evaluation is captured into
//! the response's `error_status` with the request context echoed back, and
//! the process moves on.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::cache::TableCache;
use crate::chain_data::{collect_onchain_data, ChainDataProvider};
use crate::config::Config;
use crate::errors::{EngineError, ValidationError};
use crate::extraction::ExtractionPipeline;
use crate::fetch::DocumentFetcher;
use crate::narrative::{any_breach, build_narrative, push_alert};
use crate::scoring::{calculate_frrs, calculate_ohs, calculate_trs};
use crate::types::{
    AssetTable, CoinData, EvaluationRequest, EvaluationResponse, RiskResult,
};

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3,5}$").expect("static pattern compiles"));
static ISSUER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w -]{3,50}$").expect("static pattern compiles"));
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v\d+\.\d+\.\d+$").expect("static pattern compiles"));

/// Rejects malformed or unsupported requests before any work begins.
pub fn validate_request(config: &Config, request: &EvaluationRequest) -> Result<(), ValidationError> {
    if !TICKER_RE.is_match(&request.stablecoin_ticker) {
        return Err(ValidationError::MalformedTicker(request.stablecoin_ticker.clone()));
    }
    if !config.coins.contains_key(&request.stablecoin_ticker) {
        return Err(ValidationError::UnsupportedTicker {
            ticker: request.stablecoin_ticker.clone(),
            supported: config.supported_tickers(),
        });
    }
    if !ISSUER_RE.is_match(&request.provenance.report_issuer) {
        return Err(ValidationError::MalformedIssuer(request.provenance.report_issuer.clone()));
    }
    let url = &request.provenance.report_pdf_url;
    match reqwest::Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
        Ok(parsed) => {
            return Err(ValidationError::MalformedUrl(
                url.clone(),
                format!("unsupported scheme {:?}", parsed.scheme()),
            ))
        }
        Err(e) => return Err(ValidationError::MalformedUrl(url.clone(), e.to_string())),
    }
    if !VERSION_RE.is_match(&request.protocol_version) {
        return Err(ValidationError::MalformedProtocolVersion(request.protocol_version.clone()));
    }
    Ok(())
}

pub struct Evaluator {
    config: Arc<Config>,
    fetcher: Arc<dyn DocumentFetcher>,
    pipeline: Arc<ExtractionPipeline>,
    chain_provider: Arc<dyn ChainDataProvider>,
    cache: TableCache,
}

impl Evaluator {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn DocumentFetcher>,
        pipeline: Arc<ExtractionPipeline>,
        chain_provider: Arc<dyn ChainDataProvider>,
    ) -> Self {
        let cache = TableCache::new(&config.cache);
        Self { config, fetcher, pipeline, chain_provider, cache }
    }

    /// Runs one evaluation and always produces a response envelope.
    #[instrument(skip(self, request), fields(ticker = %request.stablecoin_ticker))]
    pub async fn evaluate(&self, request: EvaluationRequest) -> EvaluationResponse {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (risk_result, error_status) = match self.run(&id, &request).await {
            Ok(result) => (Some(result), None),
            Err(e) => {
                error!(error = %e, "evaluation failed");
                (None, Some(e.to_string()))
            }
        };
        EvaluationResponse {
            id,
            error_status,
            evaluation_time: Utc::now(),
            stablecoin_ticker: request.stablecoin_ticker,
            provenance: request.provenance,
            risk_result,
            protocol_version: request.protocol_version,
        }
    }

    async fn run(&self, id: &str, request: &EvaluationRequest) -> Result<RiskResult, EngineError> {
        validate_request(&self.config, request)?;
        let ticker = &request.stablecoin_ticker;
        let coin = self
            .config
            .coins
            .get(ticker)
            .ok_or_else(|| EngineError::Config(format!("coin {ticker} vanished after validation")))?;

        // The reserve table and the on-chain snapshot are independent until
        // scoring; both block FRRS/OHS, so they run concurrently.
        let table_task = async {
            self.reserve_table(id, &request.provenance.report_pdf_url).await
        };
        let onchain_task = async {
            collect_onchain_data(
                self.chain_provider.as_ref(),
                ticker,
                coin,
                &self.config.scoring,
            )
            .await
            .map_err(EngineError::from)
        };
        let (asset_table, onchain_data) = tokio::try_join!(table_task, onchain_task)?;

        let frrs = calculate_frrs(
            &asset_table,
            onchain_data.total_supply(),
            &self.config.thresholds,
        )?;
        let (ohs, breakdown) =
            calculate_ohs(&onchain_data, &self.config.scoring, &self.config.thresholds)?;
        info!(frrs = frrs.value, ohs = ohs.value, ?breakdown, "indices computed");
        let indices =
            calculate_trs(frrs, ohs, asset_table.analyzed_at, Utc::now(), &self.config.thresholds);

        let narrative = build_narrative(&indices);
        if any_breach(&indices) {
            push_alert(&self.config.alerts, &narrative).await;
        }

        Ok(RiskResult {
            coin_data: CoinData {
                stablecoin_ticker: ticker.clone(),
                description: None,
                asset_table,
                onchain_data,
            },
            indices,
            narrative,
        })
    }

    /// Fetches and hashes the report, then either reuses the cached table or
    /// runs the extraction pipeline with a write-through store.
    async fn reserve_table(&self, id: &str, url: &str) -> Result<AssetTable, EngineError> {
        let document = self.fetcher.fetch(url).await?;
        match self.cache.lookup(&document.source_hash).await {
            Ok(Some(table)) => {
                info!(source_hash = %document.source_hash, "cache hit; extraction skipped");
                return Ok(table);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cache lookup failed; proceeding with extraction"),
        }
        let table = self.pipeline.analyze_document(&document.bytes, &document.source_hash).await?;
        self.cache.store(id, &document.source_hash, &table).await?;
        Ok(table)
    }
}
