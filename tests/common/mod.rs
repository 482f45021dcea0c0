// tests/common/mod.rs

//! Shared fixtures for the integration tests: deterministic in-memory
//! implementations of every external collaborator plus a config builder.

// Not every test target uses every fixture.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pegscore::chain_data::ChainDataProvider;
use pegscore::config::{
    CacheSettings, ChainEndpointConfig, CoinConfig, Config, ExtractionSettings, ScoringSettings,
    ThresholdSettings,
};
use pegscore::errors::{ChainDataError, ExtractionError, FetchError};
use pegscore::extraction::{ReserveModel, TableExtractor};
use pegscore::fetch::{sha256_hex, DocumentFetcher, FetchedDocument};
use pegscore::types::{
    CandidateEstimate, EvaluationRequest, LiquidityPool, MarketSample, Provenance, Threshold,
};

pub const REPORT_BYTES: &[u8] = b"%PDF-1.4 fixture attestation report";

pub fn test_config(cache_dir: &str) -> Config {
    let mut chains = BTreeMap::new();
    for chain in ["ethereum", "tron"] {
        chains.insert(
            chain.to_string(),
            ChainEndpointConfig {
                rpc_url: format!("http://localhost/{chain}"),
                contract_address: "0xdead".to_string(),
                reference_contract_address: "0xbeef".to_string(),
            },
        );
    }
    let mut coins = BTreeMap::new();
    coins.insert("USDT".to_string(), CoinConfig { market_id: "tether".to_string(), chains });

    Config {
        log_level: "debug".to_string(),
        coins,
        thresholds: ThresholdSettings { frrs: 70.0, ohs: 70.0, trs: Threshold::Band(40.0, 70.0) },
        extraction: ExtractionSettings {
            models: vec![],
            model_host: String::new(),
            extractor_url: String::new(),
            model_timeout_secs: 2,
            prompt_template: "_tablenum_ tables:\n__tables__".to_string(),
            system_prompt: "extract the reserve table".to_string(),
        },
        scoring: ScoringSettings::default(),
        cache: CacheSettings { directory: cache_dir.to_string(), memory_capacity: 64 },
        alerts: Default::default(),
    }
}

pub fn request(ticker: &str) -> EvaluationRequest {
    EvaluationRequest {
        stablecoin_ticker: ticker.to_string(),
        provenance: Provenance {
            report_issuer: "Fixture Trust Ltd".to_string(),
            report_pdf_url: "https://example.com/attestation.pdf".to_string(),
        },
        protocol_version: "v1.0.0".to_string(),
    }
}

//================================================================================================//
//                                         FETCHER                                                //
//================================================================================================//

pub struct FixtureFetcher {
    pub bytes: Vec<u8>,
    pub fail: bool,
}

impl FixtureFetcher {
    pub fn serving(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec(), fail: false }
    }
}

#[async_trait]
impl DocumentFetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        if self.fail {
            return Err(FetchError::Request { url: url.to_string(), reason: "offline".into() });
        }
        Ok(FetchedDocument { bytes: self.bytes.clone(), source_hash: sha256_hex(&self.bytes) })
    }
}

//================================================================================================//
//                                   EXTRACTOR AND MODELS                                         //
//================================================================================================//

/// Serves fixed table text and counts invocations, so tests can prove the
/// cache short-circuits extraction.
pub struct CountingExtractor {
    pub tables: Vec<String>,
    pub calls: AtomicUsize,
}

impl CountingExtractor {
    pub fn serving(tables: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableExtractor for CountingExtractor {
    async fn extract_tables(
        &self,
        _document: &[u8],
        _source_hash: &str,
    ) -> Result<Vec<String>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.clone())
    }
}

pub struct FixtureModel {
    pub name: String,
    pub candidate: Option<CandidateEstimate>,
}

impl FixtureModel {
    pub fn answering(name: &str, candidate: CandidateEstimate) -> Arc<dyn ReserveModel> {
        Arc::new(Self { name: name.to_string(), candidate: Some(candidate) })
    }

    pub fn failing(name: &str) -> Arc<dyn ReserveModel> {
        Arc::new(Self { name: name.to_string(), candidate: None })
    }
}

#[async_trait]
impl ReserveModel for FixtureModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn estimate(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<CandidateEstimate, ExtractionError> {
        self.candidate
            .clone()
            .ok_or_else(|| ExtractionError::ModelEndpoint("fixture failure".into()))
    }
}

/// Candidate with only cash and the reported total filled in.
pub fn cash_candidate(cash: i64, total: i64) -> CandidateEstimate {
    CandidateEstimate {
        cash_bank_deposits: Some(Decimal::from(cash)),
        total: Some(Decimal::from(total)),
        ..Default::default()
    }
}

//================================================================================================//
//                                      CHAIN PROVIDER                                            //
//================================================================================================//

/// Two-chain fixture: ethereum carries 60% of supply, holder data and a deep
/// pool; tron carries 40%, no holder data and no pools.
pub struct FixtureChainProvider {
    pub total_supply: f64,
    pub history: Vec<MarketSample>,
}

impl FixtureChainProvider {
    pub fn healthy(total_supply: f64) -> Self {
        Self { total_supply, history: growth_history(92) }
    }
}

#[async_trait]
impl ChainDataProvider for FixtureChainProvider {
    async fn chain_supply(
        &self,
        chain: &str,
        _endpoint: &ChainEndpointConfig,
    ) -> Result<f64, ChainDataError> {
        Ok(match chain {
            "ethereum" => self.total_supply * 0.6,
            _ => self.total_supply * 0.4,
        })
    }

    async fn holder_concentration(
        &self,
        chain: &str,
        _endpoint: &ChainEndpointConfig,
    ) -> Result<Option<f64>, ChainDataError> {
        Ok(if chain == "ethereum" { Some(20.0) } else { None })
    }

    async fn liquidity_pools(
        &self,
        chain: &str,
        _endpoint: &ChainEndpointConfig,
    ) -> Result<Vec<LiquidityPool>, ChainDataError> {
        Ok(if chain == "ethereum" {
            vec![LiquidityPool { reserve_usd: 50_000_000.0, price: 1.0 }]
        } else {
            vec![]
        })
    }

    async fn market_history(&self, _market_id: &str) -> Result<Vec<MarketSample>, ChainDataError> {
        Ok(self.history.clone())
    }
}

/// A gently growing daily supply series of the given length.
pub fn growth_history(days: usize) -> Vec<MarketSample> {
    let mut out = Vec::with_capacity(days);
    let mut supply = 100_000_000.0;
    for day in 0..days {
        let step = if day % 3 == 2 { 0.9999 } else { 1.0008 };
        supply *= step;
        out.push(MarketSample {
            timestamp: Utc::now() - Duration::days((days - day) as i64),
            market_cap: supply,
            price: 1.0,
        });
    }
    out
}
