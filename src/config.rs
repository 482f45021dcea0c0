// src/config.rs

//! # Modular Configuration System
//!
//! Settings load from a directory of specialized JSON files (`main.json`,
//! `chains.json`, `thresholds.json`, `extraction.json`) into one immutable
//! [`Config`] constructed once at startup and passed by `Arc` into every
//! component. Keeping the calculators free of process-wide globals keeps them
//! pure and independently testable.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::types::Threshold;

//================================================================================================//
//                                       Top-Level Config                                         //
//================================================================================================//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    /// Tickers the engine will accept, mapped to their per-chain deployments.
    pub coins: BTreeMap<String, CoinConfig>,
    pub thresholds: ThresholdSettings,
    pub extraction: ExtractionSettings,
    pub scoring: ScoringSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

impl Config {
    /// Loads and merges the config directory. Fails with context on the first
    /// missing or malformed file.
    pub async fn load_from_directory<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let main: MainConfig = Self::load_file(dir.join("main.json")).await?;
        let coins: BTreeMap<String, CoinConfig> = Self::load_file(dir.join("chains.json")).await?;
        let thresholds: ThresholdSettings = Self::load_file(dir.join("thresholds.json")).await?;
        let extraction: ExtractionSettings = Self::load_file(dir.join("extraction.json")).await?;

        Ok(Self {
            log_level: main.log_level,
            coins,
            thresholds,
            extraction,
            scoring: main.scoring,
            cache: main.cache,
            alerts: main.alerts,
        })
    }

    async fn load_file<T: serde::de::DeserializeOwned>(path: std::path::PathBuf) -> Result<T> {
        let raw = tokio::fs::read_to_string(&path)
            .await
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn supported_tickers(&self) -> Vec<String> {
        self.coins.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MainConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    scoring: ScoringSettings,
    cache: CacheSettings,
    #[serde(default)]
    alerts: AlertSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

//================================================================================================//
//                                       Per-Coin Config                                          //
//================================================================================================//

/// Deployment of one supported stablecoin: the chains it lives on and the
/// market-data identifier used for its price/market-cap history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinConfig {
    /// Identifier used by the market-data API (e.g. "tether").
    pub market_id: String,
    pub chains: BTreeMap<String, ChainEndpointConfig>,
}

/// Endpoints and addresses for one chain deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEndpointConfig {
    pub rpc_url: String,
    pub contract_address: String,
    /// Reference stablecoin contract used as the slippage counter-asset.
    pub reference_contract_address: String,
}

//================================================================================================//
//                                          Settings                                              //
//================================================================================================//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSettings {
    pub frrs: f64,
    pub ohs: f64,
    /// (severe, warning) band.
    pub trs: Threshold,
}

/// Knobs for the document-to-candidates pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Model names queried for independent reserve estimates.
    pub models: Vec<String>,
    /// Chat endpoint host for the model adapter.
    pub model_host: String,
    /// Table-extraction service endpoint.
    pub extractor_url: String,
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    /// Prompt template; `__tables__` and `_tablenum_` are substituted.
    pub prompt_template: String,
    pub system_prompt: String,
}

fn default_model_timeout_secs() -> u64 {
    120
}

/// Tunables for the score calculators. Defaults are the operative policy
/// values; tests construct their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Stress-test sell size as a fraction of total cross-chain supply.
    #[serde(default = "default_stress_fraction")]
    pub stress_sell_fraction: f64,
    /// StableSwap probe size as a fraction of a chain's aggregate liquidity.
    #[serde(default = "default_probe_fraction")]
    pub stableswap_probe_fraction: f64,
    /// StableSwap amplification coefficient.
    #[serde(default = "default_amplification")]
    pub amplification: f64,
    /// Minimum daily market samples required by the supply-shock detector.
    #[serde(default = "default_min_history")]
    pub min_history_samples: usize,
    /// PMCS / HCR / SMLS weights inside OHS.
    #[serde(default = "default_ohs_weights")]
    pub ohs_weights: [f64; 3],
}

fn default_stress_fraction() -> f64 {
    0.0001
}
fn default_probe_fraction() -> f64 {
    0.01
}
fn default_amplification() -> f64 {
    50.0
}
fn default_min_history() -> usize {
    91
}
fn default_ohs_weights() -> [f64; 3] {
    [0.5, 0.3, 0.2]
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            stress_sell_fraction: default_stress_fraction(),
            stableswap_probe_fraction: default_probe_fraction(),
            amplification: default_amplification(),
            min_history_samples: default_min_history(),
            ohs_weights: default_ohs_weights(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Directory holding the hash log and the per-hash asset table files.
    pub directory: String,
    /// In-memory table cache capacity.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: u64,
}

fn default_memory_capacity() -> u64 {
    1_000
}

/// Optional webhook notified when an evaluation breaches a threshold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSettings {
    #[serde(default)]
    pub webhook_url: Option<String>,
}
