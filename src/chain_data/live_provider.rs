// src/chain_data/live_provider.rs

//! Live [`ChainDataProvider`] speaking plain JSON to the configured chain RPC
//! endpoints and market-data API. Thin plumbing only: every number it returns
//! is consumed through the provider trait, and the engine never sees HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::ChainDataProvider;
use crate::config::ChainEndpointConfig;
use crate::errors::ChainDataError;
use crate::types::{LiquidityPool, MarketSample};

// ERC-20 selectors for totalSupply() and decimals().
const SELECTOR_TOTAL_SUPPLY: &str = "0x18160ddd";
const SELECTOR_DECIMALS: &str = "0x313ce567";

pub struct LiveChainDataProvider {
    client: reqwest::Client,
    market_api_url: String,
    market_api_key: Option<String>,
}

impl LiveChainDataProvider {
    pub fn new(market_api_url: String, market_api_key: Option<String>) -> Self {
        Self { client: reqwest::Client::new(), market_api_url, market_api_key }
    }

    async fn eth_call(
        &self,
        chain: &str,
        endpoint: &ChainEndpointConfig,
        data: &str,
    ) -> Result<u128, ChainDataError> {
        let provider_err = |reason: String| ChainDataError::Provider {
            chain: chain.to_string(),
            reason,
        };
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [{"to": endpoint.contract_address, "data": data}, "latest"],
        });
        let response: serde_json::Value = self
            .client
            .post(&endpoint.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| provider_err(e.to_string()))?
            .json()
            .await
            .map_err(|e| provider_err(e.to_string()))?;
        let hex = response
            .get("result")
            .and_then(|r| r.as_str())
            .ok_or_else(|| provider_err(format!("malformed RPC response: {response}")))?;
        let trimmed = hex.trim_start_matches("0x").trim_start_matches('0');
        if trimmed.is_empty() {
            return Ok(0);
        }
        u128::from_str_radix(trimmed, 16)
            .map_err(|e| provider_err(format!("unparsable RPC result {hex}: {e}")))
    }

    fn market_get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.get(format!("{}{path}", self.market_api_url));
        if let Some(key) = &self.market_api_key {
            req = req.header("x-api-key", key);
        }
        req
    }
}

#[derive(Deserialize)]
struct HoldersEnvelope {
    data: HoldersData,
}
#[derive(Deserialize)]
struct HoldersData {
    attributes: HoldersAttributes,
}
#[derive(Deserialize)]
struct HoldersAttributes {
    holders: Option<HoldersFigures>,
}
#[derive(Deserialize)]
struct HoldersFigures {
    top_50_share_pct: Option<f64>,
}

#[derive(Deserialize)]
struct PoolsEnvelope {
    data: Vec<PoolEntry>,
}
#[derive(Deserialize)]
struct PoolEntry {
    attributes: PoolAttributes,
}
#[derive(Deserialize)]
struct PoolAttributes {
    reserve_in_usd: String,
    token_price_usd: String,
}

#[derive(Deserialize)]
struct MarketChart {
    prices: Vec<(i64, f64)>,
    market_caps: Vec<(i64, f64)>,
}

#[async_trait]
impl ChainDataProvider for LiveChainDataProvider {
    async fn chain_supply(
        &self,
        chain: &str,
        endpoint: &ChainEndpointConfig,
    ) -> Result<f64, ChainDataError> {
        let raw = self.eth_call(chain, endpoint, SELECTOR_TOTAL_SUPPLY).await?;
        let decimals = self.eth_call(chain, endpoint, SELECTOR_DECIMALS).await?;
        let supply = raw as f64 / 10f64.powi(decimals as i32);
        debug!(chain = %chain, supply, "chain supply");
        Ok(supply)
    }

    async fn holder_concentration(
        &self,
        chain: &str,
        endpoint: &ChainEndpointConfig,
    ) -> Result<Option<f64>, ChainDataError> {
        let response = self
            .market_get(&format!(
                "/onchain/networks/{chain}/tokens/{}/info",
                endpoint.contract_address
            ))
            .send()
            .await
            .map_err(|e| ChainDataError::Provider { chain: chain.to_string(), reason: e.to_string() })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let envelope: HoldersEnvelope = response
            .json()
            .await
            .map_err(|e| ChainDataError::Provider { chain: chain.to_string(), reason: e.to_string() })?;
        Ok(envelope.data.attributes.holders.and_then(|h| h.top_50_share_pct))
    }

    async fn liquidity_pools(
        &self,
        chain: &str,
        endpoint: &ChainEndpointConfig,
    ) -> Result<Vec<LiquidityPool>, ChainDataError> {
        let envelope: PoolsEnvelope = self
            .market_get(&format!(
                "/onchain/networks/{chain}/tokens/{}/pools",
                endpoint.contract_address
            ))
            .send()
            .await
            .map_err(|e| ChainDataError::Provider { chain: chain.to_string(), reason: e.to_string() })?
            .json()
            .await
            .map_err(|e| ChainDataError::Provider { chain: chain.to_string(), reason: e.to_string() })?;

        let pools = envelope
            .data
            .into_iter()
            .filter_map(|entry| {
                let reserve = entry.attributes.reserve_in_usd.parse::<f64>();
                let price = entry.attributes.token_price_usd.parse::<f64>();
                match (reserve, price) {
                    (Ok(reserve_usd), Ok(price)) => Some(LiquidityPool { reserve_usd, price }),
                    _ => {
                        warn!(chain = %chain, "dropping pool with unparsable figures");
                        None
                    }
                }
            })
            .collect();
        Ok(pools)
    }

    async fn market_history(&self, market_id: &str) -> Result<Vec<MarketSample>, ChainDataError> {
        let chart: MarketChart = self
            .market_get(&format!(
                "/coins/{market_id}/market_chart?vs_currency=usd&days=91&interval=daily&precision=full"
            ))
            .send()
            .await
            .map_err(|e| ChainDataError::MarketHistory(e.to_string()))?
            .json()
            .await
            .map_err(|e| ChainDataError::MarketHistory(e.to_string()))?;

        let samples = chart
            .prices
            .into_iter()
            .zip(chart.market_caps)
            .filter_map(|((ts_ms, price), (_, market_cap))| {
                let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(ts_ms)?;
                Some(MarketSample { timestamp, market_cap, price })
            })
            .collect();
        Ok(samples)
    }
}
