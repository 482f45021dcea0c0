// src/chain_data/mod.rs

//! # On-Chain Data Collection
//!
//! The [`ChainDataProvider`] trait is the seam to blockchain RPC and
//! market-data APIs; implementations must be thread-safe and are injected
//! into the engine behind an `Arc`. [`collect_onchain_data`] fans one
//! evaluation's lookups out across all of a coin's chains concurrently and
//! joins the results into an [`OnChainData`] snapshot, running the slippage
//! simulations once all pool data is in.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::amm_math::{
    aggregate_pools, constant_product_slippage, stableswap_slippage, FULL_SLIPPAGE_PCT,
};
use crate::config::{ChainEndpointConfig, CoinConfig, ScoringSettings};
use crate::errors::ChainDataError;
use crate::types::{ChainSnapshot, LiquidityPool, MarketSample, OnChainData};

pub mod live_provider;

pub use live_provider::LiveChainDataProvider;

/// Read-only access to per-chain supply, holder, and liquidity-pool figures
/// plus the coin's trailing market history.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Outstanding token supply on one chain.
    async fn chain_supply(
        &self,
        chain: &str,
        endpoint: &ChainEndpointConfig,
    ) -> Result<f64, ChainDataError>;

    /// Combined top-50-holder share in percent, `None` when the chain's
    /// holder API has nothing for this token.
    async fn holder_concentration(
        &self,
        chain: &str,
        endpoint: &ChainEndpointConfig,
    ) -> Result<Option<f64>, ChainDataError>;

    /// Pools quoting the coin against the configured reference stablecoin.
    async fn liquidity_pools(
        &self,
        chain: &str,
        endpoint: &ChainEndpointConfig,
    ) -> Result<Vec<LiquidityPool>, ChainDataError>;

    /// Trailing daily market samples for the coin across all chains.
    async fn market_history(&self, market_id: &str) -> Result<Vec<MarketSample>, ChainDataError>;
}

/// Collects one evaluation's on-chain snapshot.
///
/// All per-chain lookups and the market-history fetch run concurrently; the
/// first provider error aborts the evaluation (the scores may not proceed on
/// partial chain coverage). Once joined, the StableSwap stress simulation is
/// run per chain and its results attached to the snapshot.
#[instrument(skip_all, fields(ticker = %ticker))]
pub async fn collect_onchain_data(
    provider: &dyn ChainDataProvider,
    ticker: &str,
    coin: &CoinConfig,
    scoring: &ScoringSettings,
) -> Result<OnChainData, ChainDataError> {
    if coin.chains.is_empty() {
        return Err(ChainDataError::NoChains(ticker.to_string()));
    }

    let history_fut = provider.market_history(&coin.market_id);
    let chain_futs = coin.chains.iter().map(|(chain, endpoint)| async move {
        let (supply, holders, pools) = futures::try_join!(
            provider.chain_supply(chain, endpoint),
            provider.holder_concentration(chain, endpoint),
            provider.liquidity_pools(chain, endpoint),
        )?;
        Ok::<_, ChainDataError>((
            chain.clone(),
            ChainSnapshot { supply, top50_concentration: holders, pools },
        ))
    });

    let (market_history, chain_results) = futures::join!(history_fut, join_all(chain_futs));
    let market_history = market_history?;

    let mut chains = BTreeMap::new();
    for result in chain_results {
        let (chain, snapshot) = result?;
        debug!(chain = %chain, supply = snapshot.supply, pools = snapshot.pools.len(), "chain joined");
        chains.insert(chain, snapshot);
    }

    let mut data = OnChainData { chains, market_history, slippage_by_chain: BTreeMap::new() };
    data.slippage_by_chain = simulate_slippage(&data, scoring);
    Ok(data)
}

/// Runs both swap-curve models per chain. The StableSwap figure feeds the
/// liquidity sub-score; the constant-product figure under the supply-derived
/// stress size is logged as a diagnostic.
fn simulate_slippage(data: &OnChainData, scoring: &ScoringSettings) -> BTreeMap<String, f64> {
    let stress_tokens = data.total_supply() * scoring.stress_sell_fraction;
    let mut out = BTreeMap::new();
    for (chain, snapshot) in &data.chains {
        let slippage = match aggregate_pools(&snapshot.pools) {
            None => {
                warn!(chain = %chain, "no eligible pool; charging full slippage");
                FULL_SLIPPAGE_PCT
            }
            Some(agg) => {
                if stress_tokens > 0.0 {
                    match constant_product_slippage(&agg, stress_tokens) {
                        Ok(cp) => debug!(chain = %chain, cp_slippage = cp, "constant-product stress probe"),
                        Err(e) => warn!(chain = %chain, error = %e, "constant-product probe failed"),
                    }
                }
                let dx = agg.liquidity_usd * scoring.stableswap_probe_fraction;
                match stableswap_slippage(&agg, dx, scoring.amplification) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(chain = %chain, error = %e, "StableSwap probe failed; charging full slippage");
                        FULL_SLIPPAGE_PCT
                    }
                }
            }
        };
        out.insert(chain.clone(), slippage);
    }
    out
}
