// src/scoring/ohs.rs

//! # On-Chain Health Score
//!
//! `OHS = 0.5 * PMCS + 0.3 * HCR + 0.2 * SMLS`.
//!
//! - **PMCS** (primary market confidence): anomaly detection on the effective
//!   supply series. Only downside supply shocks penalize; growth scores 100.
//! - **HCR** (holder concentration risk): supply-weighted top-50-holder
//!   concentration, scored on a piecewise schedule that may go negative at
//!   extreme concentration.
//! - **SMLS** (secondary market liquidity): supply-weighted simulated
//!   StableSwap slippage mapped onto the 0-100 scale; a chain with no usable
//!   market counts as 100% slippage.
//!
//! The blended value is clamped into [0, 100] when the `Index` is built; the
//! raw sub-scores are kept in [`OhsBreakdown`] for logging and the narrative.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::amm_math::FULL_SLIPPAGE_PCT;
use crate::config::{ScoringSettings, ThresholdSettings};
use crate::errors::ScoreError;
use crate::types::{ChainSnapshot, Index, MarketSample, OnChainData, Threshold};

/// Raw sub-scores behind one OHS value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhsBreakdown {
    pub pmcs: f64,
    pub hcr: f64,
    pub smls: f64,
}

//================================================================================================//
//                                 PRIMARY MARKET CONFIDENCE                                      //
//================================================================================================//

/// Supply-shock anomaly score over the trailing market history.
///
/// The effective supply series is `market_cap / price` per sample. The
/// day-over-day relative changes give a mean and sample standard deviation;
/// the z-score of the most recent change decides the score. A non-negative
/// last change (supply flat or growing) always scores 100; contraction is
/// penalized super-linearly in the size of the anomaly.
pub fn primary_market_confidence(
    history: &[MarketSample],
    min_samples: usize,
) -> Result<f64, ScoreError> {
    if history.len() < min_samples {
        return Err(ScoreError::InsufficientHistory { got: history.len(), need: min_samples });
    }

    let mut supply = Vec::with_capacity(history.len());
    for (i, sample) in history.iter().enumerate() {
        if sample.price <= 0.0 || sample.market_cap <= 0.0 {
            return Err(ScoreError::DegenerateSupplySample(i));
        }
        supply.push(sample.market_cap / sample.price);
    }

    let changes: Vec<f64> = supply.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let n = changes.len() as f64;
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    let last = *changes.last().expect("history length checked above");

    // A flat series has zero deviation and its last change equals the mean;
    // treat it as no anomaly rather than dividing by zero.
    let z = if std_dev == 0.0 { 0.0 } else { (last - mean) / std_dev };
    debug!(mean, std_dev, last, z, "supply change statistics");

    // Only downside supply shocks penalize: growth scores full marks even
    // when it sits below a strongly positive mean.
    if last >= 0.0 || z >= 0.0 {
        Ok(100.0)
    } else {
        Ok((100.0 - 8.0 * z.abs().powf(1.32)).max(0.0))
    }
}

//================================================================================================//
//                                 HOLDER CONCENTRATION RISK                                      //
//================================================================================================//

/// Supply-weighted top-50-holder concentration score.
///
/// Chains that report no holder data are excluded from both the numerator and
/// the denominator; if no chain reports any, the evaluation cannot say
/// anything about concentration and fails rather than guessing.
///
/// The piecewise schedule is allowed to go negative past 60% weighted
/// concentration; the caller clamps when a bounded value is required.
pub fn holder_concentration_risk(
    chains: &BTreeMap<String, ChainSnapshot>,
) -> Result<f64, ScoreError> {
    let mut weighted_supply = 0.0;
    let mut weighted_concentration = 0.0;
    for (chain, snapshot) in chains {
        match snapshot.top50_concentration {
            Some(c50) => {
                weighted_supply += snapshot.supply;
                weighted_concentration += c50 * snapshot.supply;
            }
            None => warn!(chain = %chain, "no holder data; excluded from concentration weighting"),
        }
    }
    if weighted_supply <= 0.0 {
        return Err(ScoreError::MissingHolderData);
    }
    let concentration = weighted_concentration / weighted_supply;

    let score = if concentration <= 30.0 {
        100.0 - concentration / 1.5
    } else if concentration <= 60.0 {
        80.0 - (concentration - 30.0) / 1.5
    } else {
        60.0 - (concentration - 60.0) * 1.5
    };
    debug!(concentration, score, "holder concentration");
    Ok(score)
}

//================================================================================================//
//                                SECONDARY MARKET LIQUIDITY                                      //
//================================================================================================//

/// Maps a slippage percentage onto the 0-100 liquidity score.
///
/// Up to 0.5% slippage the score degrades gently from 100 toward 80; beyond
/// that it falls steeply, hitting 0 at 2.5%.
fn slippage_to_score(slippage_pct: f64) -> f64 {
    if slippage_pct <= 0.5 {
        (100.0 - (slippage_pct - 0.2) / 0.3 * 20.0).clamp(0.0, 100.0)
    } else {
        (80.0 - (slippage_pct - 0.5) / 2.0 * 80.0).clamp(0.0, 100.0)
    }
}

/// Supply-weighted slippage across chains, then mapped to a score. A chain
/// missing from the simulation results (no eligible pool) is charged full
/// slippage.
pub fn secondary_market_liquidity(data: &OnChainData) -> f64 {
    let total_supply = data.total_supply();
    if total_supply <= 0.0 {
        return slippage_to_score(FULL_SLIPPAGE_PCT);
    }
    let weighted_slippage: f64 = data
        .chains
        .iter()
        .map(|(chain, snapshot)| {
            let slippage =
                data.slippage_by_chain.get(chain).copied().unwrap_or(FULL_SLIPPAGE_PCT);
            slippage * snapshot.supply / total_supply
        })
        .sum();
    debug!(weighted_slippage, "aggregate simulated slippage");
    slippage_to_score(weighted_slippage)
}

//================================================================================================//
//                                          BLEND                                                 //
//================================================================================================//

/// Computes the OHS index and its sub-score breakdown.
#[instrument(skip_all)]
pub fn calculate_ohs(
    data: &OnChainData,
    settings: &ScoringSettings,
    thresholds: &ThresholdSettings,
) -> Result<(Index, OhsBreakdown), ScoreError> {
    let pmcs = primary_market_confidence(&data.market_history, settings.min_history_samples)?;
    let hcr = holder_concentration_risk(&data.chains)?;
    let smls = secondary_market_liquidity(data);

    let [w_pmcs, w_hcr, w_smls] = settings.ohs_weights;
    let value = w_pmcs * pmcs + w_hcr * hcr + w_smls * smls;
    debug!(pmcs, hcr, smls, value, "OHS computed");

    let index = Index::new(
        "OHS",
        value,
        Threshold::Single(thresholds.ohs),
        "Primary market confidence, holder concentration and secondary market liquidity",
    );
    Ok((index, OhsBreakdown { pmcs, hcr, smls }))
}
