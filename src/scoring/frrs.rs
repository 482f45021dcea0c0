// src/scoring/frrs.rs

//! # Fiat Reserve Risk Score
//!
//! Scores reserve quality, disclosure transparency, and over-collateralization
//! from the reconciled reserve table.
//!
//! `FRRS = min(100, RQS * TA * SA)` where RQS is the quality-weighted reserve
//! composition on the 0-100 scale, TA rewards verifiable instrument-code
//! disclosure, and SA grants a logarithmic, diminishing-returns bonus for
//! reserves above the outstanding supply. An under-collateralized coin
//! (`CR < 1`) zeroes the score outright regardless of reserve quality.

use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, instrument};

use crate::config::ThresholdSettings;
use crate::errors::ScoreError;
use crate::types::{AssetTable, Index, Threshold};

/// Transparency adjustment when at least one checksum-valid CUSIP was
/// disclosed in the source document.
const TA_WITH_CUSIP: f64 = 1.0;
const TA_WITHOUT_CUSIP: f64 = 0.85;

/// Quality-weighted reserve composition: `sum(ratio_i * qls_i)` over the 13
/// categories, on the 0-100 scale. The correction entry carries a zero
/// quality weight, so an unattributable remainder drags the score down.
pub fn reserve_quality_score(table: &AssetTable) -> f64 {
    table
        .iter()
        .map(|(_, asset)| asset.ratio * asset.quality_liquidity_score)
        .sum()
}

/// Solvency adjustment from the collateralization ratio.
///
/// `CR < 1` scores 0. At exactly `CR = 1` the bonus term vanishes
/// (`ln(1) = 0`) and SA is exactly 1. Above that the `(CR-1)*100` scaling
/// feeds a log curve, so the first percentage points of over-collateralization
/// count the most.
fn solvency_adjustment(collateralization_ratio: f64) -> f64 {
    if collateralization_ratio < 1.0 {
        0.0
    } else {
        1.0 + 0.05 * ((collateralization_ratio - 1.0) * 100.0 + 1.0).ln()
    }
}

/// Computes the FRRS index.
///
/// `outstanding_supply` of zero is a fatal input error: the collateralization
/// ratio is undefined and silently scoring it would mask broken supply data.
#[instrument(skip(table, thresholds), fields(source_hash = %table.source_hash))]
pub fn calculate_frrs(
    table: &AssetTable,
    outstanding_supply: f64,
    thresholds: &ThresholdSettings,
) -> Result<Index, ScoreError> {
    if outstanding_supply <= 0.0 {
        return Err(ScoreError::ZeroOutstandingSupply);
    }

    let rqs = reserve_quality_score(table);
    let ta = if table.cusip_appearance { TA_WITH_CUSIP } else { TA_WITHOUT_CUSIP };
    let total_reserves = table.total.amount.to_f64().unwrap_or(0.0);
    let cr = total_reserves / outstanding_supply;
    let sa = solvency_adjustment(cr);
    let value = (rqs * ta * sa).min(100.0);

    debug!(rqs, ta, cr, sa, value, "FRRS computed");
    Ok(Index::new(
        "FRRS",
        value,
        Threshold::Single(thresholds.frrs),
        "Reserve quality, transparency and over-collateralization of the attested reserves",
    ))
}
