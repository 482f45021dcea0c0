// src/scoring/trs.rs

//! # Total Risk Score
//!
//! Blends FRRS and OHS with a weight that decays as the underlying
//! attestation ages: freshly attested reserves dominate trust at first, live
//! on-chain signals take over entirely by day 180.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::config::ThresholdSettings;
use crate::types::{Index, Indices};

/// Reserve-side blend weight for a report analyzed `age_days` whole days ago.
///
/// Piecewise linear: 0.7 at day 0, 0.5 at day 30, 0 at day 180 and beyond.
/// Non-increasing over the whole domain and continuous at both knees.
pub fn offline_weight(age_days: f64) -> f64 {
    if age_days <= 30.0 {
        0.7 - age_days / 150.0
    } else if age_days <= 180.0 {
        0.5 - (age_days - 30.0) / 300.0
    } else {
        0.0
    }
}

/// Blends the two indices into TRS and bundles all three.
#[instrument(skip_all, fields(frrs = frrs.value, ohs = ohs.value))]
pub fn calculate_trs(
    frrs: Index,
    ohs: Index,
    analyzed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    thresholds: &ThresholdSettings,
) -> Indices {
    // Whole days; a report analyzed 29.9 days ago is still on the first
    // schedule segment.
    let age_days = (now - analyzed_at).num_days().max(0) as f64;
    let w = offline_weight(age_days);
    let value = w * frrs.value + (1.0 - w) * ohs.value;
    debug!(age_days, w, value, "TRS computed");

    let trs = Index::new(
        "TRS",
        value,
        thresholds.trs,
        "Report-age-weighted blend of reserve risk and on-chain health",
    );
    Indices { frrs, ohs, trs }
}
