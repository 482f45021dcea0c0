// src/scoring/mod.rs

//! # Composite Index Calculators
//!
//! The three risk indices of one evaluation:
//!
//! - [`frrs`] — Fiat Reserve Risk Score, from the reconciled reserve table.
//! - [`ohs`] — On-Chain Health Score, from the per-evaluation chain snapshot
//!   (supply-shock anomaly detection, holder concentration, simulated
//!   secondary-market liquidity).
//! - [`trs`] — Total Risk Score, a report-age-weighted blend of the two.
//!
//! Calculators are pure: thresholds and policy knobs come in through
//! [`crate::config`] values, data through the snapshot types, and each
//! returns a freshly built [`crate::types::Index`].

pub mod frrs;
pub mod ohs;
pub mod trs;

pub use frrs::calculate_frrs;
pub use ohs::{calculate_ohs, OhsBreakdown};
pub use trs::calculate_trs;
