// src/lib.rs

//! # pegscore
//!
//! Solvency and market-health risk scoring for fiat-backed stablecoins.
//!
//! The engine combines two independent views of a stablecoin:
//!
//! - A **reserve-composition score** (FRRS) built from a reconciled reserve
//!   table. Several independently-produced model estimates of the issuer's
//!   attestation report are merged into one canonical, conservatively-voted
//!   table.
//! - An **on-chain health score** (OHS) built from multi-chain supply data,
//!   holder concentration, and simulated DEX slippage under stress.
//!
//! The two are blended into a **total risk score** (TRS) whose reserve weight
//! decays with the age of the underlying attestation.
//!
//! Transport, PDF table extraction, model invocation, and chain RPC are all
//! external collaborators reached through the trait seams in [`extraction`]
//! and [`chain_data`]; everything in this crate is deterministic given their
//! outputs.

pub mod amm_math;
pub mod cache;
pub mod chain_data;
pub mod config;
pub mod cusip;
pub mod engine;
pub mod errors;
pub mod extraction;
pub mod fetch;
pub mod narrative;
pub mod reconcile;
pub mod scoring;
pub mod types;

pub use config::Config;
pub use engine::Evaluator;
pub use errors::EngineError;
pub use types::{
    AssetCategory, AssetTable, CandidateEstimate, EvaluationRequest, EvaluationResponse, Index,
    Indices, OnChainData, RiskResult,
};
