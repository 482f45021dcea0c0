// src/errors.rs

//! # Centralized Error Handling
//!
//! Hierarchical, typed errors for the whole engine. Each subsystem owns its
//! error enum and everything converts upward into [`EngineError`], so a single
//! evaluation failure carries its origin without ambiguous string errors.

use thiserror::Error;

/// The top-level error type for one evaluation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
    #[error("On-chain data error: {0}")]
    ChainData(#[from] ChainDataError),
    #[error("Scoring error: {0}")]
    Score(#[from] ScoreError),
    #[error("AMM math error: {0}")]
    Amm(#[from] AmmError),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Document fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Request-level validation failures, rejected before any work begins.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Unsupported stablecoin ticker: {ticker}. Supported tickers: {supported:?}")]
    UnsupportedTicker { ticker: String, supported: Vec<String> },
    #[error("Malformed ticker {0:?}: expected 3-5 uppercase letters")]
    MalformedTicker(String),
    #[error("Malformed report issuer {0:?}: expected 3-50 word characters, spaces or dashes")]
    MalformedIssuer(String),
    #[error("Malformed report URL {0:?}: {1}")]
    MalformedUrl(String, String),
    #[error("Malformed protocol version {0:?}: expected vMAJOR.MINOR.PATCH")]
    MalformedProtocolVersion(String),
}

/// Failures in the document-to-candidates pipeline. Individual model-call
/// failures are dropped from the candidate set; only a fully empty set is
/// surfaced as an error.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Table extraction failed for document {source_hash}: {reason}")]
    TableExtraction { source_hash: String, reason: String },
    #[error("Document {0} produced no tables")]
    NoTables(String),
    #[error("All {attempted} model calls failed or timed out for document {source_hash}")]
    NoSurvivingCandidates { source_hash: String, attempted: usize },
    #[error("Model endpoint error: {0}")]
    ModelEndpoint(String),
}

/// Failures of the voting reconciler itself.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Cannot reconcile an empty candidate set")]
    NoCandidates,
}

/// Failures while collecting per-chain supply, holder, and liquidity data.
#[derive(Error, Debug)]
pub enum ChainDataError {
    #[error("Provider error on chain {chain}: {reason}")]
    Provider { chain: String, reason: String },
    #[error("Market history unavailable: {0}")]
    MarketHistory(String),
    #[error("No chains configured for ticker {0}")]
    NoChains(String),
}

/// Numeric and data errors raised by the score calculators.
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Total outstanding supply is zero; collateralization ratio is undefined")]
    ZeroOutstandingSupply,
    #[error("Insufficient market history: {got} samples, need at least {need}")]
    InsufficientHistory { got: usize, need: usize },
    #[error("No chain reported holder concentration data")]
    MissingHolderData,
    #[error("Supply series contains a non-positive sample at index {0}")]
    DegenerateSupplySample(usize),
}

/// Errors from the swap-curve simulators.
#[derive(Error, Debug)]
pub enum AmmError {
    #[error("Trade size must be positive, got {0}")]
    NonPositiveTradeSize(f64),
    #[error("StableSwap solver did not converge within {0} iterations")]
    SolverDivergence(u32),
}

/// Errors from the content-addressed result cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt cached table for hash {hash}: {reason}")]
    Corrupt { hash: String, reason: String },
}

/// Errors while downloading and hashing the source document.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed for {url}: {reason}")]
    Request { url: String, reason: String },
    #[error("URL {url} did not return a PDF (content type {content_type:?})")]
    NotAPdf { url: String, content_type: String },
    #[error("Empty document body from {0}")]
    EmptyBody(String),
}
