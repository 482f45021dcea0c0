// src/types.rs

//! # Core Data Model
//!
//! All shared types for the scoring engine live here: the closed reserve
//! category enum, the canonical asset table produced by reconciliation, the
//! per-evaluation on-chain snapshot, the computed indices, and the
//! request/response envelope.
//!
//! Design notes:
//!
//! - The 13 reserve categories form a **closed enum** with a fixed iteration
//!   order ([`AssetCategory::ALL`]); adding or removing a category is a
//!   compile-time visible change everywhere the table is consumed.
//! - USD amounts are [`Decimal`] so the reconciler's sum invariant
//!   (`category_sum + correction == total`) holds exactly, not within float
//!   rounding. Scores and ratios are `f64`.
//! - All values here are built once by their owning component and never
//!   mutated afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//================================================================================================//
//                                      RESERVE CATEGORIES                                        //
//================================================================================================//

/// The fixed set of reserve asset categories recognized in attestation
/// reports, ordered tier 1 (most liquid) to tier 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    CashBankDeposits,
    UsTreasuryBills,
    GovMmf,
    OtherDeposits,
    RepoOvernightTerm,
    NonUsTreasuryBills,
    UsTreasuryOtherNotesBonds,
    CorporateBonds,
    PreciousMetals,
    DigitalAssets,
    SecuredLoans,
    OtherInvestments,
    CustodialConcentratedAsset,
}

impl AssetCategory {
    /// Canonical iteration order, tier 1 first. Every table walk uses this.
    pub const ALL: [AssetCategory; 13] = [
        AssetCategory::CashBankDeposits,
        AssetCategory::UsTreasuryBills,
        AssetCategory::GovMmf,
        AssetCategory::OtherDeposits,
        AssetCategory::RepoOvernightTerm,
        AssetCategory::NonUsTreasuryBills,
        AssetCategory::UsTreasuryOtherNotesBonds,
        AssetCategory::CorporateBonds,
        AssetCategory::PreciousMetals,
        AssetCategory::DigitalAssets,
        AssetCategory::SecuredLoans,
        AssetCategory::OtherInvestments,
        AssetCategory::CustodialConcentratedAsset,
    ];

    pub fn tier(&self) -> u8 {
        match self {
            AssetCategory::CashBankDeposits
            | AssetCategory::UsTreasuryBills
            | AssetCategory::GovMmf
            | AssetCategory::OtherDeposits => 1,
            AssetCategory::RepoOvernightTerm
            | AssetCategory::NonUsTreasuryBills
            | AssetCategory::UsTreasuryOtherNotesBonds => 2,
            AssetCategory::CorporateBonds
            | AssetCategory::PreciousMetals
            | AssetCategory::DigitalAssets => 3,
            AssetCategory::SecuredLoans
            | AssetCategory::OtherInvestments
            | AssetCategory::CustodialConcentratedAsset => 4,
        }
    }

    /// Quality-liquidity score in [0, 1]; the weight this category carries in
    /// the reserve quality score.
    pub fn quality_liquidity_score(&self) -> f64 {
        match self {
            AssetCategory::CashBankDeposits => 1.0,
            AssetCategory::UsTreasuryBills => 1.0,
            AssetCategory::GovMmf => 0.95,
            AssetCategory::OtherDeposits => 0.95,
            AssetCategory::RepoOvernightTerm => 0.9,
            AssetCategory::NonUsTreasuryBills => 0.85,
            AssetCategory::UsTreasuryOtherNotesBonds => 0.8,
            AssetCategory::CorporateBonds => 0.7,
            AssetCategory::PreciousMetals => 0.6,
            AssetCategory::DigitalAssets => 0.4,
            AssetCategory::SecuredLoans => 0.2,
            AssetCategory::OtherInvestments => 0.1,
            AssetCategory::CustodialConcentratedAsset => 0.0,
        }
    }

    /// Stable snake_case key, used in logs and table rendering.
    pub fn key(&self) -> &'static str {
        match self {
            AssetCategory::CashBankDeposits => "cash_bank_deposits",
            AssetCategory::UsTreasuryBills => "us_treasury_bills",
            AssetCategory::GovMmf => "gov_mmf",
            AssetCategory::OtherDeposits => "other_deposits",
            AssetCategory::RepoOvernightTerm => "repo_overnight_term",
            AssetCategory::NonUsTreasuryBills => "non_us_treasury_bills",
            AssetCategory::UsTreasuryOtherNotesBonds => "us_treasury_other_notes_bonds",
            AssetCategory::CorporateBonds => "corporate_bonds",
            AssetCategory::PreciousMetals => "precious_metals",
            AssetCategory::DigitalAssets => "digital_assets",
            AssetCategory::SecuredLoans => "secured_loans",
            AssetCategory::OtherInvestments => "other_investments",
            AssetCategory::CustodialConcentratedAsset => "custodial_concentrated_asset",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

//================================================================================================//
//                                        ASSET TABLE                                             //
//================================================================================================//

/// One row of the reserve table. `tier` and `quality_liquidity_score` are
/// fixed per category; `amount` and `ratio` are computed by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub tier: u8,
    pub quality_liquidity_score: f64,
    pub amount: Decimal,
    pub ratio: f64,
}

impl Asset {
    pub fn zeroed(category: AssetCategory) -> Self {
        Self {
            tier: category.tier(),
            quality_liquidity_score: category.quality_liquidity_score(),
            amount: Decimal::ZERO,
            ratio: 0.0,
        }
    }
}

/// The canonical reserve table for one attestation document: 13 categories,
/// a synthetic correction entry (tier 5) absorbing the unattributed remainder,
/// and the grand total (tier 0).
///
/// Built once by the reconciler, immutable afterwards, persisted keyed by
/// `source_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetTable {
    pub cash_bank_deposits: Asset,
    pub us_treasury_bills: Asset,
    pub gov_mmf: Asset,
    pub other_deposits: Asset,
    pub repo_overnight_term: Asset,
    pub non_us_treasury_bills: Asset,
    pub us_treasury_other_notes_bonds: Asset,
    pub corporate_bonds: Asset,
    pub precious_metals: Asset,
    pub digital_assets: Asset,
    pub secured_loans: Asset,
    pub other_investments: Asset,
    pub custodial_concentrated_asset: Asset,
    /// Tier-5 entry holding `total - category_sum`. Its ratio is an inverse
    /// confidence signal: a large correction share means most reserves could
    /// not be attributed to known categories.
    pub correction: Asset,
    /// Tier-0 grand total. Never smaller than the sum of the categories.
    pub total: Asset,
    /// Whether a checksum-valid CUSIP appeared in the source document.
    pub cusip_appearance: bool,
    /// Content hash (SHA-256) of the originating document.
    pub source_hash: String,
    /// When this table was reconciled; drives the TRS weight decay.
    pub analyzed_at: DateTime<Utc>,
}

impl AssetTable {
    /// A zeroed table carrying only provenance. The reconciler fills it in.
    pub fn empty(cusip_appearance: bool, source_hash: String, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            cash_bank_deposits: Asset::zeroed(AssetCategory::CashBankDeposits),
            us_treasury_bills: Asset::zeroed(AssetCategory::UsTreasuryBills),
            gov_mmf: Asset::zeroed(AssetCategory::GovMmf),
            other_deposits: Asset::zeroed(AssetCategory::OtherDeposits),
            repo_overnight_term: Asset::zeroed(AssetCategory::RepoOvernightTerm),
            non_us_treasury_bills: Asset::zeroed(AssetCategory::NonUsTreasuryBills),
            us_treasury_other_notes_bonds: Asset::zeroed(AssetCategory::UsTreasuryOtherNotesBonds),
            corporate_bonds: Asset::zeroed(AssetCategory::CorporateBonds),
            precious_metals: Asset::zeroed(AssetCategory::PreciousMetals),
            digital_assets: Asset::zeroed(AssetCategory::DigitalAssets),
            secured_loans: Asset::zeroed(AssetCategory::SecuredLoans),
            other_investments: Asset::zeroed(AssetCategory::OtherInvestments),
            custodial_concentrated_asset: Asset::zeroed(AssetCategory::CustodialConcentratedAsset),
            correction: Asset {
                tier: 5,
                quality_liquidity_score: 0.0,
                amount: Decimal::ZERO,
                ratio: 0.0,
            },
            total: Asset {
                tier: 0,
                quality_liquidity_score: 0.0,
                amount: Decimal::ZERO,
                ratio: 100.0,
            },
            cusip_appearance,
            source_hash,
            analyzed_at,
        }
    }

    pub fn get(&self, category: AssetCategory) -> &Asset {
        match category {
            AssetCategory::CashBankDeposits => &self.cash_bank_deposits,
            AssetCategory::UsTreasuryBills => &self.us_treasury_bills,
            AssetCategory::GovMmf => &self.gov_mmf,
            AssetCategory::OtherDeposits => &self.other_deposits,
            AssetCategory::RepoOvernightTerm => &self.repo_overnight_term,
            AssetCategory::NonUsTreasuryBills => &self.non_us_treasury_bills,
            AssetCategory::UsTreasuryOtherNotesBonds => &self.us_treasury_other_notes_bonds,
            AssetCategory::CorporateBonds => &self.corporate_bonds,
            AssetCategory::PreciousMetals => &self.precious_metals,
            AssetCategory::DigitalAssets => &self.digital_assets,
            AssetCategory::SecuredLoans => &self.secured_loans,
            AssetCategory::OtherInvestments => &self.other_investments,
            AssetCategory::CustodialConcentratedAsset => &self.custodial_concentrated_asset,
        }
    }

    pub(crate) fn get_mut(&mut self, category: AssetCategory) -> &mut Asset {
        match category {
            AssetCategory::CashBankDeposits => &mut self.cash_bank_deposits,
            AssetCategory::UsTreasuryBills => &mut self.us_treasury_bills,
            AssetCategory::GovMmf => &mut self.gov_mmf,
            AssetCategory::OtherDeposits => &mut self.other_deposits,
            AssetCategory::RepoOvernightTerm => &mut self.repo_overnight_term,
            AssetCategory::NonUsTreasuryBills => &mut self.non_us_treasury_bills,
            AssetCategory::UsTreasuryOtherNotesBonds => &mut self.us_treasury_other_notes_bonds,
            AssetCategory::CorporateBonds => &mut self.corporate_bonds,
            AssetCategory::PreciousMetals => &mut self.precious_metals,
            AssetCategory::DigitalAssets => &mut self.digital_assets,
            AssetCategory::SecuredLoans => &mut self.secured_loans,
            AssetCategory::OtherInvestments => &mut self.other_investments,
            AssetCategory::CustodialConcentratedAsset => &mut self.custodial_concentrated_asset,
        }
    }

    /// Category rows in canonical order (excludes correction and total).
    pub fn iter(&self) -> impl Iterator<Item = (AssetCategory, &Asset)> {
        AssetCategory::ALL.iter().map(move |c| (*c, self.get(*c)))
    }

    /// Sum of the 13 category amounts (excludes correction and total).
    pub fn category_sum(&self) -> Decimal {
        self.iter().map(|(_, a)| a.amount).sum()
    }
}

impl fmt::Display for AssetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = ["Asset", "Tier", "QLS", "Amount (USD)", "Ratio"];
        let mut rows: Vec<[String; 5]> = Vec::with_capacity(15);
        for (category, asset) in self.iter() {
            rows.push([
                category.key().replace('_', " "),
                asset.tier.to_string(),
                format!("{:.2}", asset.quality_liquidity_score),
                format!("{:.2}", asset.amount),
                format!("{:.2}%", asset.ratio),
            ]);
        }
        rows.push([
            "correction".to_string(),
            self.correction.tier.to_string(),
            format!("{:.2}", self.correction.quality_liquidity_score),
            format!("{:.2}", self.correction.amount),
            format!("{:.2}%", self.correction.ratio),
        ]);
        let total_row = [
            "TOTAL".to_string(),
            String::new(),
            String::new(),
            format!("{:.2}", self.total.amount),
            String::new(),
        ];

        let mut widths = [0usize; 5];
        for (i, h) in header.iter().enumerate() {
            widths[i] = h.len();
        }
        for row in rows.iter().chain(std::iter::once(&total_row)) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let fmt_row = |cells: &[String; 5]| -> String {
            cells
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
                .collect::<Vec<_>>()
                .join(" | ")
        };
        let sep = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-");

        let header_row: [String; 5] = [
            header[0].to_string(),
            header[1].to_string(),
            header[2].to_string(),
            header[3].to_string(),
            header[4].to_string(),
        ];
        writeln!(f, "{}", fmt_row(&header_row))?;
        writeln!(f, "{}", sep)?;
        for row in &rows {
            writeln!(f, "{}", fmt_row(row))?;
        }
        writeln!(f, "{}", sep)?;
        write!(f, "{}", fmt_row(&total_row))
    }
}

//================================================================================================//
//                                     CANDIDATE ESTIMATES                                        //
//================================================================================================//

/// One model's raw guess at the reserve breakdown. `None` means the model
/// could not judge that category; `Some(0)` means it judged the category
/// present with zero amount. The two are never conflated.
///
/// Ephemeral: discarded once reconciliation has produced an [`AssetTable`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateEstimate {
    pub cash_bank_deposits: Option<Decimal>,
    pub us_treasury_bills: Option<Decimal>,
    pub gov_mmf: Option<Decimal>,
    pub other_deposits: Option<Decimal>,
    pub repo_overnight_term: Option<Decimal>,
    pub non_us_treasury_bills: Option<Decimal>,
    pub us_treasury_other_notes_bonds: Option<Decimal>,
    pub corporate_bonds: Option<Decimal>,
    pub precious_metals: Option<Decimal>,
    pub digital_assets: Option<Decimal>,
    pub secured_loans: Option<Decimal>,
    pub other_investments: Option<Decimal>,
    pub custodial_concentrated_asset: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl CandidateEstimate {
    pub fn get(&self, category: AssetCategory) -> Option<Decimal> {
        match category {
            AssetCategory::CashBankDeposits => self.cash_bank_deposits,
            AssetCategory::UsTreasuryBills => self.us_treasury_bills,
            AssetCategory::GovMmf => self.gov_mmf,
            AssetCategory::OtherDeposits => self.other_deposits,
            AssetCategory::RepoOvernightTerm => self.repo_overnight_term,
            AssetCategory::NonUsTreasuryBills => self.non_us_treasury_bills,
            AssetCategory::UsTreasuryOtherNotesBonds => self.us_treasury_other_notes_bonds,
            AssetCategory::CorporateBonds => self.corporate_bonds,
            AssetCategory::PreciousMetals => self.precious_metals,
            AssetCategory::DigitalAssets => self.digital_assets,
            AssetCategory::SecuredLoans => self.secured_loans,
            AssetCategory::OtherInvestments => self.other_investments,
            AssetCategory::CustodialConcentratedAsset => self.custodial_concentrated_asset,
        }
    }
}

//================================================================================================//
//                                      ON-CHAIN SNAPSHOT                                         //
//================================================================================================//

/// One daily market observation for the coin (across all chains).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSample {
    pub timestamp: DateTime<Utc>,
    pub market_cap: f64,
    pub price: f64,
}

/// One liquidity pool quoting the target coin against a reference stablecoin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    /// USD-denominated reserve size of the pool.
    pub reserve_usd: f64,
    /// Exchange price target/reference observed in the pool.
    pub price: f64,
}

/// Everything collected for one chain in one evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Outstanding token supply on this chain.
    pub supply: f64,
    /// Combined balance share of the top 50 holders, in percent. `None` when
    /// the chain's holder API reports nothing.
    pub top50_concentration: Option<f64>,
    /// Pools eligible for slippage simulation.
    pub pools: Vec<LiquidityPool>,
}

/// Per-evaluation on-chain snapshot. Rebuilt every run, never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnChainData {
    pub chains: BTreeMap<String, ChainSnapshot>,
    /// Trailing daily (timestamp, market cap, price) series.
    pub market_history: Vec<MarketSample>,
    /// Simulated StableSwap slippage percentage per chain at the stress size.
    pub slippage_by_chain: BTreeMap<String, f64>,
}

impl OnChainData {
    pub fn total_supply(&self) -> f64 {
        self.chains.values().map(|c| c.supply).sum()
    }
}

//================================================================================================//
//                                          INDICES                                               //
//================================================================================================//

/// Alert threshold for an index: a single floor, or a (severe, warning) band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Single(f64),
    Band(f64, f64),
}

/// Outcome of comparing an index value against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdVerdict {
    Stable,
    Warning,
    Severe,
}

impl Threshold {
    pub fn verdict(&self, value: f64) -> ThresholdVerdict {
        match *self {
            Threshold::Single(floor) => {
                if value < floor {
                    ThresholdVerdict::Warning
                } else {
                    ThresholdVerdict::Stable
                }
            }
            Threshold::Band(severe, warning) => {
                if value < severe {
                    ThresholdVerdict::Severe
                } else if value < warning {
                    ThresholdVerdict::Warning
                } else {
                    ThresholdVerdict::Stable
                }
            }
        }
    }
}

/// A computed risk index on the 0-100 scale. Values are derived, never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub value: f64,
    pub threshold: Threshold,
    pub description: String,
}

impl Index {
    /// Builds an index, clamping the value into the [0, 100] contract.
    pub fn new(
        name: impl Into<String>,
        value: f64,
        threshold: Threshold,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.clamp(0.0, 100.0),
            threshold,
            description: description.into(),
        }
    }

    pub fn verdict(&self) -> ThresholdVerdict {
        self.threshold.verdict(self.value)
    }
}

/// The three indices of one evaluation: exactly FRRS, OHS, TRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indices {
    pub frrs: Index,
    pub ohs: Index,
    pub trs: Index,
}

//================================================================================================//
//                                     EVALUATION ENVELOPE                                        //
//================================================================================================//

/// Everything known about the coin at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinData {
    pub stablecoin_ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub asset_table: AssetTable,
    pub onchain_data: OnChainData,
}

/// Terminal artifact of one evaluation. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskResult {
    pub coin_data: CoinData,
    pub indices: Indices,
    pub narrative: String,
}

/// Provenance of the attestation document under evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub report_issuer: String,
    pub report_pdf_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub stablecoin_ticker: String,
    pub provenance: Provenance,
    pub protocol_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_status: Option<String>,
    pub evaluation_time: DateTime<Utc>,
    pub stablecoin_ticker: String,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_result: Option<RiskResult>,
    pub protocol_version: String,
}
