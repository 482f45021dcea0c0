// src/reconcile.rs

//! # Extraction Reconciler
//!
//! Merges N independent per-category reserve estimates into one canonical
//! [`AssetTable`]. The voting rule is deliberately conservative and must not
//! be replaced with a standard median:
//!
//! - A value a model did not report (`None`) is *not* a zero vote; the model
//!   abstained. An explicit `0` is a real vote that the category is absent.
//! - A category confirmed by only one model reconciles to 0: a single
//!   unconfirmed claim is not trusted.
//! - With two or more votes the **lower median** is taken (for an even count,
//!   the smaller of the two middle values). Undervoting a category inflates
//!   the correction entry, and the correction ratio is read downstream as an
//!   inverse confidence signal, so the bias errs toward "we could not
//!   attribute this" rather than toward optimistic reserves.
//!
//! The reported total is voted with the same rule but floored at the sum of
//! the reconciled categories: a total can never be smaller than its parts.
//! The remainder lands in the tier-5 correction entry.
//!
//! Reconciliation is pure: the same candidate set always yields the same
//! table.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::errors::ReconcileError;
use crate::types::{AssetCategory, AssetTable, CandidateEstimate};

/// Lower-median vote over the explicit values for one category.
///
/// 0 votes -> unconfirmed, 0. 1 vote -> unconfirmed by policy, 0.
/// >=2 votes -> element at index `(n - 1) / 2` of the ascending sort.
fn vote(mut values: Vec<Decimal>) -> Decimal {
    match values.len() {
        0 | 1 => Decimal::ZERO,
        n => {
            values.sort();
            values[(n - 1) / 2]
        }
    }
}

/// Reconciles a non-empty candidate set into the canonical reserve table.
///
/// An empty set is a hard failure: extraction must be retried upstream, never
/// silently zeroed into a table that would score as "no reserves".
#[instrument(skip(candidates), fields(candidates = candidates.len(), source_hash = %source_hash))]
pub fn reconcile(
    candidates: &[CandidateEstimate],
    cusip_appearance: bool,
    source_hash: String,
    analyzed_at: DateTime<Utc>,
) -> Result<AssetTable, ReconcileError> {
    if candidates.is_empty() {
        return Err(ReconcileError::NoCandidates);
    }

    let mut table = AssetTable::empty(cusip_appearance, source_hash, analyzed_at);

    let mut category_sum = Decimal::ZERO;
    for category in AssetCategory::ALL {
        let votes: Vec<Decimal> = candidates.iter().filter_map(|c| c.get(category)).collect();
        let n = votes.len();
        let amount = vote(votes);
        debug!(category = %category, valid_votes = n, %amount, "category vote");
        table.get_mut(category).amount = amount;
        category_sum += amount;
    }

    let total_vote = vote(candidates.iter().filter_map(|c| c.total).collect());
    // The total may never be reported smaller than the sum of its parts.
    let total = total_vote.max(category_sum);
    table.total.amount = total;
    table.correction.amount = total - category_sum;

    if !total.is_zero() {
        for category in AssetCategory::ALL {
            let asset = table.get_mut(category);
            asset.ratio = (asset.amount / total * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0);
        }
        table.correction.ratio = (table.correction.amount / total * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0);
    }

    debug!(%total, %category_sum, correction = %table.correction.amount, "reconciled");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candidate(cash: Option<Decimal>, total: Option<Decimal>) -> CandidateEstimate {
        CandidateEstimate {
            cash_bank_deposits: cash,
            total,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_candidate_set_is_hard_failure() {
        let err = reconcile(&[], false, "h".into(), Utc::now()).unwrap_err();
        assert!(matches!(err, ReconcileError::NoCandidates));
    }

    #[test]
    fn test_single_vote_reconciles_to_zero() {
        let candidates = vec![
            candidate(Some(dec!(500)), Some(dec!(500))),
            candidate(None, Some(dec!(500))),
            candidate(None, Some(dec!(500))),
        ];
        let table = reconcile(&candidates, false, "h".into(), Utc::now()).unwrap();
        assert_eq!(table.cash_bank_deposits.amount, Decimal::ZERO);
        // The lone claim ends up in the correction entry instead.
        assert_eq!(table.correction.amount, dec!(500));
    }

    #[test]
    fn test_absent_is_not_a_zero_vote() {
        // Two models abstain, two vote {100, 120}: lower median is 100.
        // If None were counted as 0, the median would collapse to 0.
        let candidates = vec![
            candidate(Some(dec!(100)), Some(dec!(100))),
            candidate(Some(dec!(120)), Some(dec!(120))),
            candidate(None, Some(dec!(100))),
            candidate(None, Some(dec!(100))),
        ];
        let table = reconcile(&candidates, false, "h".into(), Utc::now()).unwrap();
        assert_eq!(table.cash_bank_deposits.amount, dec!(100));
    }

    #[test]
    fn test_explicit_zero_is_a_real_vote() {
        let candidates = vec![
            candidate(Some(dec!(0)), Some(dec!(50))),
            candidate(Some(dec!(100)), Some(dec!(50))),
        ];
        let table = reconcile(&candidates, false, "h".into(), Utc::now()).unwrap();
        // Even count: the smaller middle value wins.
        assert_eq!(table.cash_bank_deposits.amount, Decimal::ZERO);
    }

    #[test]
    fn test_even_count_takes_lower_middle() {
        let candidates = vec![
            candidate(Some(dec!(10)), None),
            candidate(Some(dec!(20)), None),
            candidate(Some(dec!(30)), None),
            candidate(Some(dec!(40)), None),
        ];
        let table = reconcile(&candidates, false, "h".into(), Utc::now()).unwrap();
        assert_eq!(table.cash_bank_deposits.amount, dec!(20));
    }

    #[test]
    fn test_reference_scenario() {
        // Three candidates: cash {100, 100, 120}, totals {200, 210, 200}.
        let candidates = vec![
            candidate(Some(dec!(100)), Some(dec!(200))),
            candidate(Some(dec!(100)), Some(dec!(210))),
            candidate(Some(dec!(120)), Some(dec!(200))),
        ];
        let table = reconcile(&candidates, false, "h".into(), Utc::now()).unwrap();
        assert_eq!(table.cash_bank_deposits.amount, dec!(100));
        assert_eq!(table.total.amount, dec!(200));
        assert_eq!(table.correction.amount, dec!(100));
        assert_eq!(table.cash_bank_deposits.ratio, 50.0);
        assert_eq!(table.correction.ratio, 50.0);
    }

    #[test]
    fn test_total_floor_on_underreported_total() {
        let mut a = candidate(Some(dec!(300)), Some(dec!(100)));
        a.us_treasury_bills = Some(dec!(200));
        let mut b = candidate(Some(dec!(300)), Some(dec!(100)));
        b.us_treasury_bills = Some(dec!(200));
        let table = reconcile(&[a, b], false, "h".into(), Utc::now()).unwrap();
        // category_sum = 500 > voted total 100: the floor wins.
        assert_eq!(table.total.amount, dec!(500));
        assert_eq!(table.correction.amount, Decimal::ZERO);
    }

    #[test]
    fn test_sum_invariant_holds_exactly() {
        let candidates = vec![
            candidate(Some(dec!(123.45)), Some(dec!(1000.01))),
            candidate(Some(dec!(123.47)), Some(dec!(999.99))),
            candidate(Some(dec!(124.00)), Some(dec!(1000.01))),
        ];
        let table = reconcile(&candidates, false, "h".into(), Utc::now()).unwrap();
        assert_eq!(table.category_sum() + table.correction.amount, table.total.amount);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let candidates = vec![
            candidate(Some(dec!(100)), Some(dec!(200))),
            candidate(Some(dec!(120)), Some(dec!(210))),
            candidate(Some(dec!(110)), Some(dec!(190))),
        ];
        let at = Utc::now();
        let first = reconcile(&candidates, true, "h".into(), at).unwrap();
        let second = reconcile(&candidates, true, "h".into(), at).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_zero_candidates_give_zero_table_with_zero_ratios() {
        let candidates = vec![candidate(Some(dec!(0)), Some(dec!(0))); 2];
        let table = reconcile(&candidates, false, "h".into(), Utc::now()).unwrap();
        assert_eq!(table.total.amount, Decimal::ZERO);
        assert_eq!(table.cash_bank_deposits.ratio, 0.0);
        assert_eq!(table.correction.ratio, 0.0);
    }
}
