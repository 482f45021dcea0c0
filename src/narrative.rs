// src/narrative.rs

//! # Threshold Checks & Narrative Assembly
//!
//! Turns the three computed indices into the human-readable verdict attached
//! to every result. The TRS verdict leads; when TRS itself is stable but a
//! sub-index breached its threshold, a caveat follows before the sub-index
//! sentences. Optionally pushes the verdict to a configured webhook.

use tracing::{info, warn};

use crate::config::AlertSettings;
use crate::types::{Indices, ThresholdVerdict};

fn frrs_sentence(verdict: ThresholdVerdict) -> &'static str {
    match verdict {
        ThresholdVerdict::Stable => {
            "The FRRS value is stable. The issuer's asset management is judged to be relatively risk-free."
        }
        _ => {
            "[Warning] The value of FRRS is unusual. This indicates that the issuer's asset management practices pose significant risks."
        }
    }
}

fn ohs_sentence(verdict: ThresholdVerdict) -> &'static str {
    match verdict {
        ThresholdVerdict::Stable => {
            "The OHS value is stable. On-chain integrity currently appears secured."
        }
        _ => {
            "[Warning] The value of OHS is unusual. The chains on which the stablecoin is issued may be experiencing liquidity shortages or a decline in net issuance."
        }
    }
}

fn trs_sentence(verdict: ThresholdVerdict) -> &'static str {
    match verdict {
        ThresholdVerdict::Severe => {
            "[Warning] The TRS value is severely low. Strongly recommended to quickly identify risks and make decisions."
        }
        ThresholdVerdict::Warning => {
            "[Warning] The TRS value is unusual. Potential risks have been identified for the stablecoin in question."
        }
        ThresholdVerdict::Stable => {
            "The TRS value is stable. The potential risk of the stablecoin is considered to be minimal."
        }
    }
}

/// Assembles the narrative for one evaluation.
pub fn build_narrative(indices: &Indices) -> String {
    let frrs = indices.frrs.verdict();
    let ohs = indices.ohs.verdict();
    let trs = indices.trs.verdict();

    let mut lines = vec![trs_sentence(trs).to_string()];
    if trs == ThresholdVerdict::Stable
        && (frrs != ThresholdVerdict::Stable || ohs != ThresholdVerdict::Stable)
    {
        lines.push(
            "However, values that imply potential risks were found among the sub-indices of the TRS."
                .to_string(),
        );
    }
    lines.push(frrs_sentence(frrs).to_string());
    lines.push(ohs_sentence(ohs).to_string());
    lines.join("\n")
}

/// True when any index breached its threshold.
pub fn any_breach(indices: &Indices) -> bool {
    [&indices.frrs, &indices.ohs, &indices.trs]
        .iter()
        .any(|i| i.verdict() != ThresholdVerdict::Stable)
}

/// Best-effort webhook notification; failures are logged, never propagated
/// into the evaluation result.
pub async fn push_alert(settings: &AlertSettings, narrative: &str) {
    let Some(url) = &settings.webhook_url else {
        return;
    };
    let client = reqwest::Client::new();
    let body = serde_json::json!({ "text": narrative });
    match client.post(url).json(&body).send().await.and_then(|r| r.error_for_status()) {
        Ok(_) => info!("alert webhook delivered"),
        Err(e) => warn!(error = %e, "alert webhook failed"),
    }
}
