// src/extraction/mod.rs

//! # Document-to-Table Extraction Pipeline
//!
//! Turns one attestation document into a canonical [`AssetTable`]:
//!
//! 1. An external [`TableExtractor`] renders the document's tabular grids as
//!    text.
//! 2. The joined table text is scanned for checksum-valid CUSIPs (the
//!    transparency signal) and substituted into the configured prompt
//!    template.
//! 3. N independent [`ReserveModel`]s are queried concurrently, each under a
//!    per-call timeout. A call that errors, times out, or returns an
//!    unparsable estimate is dropped from the candidate set.
//! 4. The surviving candidates are reconciled by conservative voting. Zero
//!    survivors aborts the evaluation; a silently zeroed table would score as
//!    "no reserves" and is worse than no answer.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::ExtractionSettings;
use crate::cusip::has_valid_cusip;
use crate::errors::{EngineError, ExtractionError};
use crate::reconcile::reconcile;
use crate::types::{AssetTable, CandidateEstimate};

pub mod ollama_model;
pub mod table_service;

pub use ollama_model::OllamaReserveModel;
pub use table_service::TableServiceExtractor;

/// External capability: turn a PDF document into a sequence of text-rendered
/// tabular grids.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    async fn extract_tables(
        &self,
        document: &[u8],
        source_hash: &str,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// External capability: one model's best-effort structured reserve estimate
/// for a table-derived prompt.
#[async_trait]
pub trait ReserveModel: Send + Sync {
    fn name(&self) -> &str;

    async fn estimate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<CandidateEstimate, ExtractionError>;
}

/// Substitutes the rendered tables into the prompt template.
fn complete_user_prompt(tables: &[String], template: &str) -> String {
    template
        .replace("__tables__", &tables.join("\n\n"))
        .replace("_tablenum_", &tables.len().to_string())
}

pub struct ExtractionPipeline {
    extractor: Arc<dyn TableExtractor>,
    models: Vec<Arc<dyn ReserveModel>>,
    settings: ExtractionSettings,
}

impl ExtractionPipeline {
    pub fn new(
        extractor: Arc<dyn TableExtractor>,
        models: Vec<Arc<dyn ReserveModel>>,
        settings: ExtractionSettings,
    ) -> Self {
        Self { extractor, models, settings }
    }

    /// Runs the full pipeline for one document.
    #[instrument(skip(self, document), fields(source_hash = %source_hash, bytes = document.len()))]
    pub async fn analyze_document(
        &self,
        document: &[u8],
        source_hash: &str,
    ) -> Result<AssetTable, EngineError> {
        let tables = self.extractor.extract_tables(document, source_hash).await?;
        if tables.is_empty() {
            return Err(ExtractionError::NoTables(source_hash.to_string()).into());
        }
        debug!(tables = tables.len(), "tables extracted");

        let cusip_appearance = has_valid_cusip(&tables.join("\n"));
        let user_prompt = complete_user_prompt(&tables, &self.settings.prompt_template);

        let candidates = self.gather_candidates(&user_prompt, source_hash).await?;
        let table = reconcile(
            &candidates,
            cusip_appearance,
            source_hash.to_string(),
            Utc::now(),
        )?;
        info!(cusip_appearance, total = %table.total.amount, "document reconciled");
        Ok(table)
    }

    /// Queries every configured model concurrently; failures and timeouts are
    /// dropped, an empty surviving set is fatal.
    async fn gather_candidates(
        &self,
        user_prompt: &str,
        source_hash: &str,
    ) -> Result<Vec<CandidateEstimate>, ExtractionError> {
        let timeout = Duration::from_secs(self.settings.model_timeout_secs);
        let mut calls: FuturesUnordered<_> = self
            .models
            .iter()
            .map(|model| {
                let model = Arc::clone(model);
                let system = self.settings.system_prompt.clone();
                let user = user_prompt.to_string();
                async move {
                    let outcome =
                        tokio::time::timeout(timeout, model.estimate(&system, &user)).await;
                    (model.name().to_string(), outcome)
                }
            })
            .collect();

        let mut candidates = Vec::with_capacity(self.models.len());
        while let Some((name, outcome)) = calls.next().await {
            match outcome {
                Ok(Ok(candidate)) => {
                    debug!(model = %name, "candidate collected");
                    candidates.push(candidate);
                }
                Ok(Err(e)) => warn!(model = %name, error = %e, "model call failed; dropped"),
                Err(_) => warn!(model = %name, timeout_secs = timeout.as_secs(), "model call timed out; dropped"),
            }
        }

        if candidates.is_empty() {
            return Err(ExtractionError::NoSurvivingCandidates {
                source_hash: source_hash.to_string(),
                attempted: self.models.len(),
            });
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct StaticExtractor(Vec<String>);

    #[async_trait]
    impl TableExtractor for StaticExtractor {
        async fn extract_tables(
            &self,
            _document: &[u8],
            _source_hash: &str,
        ) -> Result<Vec<String>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    enum ModelBehavior {
        Answer(CandidateEstimate),
        Fail,
        Hang,
    }

    struct ScriptedModel {
        name: String,
        behavior: ModelBehavior,
    }

    #[async_trait]
    impl ReserveModel for ScriptedModel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn estimate(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
        ) -> Result<CandidateEstimate, ExtractionError> {
            match &self.behavior {
                ModelBehavior::Answer(c) => Ok(c.clone()),
                ModelBehavior::Fail => Err(ExtractionError::ModelEndpoint("boom".into())),
                ModelBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("timed out before waking")
                }
            }
        }
    }

    fn settings(timeout_secs: u64) -> ExtractionSettings {
        ExtractionSettings {
            models: vec![],
            model_host: String::new(),
            extractor_url: String::new(),
            model_timeout_secs: timeout_secs,
            prompt_template: "You will get _tablenum_ tables:\n__tables__".to_string(),
            system_prompt: "extract".to_string(),
        }
    }

    fn pipeline(
        tables: Vec<String>,
        behaviors: Vec<ModelBehavior>,
        timeout_secs: u64,
    ) -> ExtractionPipeline {
        let models = behaviors
            .into_iter()
            .enumerate()
            .map(|(i, behavior)| {
                Arc::new(ScriptedModel { name: format!("model-{i}"), behavior })
                    as Arc<dyn ReserveModel>
            })
            .collect();
        ExtractionPipeline::new(Arc::new(StaticExtractor(tables)), models, settings(timeout_secs))
    }

    fn candidate(cash: i64, total: i64) -> CandidateEstimate {
        CandidateEstimate {
            cash_bank_deposits: Some(cash.into()),
            total: Some(total.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_substitution() {
        let tables = vec!["| a | b |".to_string(), "| c |".to_string()];
        let prompt = complete_user_prompt(&tables, "n=_tablenum_\n__tables__");
        assert!(prompt.starts_with("n=2\n"));
        assert!(prompt.contains("| a | b |\n\n| c |"));
    }

    #[tokio::test]
    async fn test_failed_and_hung_models_are_dropped_not_fatal() {
        let p = pipeline(
            vec!["| Cash | 100 |".to_string()],
            vec![
                ModelBehavior::Answer(candidate(100, 200)),
                ModelBehavior::Answer(candidate(100, 200)),
                ModelBehavior::Fail,
                ModelBehavior::Hang,
            ],
            1,
        );
        let table = p.analyze_document(b"pdf", "hash").await.unwrap();
        assert_eq!(table.cash_bank_deposits.amount, dec!(100));
        assert_eq!(table.total.amount, dec!(200));
    }

    #[tokio::test]
    async fn test_zero_survivors_is_fatal() {
        let p = pipeline(
            vec!["| Cash | 100 |".to_string()],
            vec![ModelBehavior::Fail, ModelBehavior::Hang],
            1,
        );
        let err = p.analyze_document(b"pdf", "hash").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Extraction(ExtractionError::NoSurvivingCandidates { attempted: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_no_tables_is_fatal() {
        let p = pipeline(vec![], vec![ModelBehavior::Answer(candidate(1, 1))], 1);
        let err = p.analyze_document(b"pdf", "hash").await.unwrap_err();
        assert!(matches!(err, EngineError::Extraction(ExtractionError::NoTables(_))));
    }

    #[tokio::test]
    async fn test_cusip_in_tables_sets_transparency_flag() {
        let p = pipeline(
            vec!["| T-Bill 912797MS3 | 100 |".to_string()],
            vec![
                ModelBehavior::Answer(candidate(100, 100)),
                ModelBehavior::Answer(candidate(100, 100)),
            ],
            1,
        );
        let table = p.analyze_document(b"pdf", "hash").await.unwrap();
        assert!(table.cusip_appearance);

        let p = pipeline(
            vec!["| Cash | 100 |".to_string()],
            vec![
                ModelBehavior::Answer(candidate(100, 100)),
                ModelBehavior::Answer(candidate(100, 100)),
            ],
            1,
        );
        let table = p.analyze_document(b"pdf", "hash").await.unwrap();
        assert!(!table.cusip_appearance);
    }
}
