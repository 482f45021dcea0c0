// src/extraction/table_service.rs

//! [`TableExtractor`] adapter for the external table-extraction service. The
//! service receives the raw PDF bytes and answers with cell grids; the grids
//! are rendered here into pipe-separated text rows, which is what both the
//! CUSIP scanner and the prompt template consume.

use async_trait::async_trait;
use serde::Deserialize;

use super::TableExtractor;
use crate::errors::ExtractionError;

pub struct TableServiceExtractor {
    client: reqwest::Client,
    url: String,
}

impl TableServiceExtractor {
    pub fn new(url: String) -> Self {
        Self { client: reqwest::Client::new(), url }
    }
}

#[derive(Deserialize)]
struct ExtractedTables {
    tables: Vec<Vec<Vec<String>>>,
}

/// Renders one cell grid as pipe-separated rows.
fn render_grid(grid: &[Vec<String>]) -> String {
    grid.iter()
        .map(|row| format!("| {} |", row.join(" | ")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl TableExtractor for TableServiceExtractor {
    async fn extract_tables(
        &self,
        document: &[u8],
        source_hash: &str,
    ) -> Result<Vec<String>, ExtractionError> {
        let extraction_err = |reason: String| ExtractionError::TableExtraction {
            source_hash: source_hash.to_string(),
            reason,
        };
        let response: ExtractedTables = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(document.to_vec())
            .send()
            .await
            .map_err(|e| extraction_err(e.to_string()))?
            .json()
            .await
            .map_err(|e| extraction_err(e.to_string()))?;

        Ok(response
            .tables
            .iter()
            .filter(|grid| !grid.is_empty())
            .map(|grid| render_grid(grid))
            .collect())
    }
}
