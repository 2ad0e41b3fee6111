use std::path::Path;

use tracing::instrument;

use super::{ensure_base_columns, ExtractError};
use crate::artifact;
use crate::fetch::Fetch;
use crate::frame::Frame;

/// Extract commits from `GET /analytics/ai-code/commits`.
///
/// Wrapped style, paginated, filtered by a `startDate` lookback (relative
/// like "90d" or an absolute date — the server interprets it).
pub struct CommitsExtractor;

impl CommitsExtractor {
    pub const ARTIFACT: &'static str = "commits";
    pub const BASE_COLUMNS: &'static [&'static str] = &[
        "commitHash",
        "userEmail",
        "repoName",
        "tabLinesAdded",
        "composerLinesAdded",
        "nonAiLinesAdded",
        "commitTs",
    ];

    #[instrument(skip(self, fetch, output_dir))]
    pub async fn extract(
        &self,
        fetch: &dyn Fetch,
        output_dir: &Path,
        start_date: &str,
    ) -> Result<Frame, ExtractError> {
        let query = [("startDate".to_string(), start_date.to_string())];
        let mut frame = fetch
            .wrapped_paginated("/analytics/ai-code/commits", &query)
            .await?;
        ensure_base_columns(&mut frame, Self::BASE_COLUMNS);
        artifact::write(&frame, &output_dir.join(format!("{}.parquet", Self::ARTIFACT)))?;
        Ok(frame)
    }
}
