use std::path::Path;

use serde_json::Value;
use tracing::{debug, instrument};

use super::{ensure_base_columns, ExtractError};
use crate::artifact;
use crate::fetch::Fetch;
use crate::frame::Frame;

/// Extract pull requests from `GET /repos/{owner/repo}/pulls`, once per
/// repository.
///
/// Flat-array style, paginated. The raw endpoint does not say which repo a
/// PR belongs to, so every row is tagged with a `repo_name` column before
/// the per-repo results are concatenated.
pub struct PullRequestsExtractor;

impl PullRequestsExtractor {
    pub const ARTIFACT: &'static str = "pull_requests";
    pub const BASE_COLUMNS: &'static [&'static str] =
        &["number", "state", "additions", "deletions", "created_at", "repo_name"];

    #[instrument(skip(self, fetch, output_dir, repos), fields(repos = repos.len()))]
    pub async fn extract(
        &self,
        fetch: &dyn Fetch,
        output_dir: &Path,
        repos: &[String],
    ) -> Result<Frame, ExtractError> {
        let mut combined = Frame::new();
        for repo in repos {
            let query = [("state".to_string(), "all".to_string())];
            let mut frame = fetch
                .flat_paginated(&format!("/repos/{repo}/pulls"), &query)
                .await?;
            debug!(repo, rows = frame.len(), "fetched pull requests");
            if !frame.is_empty() {
                frame.tag("repo_name", Value::String(repo.clone()));
                combined.append(frame);
            }
        }
        ensure_base_columns(&mut combined, Self::BASE_COLUMNS);
        artifact::write(
            &combined,
            &output_dir.join(format!("{}.parquet", Self::ARTIFACT)),
        )?;
        Ok(combined)
    }
}
