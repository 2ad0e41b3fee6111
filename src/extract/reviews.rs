use std::path::Path;

use serde_json::Value;
use tracing::{debug, instrument};

use super::{ensure_base_columns, ExtractError};
use crate::artifact;
use crate::fetch::Fetch;
use crate::frame::Frame;

/// Extract reviews from `GET /repos/{owner/repo}/pulls/{number}/reviews`,
/// once per (repo, PR number) pair.
///
/// Flat-array style, unpaginated. Rows are tagged with both `repo_name` and
/// `pr_number` — neither is present in the raw response.
pub struct ReviewsExtractor;

impl ReviewsExtractor {
    pub const ARTIFACT: &'static str = "reviews";
    pub const BASE_COLUMNS: &'static [&'static str] =
        &["id", "state", "submitted_at", "repo_name", "pr_number"];

    #[instrument(skip(self, fetch, output_dir, prs_by_repo), fields(repos = prs_by_repo.len()))]
    pub async fn extract(
        &self,
        fetch: &dyn Fetch,
        output_dir: &Path,
        prs_by_repo: &[(String, Vec<u64>)],
    ) -> Result<Frame, ExtractError> {
        let mut combined = Frame::new();
        for (repo, pr_numbers) in prs_by_repo {
            debug!(repo, prs = pr_numbers.len(), "fetching reviews");
            for pr_number in pr_numbers {
                let mut frame = fetch
                    .flat(&format!("/repos/{repo}/pulls/{pr_number}/reviews"), &[])
                    .await?;
                if !frame.is_empty() {
                    frame.tag("repo_name", Value::String(repo.clone()));
                    frame.tag("pr_number", Value::from(*pr_number));
                    combined.append(frame);
                }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::StubFetch;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rows_are_tagged_with_repo_and_pr_number() {
        let fetch = StubFetch::new()
            .with_rows(
                "/repos/acme/platform/pulls/1/reviews",
                json!([{"id": 10, "state": "APPROVED"}, {"id": 11, "state": "CHANGES_REQUESTED"}]),
            )
            .with_rows(
                "/repos/acme/platform/pulls/2/reviews",
                json!([{"id": 12, "state": "APPROVED"}]),
            );
        let dir = tempdir().unwrap();

        let groups = vec![("acme/platform".to_string(), vec![1, 2])];
        let frame = ReviewsExtractor
            .extract(&fetch, dir.path(), &groups)
            .await
            .unwrap();

        assert_eq!(frame.len(), 3);
        assert_eq!(
            frame.strings("repo_name"),
            vec!["acme/platform"; 3]
        );
        let pr_numbers: Vec<u64> = frame
            .rows()
            .iter()
            .map(|row| row["pr_number"].as_u64().unwrap())
            .collect();
        assert_eq!(pr_numbers, vec![1, 1, 2]);
    }

    #[tokio::test]
    async fn test_empty_pr_list_writes_empty_artifact_without_fetching() {
        let fetch = StubFetch::new();
        let dir = tempdir().unwrap();

        let frame = ReviewsExtractor
            .extract(&fetch, dir.path(), &[])
            .await
            .unwrap();

        assert!(frame.is_empty());
        assert!(fetch.calls().is_empty());

        let restored = artifact::read(&dir.path().join("reviews.parquet")).unwrap();
        assert!(restored.is_empty());
        assert!(restored.has_column("pr_number"));
    }

    #[tokio::test]
    async fn test_prs_without_reviews_yield_zero_rows() {
        // Endpoint not stubbed: serves an empty frame, like a PR nobody reviewed.
        let fetch = StubFetch::new();
        let dir = tempdir().unwrap();

        let groups = vec![("acme/platform".to_string(), vec![5])];
        let frame = ReviewsExtractor
            .extract(&fetch, dir.path(), &groups)
            .await
            .unwrap();

        assert!(frame.is_empty());
        assert_eq!(fetch.calls(), vec!["/repos/acme/platform/pulls/5/reviews"]);
    }
}
