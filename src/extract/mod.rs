pub mod commits;
pub mod pull_requests;
pub mod repos;
pub mod reviews;

pub use commits::CommitsExtractor;
pub use pull_requests::PullRequestsExtractor;
pub use repos::ReposExtractor;
pub use reviews::ReviewsExtractor;

use thiserror::Error;

use crate::frame::Frame;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] crate::fetch::FetchError),

    #[error("Artifact write failed: {0}")]
    Artifact(#[from] crate::artifact::ArtifactError),
}

/// Register an entity's declared columns on an extraction result that came
/// back without any, so the written artifact stays readable. Parquet cannot
/// represent a zero-column file.
pub(crate) fn ensure_base_columns(frame: &mut Frame, columns: &[&str]) {
    if frame.columns().is_empty() {
        for column in columns {
            frame.ensure_column(column);
        }
    }
}
