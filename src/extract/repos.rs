use std::path::Path;

use tracing::instrument;

use super::{ensure_base_columns, ExtractError};
use crate::artifact;
use crate::fetch::Fetch;
use crate::frame::Frame;

/// Extract repositories from `GET /repos`.
///
/// Flat-array style, unpaginated. Rows carry the composite `full_name`
/// identifier the later steps fan out over.
pub struct ReposExtractor;

impl ReposExtractor {
    pub const ARTIFACT: &'static str = "repos";
    pub const BASE_COLUMNS: &'static [&'static str] = &["full_name", "default_branch", "created_at"];

    #[instrument(skip(self, fetch, output_dir))]
    pub async fn extract(
        &self,
        fetch: &dyn Fetch,
        output_dir: &Path,
    ) -> Result<Frame, ExtractError> {
        let mut frame = fetch.flat("/repos", &[]).await?;
        ensure_base_columns(&mut frame, Self::BASE_COLUMNS);
        artifact::write(&frame, &output_dir.join(format!("{}.parquet", Self::ARTIFACT)))?;
        Ok(frame)
    }
}
