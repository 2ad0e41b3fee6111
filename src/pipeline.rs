use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};

use crate::artifact;
use crate::extract::{
    CommitsExtractor, ExtractError, PullRequestsExtractor, ReposExtractor, ReviewsExtractor,
};
use crate::fetch::Fetch;
use crate::frame::Frame;

/// The four extraction steps, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Repos,
    Commits,
    PullRequests,
    Reviews,
}

impl Step {
    /// Artifact base name, which doubles as the destination table name.
    pub fn artifact(&self) -> &'static str {
        match self {
            Step::Repos => ReposExtractor::ARTIFACT,
            Step::Commits => CommitsExtractor::ARTIFACT,
            Step::PullRequests => PullRequestsExtractor::ARTIFACT,
            Step::Reviews => ReviewsExtractor::ARTIFACT,
        }
    }

    /// Declared columns an empty artifact for this step carries.
    fn base_columns(&self) -> &'static [&'static str] {
        match self {
            Step::Repos => ReposExtractor::BASE_COLUMNS,
            Step::Commits => CommitsExtractor::BASE_COLUMNS,
            Step::PullRequests => PullRequestsExtractor::BASE_COLUMNS,
            Step::Reviews => ReviewsExtractor::BASE_COLUMNS,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Repos => "repos",
            Step::Commits => "commits",
            Step::PullRequests => "pull requests",
            Step::Reviews => "reviews",
        })
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Extraction of {step} failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: ExtractError,
    },
}

/// Observer for pipeline progress, injected so the orchestrator's control
/// flow is testable without capturing process output.
pub trait Reporter: Send + Sync {
    fn step_started(&self, step: Step);
    fn step_finished(&self, step: Step, rows: usize);
    fn step_failed(&self, step: Step, error: &ExtractError);
}

/// Default reporter: structured logs via `tracing`.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn step_started(&self, step: Step) {
        info!(%step, "extracting");
    }

    fn step_finished(&self, step: Step, rows: usize) {
        info!(%step, rows, "extracted");
    }

    fn step_failed(&self, step: Step, error: &ExtractError) {
        error!(%step, %error, "extraction step failed");
    }
}

pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Start date filter for the commits step (e.g. "90d", "2025-01-01").
    pub start_date: String,
    /// When set, a failed step is replaced by an empty artifact and the run
    /// proceeds; dependent steps then see an empty key-list.
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    pub rows: usize,
    pub failed: bool,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub repos: StepOutcome,
    pub commits: StepOutcome,
    pub pull_requests: StepOutcome,
    pub reviews: StepOutcome,
}

impl RunSummary {
    pub fn steps(&self) -> [(Step, StepOutcome); 4] {
        [
            (Step::Repos, self.repos),
            (Step::Commits, self.commits),
            (Step::PullRequests, self.pull_requests),
            (Step::Reviews, self.reviews),
        ]
    }
}

/// Sequences the four extractors: Repos → Commits → PRs → Reviews, no
/// backward transitions. The repo list the PR step fans out over comes from
/// the just-extracted repos frame (never inferred from commits data), and
/// the PR numbers the reviews step fans out over come from the
/// just-extracted PR frame, grouped by repository.
pub struct Pipeline<'a> {
    fetch: &'a dyn Fetch,
    reporter: &'a dyn Reporter,
}

impl<'a> Pipeline<'a> {
    pub fn new(fetch: &'a dyn Fetch, reporter: &'a dyn Reporter) -> Self {
        Self { fetch, reporter }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();
        let out = options.output_dir.as_path();

        self.reporter.step_started(Step::Repos);
        let repos = match ReposExtractor.extract(self.fetch, out).await {
            Ok(frame) => self.finish(Step::Repos, frame, &mut summary.repos),
            Err(e) => self.fall_back(Step::Repos, e, options, &mut summary.repos)?,
        };
        let repo_names = repos.strings("full_name");

        self.reporter.step_started(Step::Commits);
        match CommitsExtractor
            .extract(self.fetch, out, &options.start_date)
            .await
        {
            Ok(frame) => {
                self.finish(Step::Commits, frame, &mut summary.commits);
            }
            Err(e) => {
                self.fall_back(Step::Commits, e, options, &mut summary.commits)?;
            }
        }

        self.reporter.step_started(Step::PullRequests);
        let pull_requests = match PullRequestsExtractor
            .extract(self.fetch, out, &repo_names)
            .await
        {
            Ok(frame) => self.finish(Step::PullRequests, frame, &mut summary.pull_requests),
            Err(e) => self.fall_back(Step::PullRequests, e, options, &mut summary.pull_requests)?,
        };
        let prs_by_repo = pull_requests.group_u64_by("repo_name", "number");

        self.reporter.step_started(Step::Reviews);
        match ReviewsExtractor
            .extract(self.fetch, out, &prs_by_repo)
            .await
        {
            Ok(frame) => {
                self.finish(Step::Reviews, frame, &mut summary.reviews);
            }
            Err(e) => {
                self.fall_back(Step::Reviews, e, options, &mut summary.reviews)?;
            }
        }

        Ok(summary)
    }

    fn finish(&self, step: Step, frame: Frame, outcome: &mut StepOutcome) -> Frame {
        self.reporter.step_finished(step, frame.len());
        outcome.rows = frame.len();
        frame
    }

    /// Apply the failure policy: abort by default, or log and substitute an
    /// empty artifact so the run can proceed.
    fn fall_back(
        &self,
        step: Step,
        error: ExtractError,
        options: &RunOptions,
        outcome: &mut StepOutcome,
    ) -> Result<Frame, PipelineError> {
        self.reporter.step_failed(step, &error);
        if !options.continue_on_error {
            return Err(PipelineError::Step {
                step,
                source: error,
            });
        }
        outcome.failed = true;
        let mut empty = Frame::new();
        for column in step.base_columns() {
            empty.ensure_column(column);
        }
        artifact::write(&empty, &artifact_path(&options.output_dir, step))
            .map_err(|e| PipelineError::Step {
                step,
                source: e.into(),
            })?;
        Ok(empty)
    }
}

fn artifact_path(output_dir: &Path, step: Step) -> PathBuf {
    output_dir.join(format!("{}.parquet", step.artifact()))
}
