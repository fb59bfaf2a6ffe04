//! Document analysis jobs.
//!
//! An analysis runs as an asynchronous remote job: submit it against a stored
//! document, poll until it reaches a terminal state, then page through the
//! results with a continuation token. [`run_analysis`] drives that
//! lifecycle over any [`AnalysisService`] and returns the combined block set.

mod poll;
#[cfg(feature = "remote")]
mod textract;

pub use poll::{cancel_pair, CancelHandle, CancelToken, PollPolicy};
#[cfg(feature = "remote")]
pub use textract::TextractClient;

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{AnalysisDocument, Block};

/// Where the analysed document is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    /// Bucket name
    pub bucket: String,
    /// Object key
    pub name: String,
}

impl DocumentLocation {
    /// Create a location.
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.name)
    }
}

/// Kind of structure the analysis should extract besides text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    /// Tables and their cells
    Tables,
    /// Key/value form fields
    Forms,
}

/// State of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Still running
    InProgress,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    Failed,
    /// Finished, but some pages could not be analysed
    PartialSuccess,
}

impl JobStatus {
    /// Check if the job will not change state any more.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

/// One response page of a job status / result query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisPage {
    /// Current job state
    pub job_status: JobStatus,

    /// Continuation token for the next result page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,

    /// Blocks on this result page
    #[serde(default)]
    pub blocks: Vec<Block>,

    /// Service message, usually set when the job failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl AnalysisPage {
    /// A page with the given status and no blocks.
    pub fn status(job_status: JobStatus) -> Self {
        Self {
            job_status,
            next_token: None,
            blocks: Vec::new(),
            status_message: None,
        }
    }

    /// Attach blocks and return self.
    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Attach a continuation token and return self.
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// A remote service that analyses stored documents.
pub trait AnalysisService: Send + Sync {
    /// Submit a job and return its id.
    fn start_analysis(&self, location: &DocumentLocation, features: &[FeatureType])
        -> Result<String>;

    /// Query job status, and results once the job is done.
    ///
    /// `next_token` selects a result page after the first one.
    fn get_analysis(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage>;
}

/// Run an analysis job to completion and combine all result pages.
///
/// Polls according to `policy` and stops early when `cancel` fires.
///
/// # Errors
/// * [`Error::JobFailed`] when the job ends in `FAILED`
/// * [`Error::Timeout`] when the policy's time budget runs out
/// * [`Error::Cancelled`] when cancellation was requested
pub fn run_analysis<S: AnalysisService + ?Sized>(
    service: &S,
    location: &DocumentLocation,
    features: &[FeatureType],
    policy: &PollPolicy,
    cancel: &CancelToken,
) -> Result<AnalysisDocument> {
    cancel.check()?;
    let job_id = service.start_analysis(location, features)?;
    log::info!("Started analysis job {} for {}", job_id, location);

    let first = wait_for_job(service, &job_id, policy, cancel)?;
    let doc = collect_results(service, &job_id, first, cancel)?;
    log::info!(
        "Analysis job {} returned {} blocks on {} pages",
        job_id,
        doc.block_count(),
        doc.page_count()
    );
    Ok(doc)
}

/// Poll until the job reaches a terminal state.
///
/// Returns the terminal response, which already holds the first result page.
pub fn wait_for_job<S: AnalysisService + ?Sized>(
    service: &S,
    job_id: &str,
    policy: &PollPolicy,
    cancel: &CancelToken,
) -> Result<AnalysisPage> {
    let started = Instant::now();
    let mut interval = policy.interval;
    let mut attempts = 0u32;

    loop {
        cancel.check()?;
        attempts += 1;
        let page = service.get_analysis(job_id, None)?;

        match page.job_status {
            JobStatus::Succeeded => return Ok(page),
            JobStatus::PartialSuccess => {
                log::warn!(
                    "Analysis job {} partially succeeded: {}",
                    job_id,
                    page.status_message.as_deref().unwrap_or("no details")
                );
                return Ok(page);
            }
            JobStatus::Failed => {
                return Err(Error::JobFailed {
                    job_id: job_id.to_string(),
                    reason: page
                        .status_message
                        .unwrap_or_else(|| "no status message".to_string()),
                })
            }
            JobStatus::InProgress => {}
        }

        let wait = match policy.timeout {
            Some(timeout) => {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    log::error!(
                        "Analysis job {} still running after {} checks",
                        job_id,
                        attempts
                    );
                    return Err(Error::Timeout(timeout));
                }
                interval.min(timeout - elapsed)
            }
            None => interval,
        };

        log::debug!("Analysis job {} in progress, next check in {:?}", job_id, wait);
        cancel.sleep(wait)?;
        interval = policy.next_interval(interval);
    }
}

fn collect_results<S: AnalysisService + ?Sized>(
    service: &S,
    job_id: &str,
    first: AnalysisPage,
    cancel: &CancelToken,
) -> Result<AnalysisDocument> {
    let mut doc = AnalysisDocument::new();
    let mut page = first;
    let mut pages = 1usize;

    loop {
        let token = page.continuation().map(str::to_string);
        doc.extend(page.blocks);

        match token {
            Some(token) => {
                cancel.check()?;
                page = service.get_analysis(job_id, Some(&token))?;
                pages += 1;
            }
            None => break,
        }
    }

    log::debug!("Collected {} result pages for job {}", pages, job_id);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted status responses, then serves result pages by token.
    struct ScriptedService {
        statuses: Mutex<VecDeque<AnalysisPage>>,
        calls: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedService {
        fn new(statuses: Vec<AnalysisPage>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Option<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AnalysisService for ScriptedService {
        fn start_analysis(&self, _: &DocumentLocation, features: &[FeatureType]) -> Result<String> {
            assert_eq!(features, &[FeatureType::Tables]);
            Ok("job-1".to_string())
        }

        fn get_analysis(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage> {
            assert_eq!(job_id, "job-1");
            self.calls.lock().unwrap().push(next_token.map(str::to_string));
            match next_token {
                Some("t2") => Ok(AnalysisPage::status(JobStatus::Succeeded)
                    .with_blocks(vec![Block::line("l2", "two")])
                    .with_next_token("t3")),
                Some("t3") => Ok(AnalysisPage::status(JobStatus::Succeeded)
                    .with_blocks(vec![Block::line("l3", "three")])),
                Some(other) => Err(Error::Service(format!("unknown token {}", other))),
                None => {
                    let mut statuses = self.statuses.lock().unwrap();
                    Ok(statuses
                        .pop_front()
                        .unwrap_or_else(|| AnalysisPage::status(JobStatus::InProgress)))
                }
            }
        }
    }

    fn fast() -> PollPolicy {
        PollPolicy::new()
            .with_interval(Duration::from_millis(1))
            .with_max_interval(Duration::from_millis(2))
    }

    fn location() -> DocumentLocation {
        DocumentLocation::new("bucket", "uploads/form.pdf")
    }

    #[test]
    fn test_polls_then_pages_results() {
        let service = ScriptedService::new(vec![
            AnalysisPage::status(JobStatus::InProgress),
            AnalysisPage::status(JobStatus::InProgress),
            AnalysisPage::status(JobStatus::Succeeded)
                .with_blocks(vec![Block::page("p1"), Block::line("l1", "one")])
                .with_next_token("t2"),
        ]);

        let doc = run_analysis(
            &service,
            &location(),
            &[FeatureType::Tables],
            &fast(),
            &CancelToken::never(),
        )
        .unwrap();

        let ids: Vec<_> = doc.blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "l1", "l2", "l3"]);
        assert_eq!(
            service.calls(),
            vec![None, None, None, Some("t2".to_string()), Some("t3".to_string())]
        );
    }

    #[test]
    fn test_failed_job() {
        let mut failed = AnalysisPage::status(JobStatus::Failed);
        failed.status_message = Some("unsupported document".to_string());
        let service = ScriptedService::new(vec![failed]);

        let result = run_analysis(
            &service,
            &location(),
            &[FeatureType::Tables],
            &fast(),
            &CancelToken::never(),
        );
        match result {
            Err(Error::JobFailed { job_id, reason }) => {
                assert_eq!(job_id, "job-1");
                assert_eq!(reason, "unsupported document");
            }
            other => panic!("expected JobFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_success_is_accepted() {
        let service = ScriptedService::new(vec![AnalysisPage::status(JobStatus::PartialSuccess)
            .with_blocks(vec![Block::page("p1")])]);
        let doc = run_analysis(
            &service,
            &location(),
            &[FeatureType::Tables],
            &fast(),
            &CancelToken::never(),
        )
        .unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_timeout() {
        let service = ScriptedService::new(Vec::new());
        let policy = fast().with_timeout(Duration::from_millis(20));
        let result = run_analysis(
            &service,
            &location(),
            &[FeatureType::Tables],
            &policy,
            &CancelToken::never(),
        );
        assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_millis(20)));
        assert!(service.calls().len() >= 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let service = ScriptedService::new(Vec::new());
        let (handle, token) = cancel_pair();
        handle.cancel();
        let result = run_analysis(&service, &location(), &[FeatureType::Tables], &fast(), &token);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_empty_next_token_ends_paging() {
        let service = ScriptedService::new(vec![AnalysisPage::status(JobStatus::Succeeded)
            .with_blocks(vec![Block::page("p1")])
            .with_next_token("")]);
        let doc = run_analysis(
            &service,
            &location(),
            &[FeatureType::Tables],
            &fast(),
            &CancelToken::never(),
        )
        .unwrap();
        assert_eq!(doc.block_count(), 1);
        assert_eq!(service.calls().len(), 1);
    }

    #[test]
    fn test_page_json_shape() {
        let json = r#"{"JobStatus":"IN_PROGRESS","StatusMessage":null}"#;
        let page: AnalysisPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.job_status, JobStatus::InProgress);
        assert!(page.blocks.is_empty());

        let json = r#"{"JobStatus":"SUCCEEDED","NextToken":"abc","Blocks":[{"BlockType":"PAGE","Id":"p"}]}"#;
        let page: AnalysisPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.continuation(), Some("abc"));
        assert_eq!(page.blocks.len(), 1);
    }
}
