use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{error, info, info_span, Instrument};

use crate::github::{GitHubClient, GitHubError};
use crate::issues::{CreatedIssue, FailedIssue, IssueRequest};

/// Anything that can turn an IssueRequest into an issue.
/// Must be Send + Sync so requests can run concurrently.
#[async_trait]
pub trait IssueCreator: Send + Sync {
    async fn create_issue(&self, request: &IssueRequest) -> Result<CreatedIssue, GitHubError>;
}

#[async_trait]
impl IssueCreator for GitHubClient {
    async fn create_issue(&self, request: &IssueRequest) -> Result<CreatedIssue, GitHubError> {
        GitHubClient::create_issue(self, request).await
    }
}

/// Results of one batch, each list in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub created: Vec<CreatedIssue>,
    pub failed: Vec<FailedIssue>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.created.len() + self.failed.len()
    }
}

/// Create every requested issue, at most `max_concurrency` at a time.
///
/// A failed request is logged and recorded in `failed`; it never stops the
/// rest of the batch.
pub async fn run<C>(creator: &C, requests: &[IssueRequest], max_concurrency: usize) -> BatchOutcome
where
    C: IssueCreator + ?Sized,
{
    info!(issues = requests.len(), max_concurrency, "creating issues");

    // `buffered` keeps completion order equal to input order.
    let results: Vec<_> = stream::iter(requests.iter().enumerate())
        .map(|(index, request)| async move {
            let result = creator
                .create_issue(request)
                .instrument(info_span!("issue", index, title = %request.title))
                .await;
            (request, result)
        })
        .buffered(max_concurrency.max(1))
        .collect()
        .await;

    let mut outcome = BatchOutcome::default();
    for (request, result) in results {
        match result {
            Ok(created) => {
                info!(title = %created.title, url = %created.url, "issue created");
                outcome.created.push(created);
            }
            Err(e) => {
                error!(title = %request.title, error = %e, "failed to create issue");
                outcome.failed.push(FailedIssue {
                    title: request.title.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        created = outcome.created.len(),
        failed = outcome.failed.len(),
        "batch complete"
    );
    outcome
}
