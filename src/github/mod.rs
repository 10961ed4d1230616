pub mod rate_limit;

pub use rate_limit::RateLimitGate;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::issues::{CreatedIssue, IssueRequest};

const ACCEPT_V3: &str = "application/vnd.github.v3+json";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("GitHub API rate limit still exhausted after retry (resets at {reset})")]
    RateLimited { reset: i64 },
}

/// Authenticated client for the two endpoints this tool uses.
///
/// Cloning is cheap: clones share the connection pool and the rate-limit gate.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
    user_agent: String,
    gate: RateLimitGate,
}

#[derive(Deserialize)]
struct IssueResponse {
    number: u64,
    html_url: String,
}

#[derive(Serialize)]
struct CommentUpdate<'a> {
    body: &'a str,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            owner: config.repo_owner.clone(),
            repo: config.repo_name.clone(),
            token: config.auth_token.clone(),
            user_agent: config.user_agent.clone(),
            gate: RateLimitGate::new(),
        }
    }

    pub fn repo(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_url, self.owner, self.repo)
    }

    fn comment_url(&self, comment_id: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/comments/{}",
            self.api_url, self.owner, self.repo, comment_id
        )
    }

    fn authorized(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_V3)
            .header("User-Agent", &self.user_agent)
    }

    /// Create one issue.
    ///
    /// A response that is not successful and reports zero remaining quota is
    /// retried exactly once, after the shared gate reopens. Any other non-201
    /// response fails without retry.
    ///
    /// A 201 that reports zero remaining quota is returned as created and not
    /// retried, since the issue already exists; it only closes the gate for
    /// the requests that follow.
    #[instrument(skip(self, request), fields(repo = %self.repo(), title = %request.title))]
    pub async fn create_issue(&self, request: &IssueRequest) -> Result<CreatedIssue, GitHubError> {
        let url = self.issues_url();

        let (response, exhausted) = self.post_issue(&url, request).await?;
        let response = match exhausted {
            Some(reset) if !response.status().is_success() => {
                warn!(status = %response.status(), reset, "rate limited, retrying once after reset");
                let (retry, exhausted) = self.post_issue(&url, request).await?;
                match exhausted {
                    Some(reset) if !retry.status().is_success() => {
                        return Err(GitHubError::RateLimited { reset });
                    }
                    _ => retry,
                }
            }
            _ => response,
        };

        if response.status() != StatusCode::CREATED {
            return Err(status_error(response).await);
        }

        let created = response.json::<IssueResponse>().await?;
        debug!(number = created.number, url = %created.html_url, "issue created");
        Ok(CreatedIssue {
            title: request.title.clone(),
            url: created.html_url,
            number: created.number,
        })
    }

    /// POST through the gate and feed the response's quota back into it.
    async fn post_issue(
        &self,
        url: &str,
        request: &IssueRequest,
    ) -> Result<(Response, Option<i64>), GitHubError> {
        self.gate.wait().await;
        let response = self
            .authorized(Method::POST, url)
            .json(request)
            .send()
            .await?;
        let exhausted = self.gate.observe(response.headers()).await;
        Ok((response, exhausted))
    }

    /// Replace the body of an existing issue comment.
    #[instrument(skip(self, body), fields(repo = %self.repo(), body_len = body.len()))]
    pub async fn update_comment(&self, comment_id: u64, body: &str) -> Result<(), GitHubError> {
        self.gate.wait().await;
        let response = self
            .authorized(Method::PATCH, &self.comment_url(comment_id))
            .json(&CommentUpdate { body })
            .send()
            .await?;
        self.gate.observe(response.headers()).await;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        debug!("comment updated");
        Ok(())
    }
}

async fn status_error(response: Response) -> GitHubError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    GitHubError::Status { status, body }
}
