use crate::batch::BatchOutcome;
use crate::github::{GitHubClient, GitHubError};
use crate::issues::CreatedIssue;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

pub const NO_ISSUES_CREATED: &str = "No issues were created.";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to update comment {comment_id}: {source}")]
    CommentUpdate {
        comment_id: u64,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to write summary file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build the comment body for the created issues.
///
/// One `"{n}. {title} ({url})"` line per issue, numbered from 1 in the order
/// given, or `NO_ISSUES_CREATED` when the list is empty.
pub fn summary(created: &[CreatedIssue]) -> String {
    if created.is_empty() {
        return NO_ISSUES_CREATED.to_string();
    }

    created
        .iter()
        .enumerate()
        .map(|(i, issue)| format!("{}. {} ({})", i + 1, issue.title, issue.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace the body of the given comment with the summary.
/// Failure here is fatal for the run, so it is logged before being returned.
#[instrument(skip(client, summary), fields(repo = %client.repo()))]
pub async fn publish(
    client: &GitHubClient,
    comment_id: u64,
    summary: &str,
) -> Result<(), ReportError> {
    match client.update_comment(comment_id, summary).await {
        Ok(()) => {
            info!("summary posted to comment");
            Ok(())
        }
        Err(source) => {
            error!(error = %source, "failed to update comment");
            Err(ReportError::CommentUpdate { comment_id, source })
        }
    }
}

/// Write the summary to a file.
pub fn write_summary(summary: &str, path: &Path) -> Result<(), ReportError> {
    debug!(path = %path.display(), "writing summary to file");
    std::fs::write(path, format!("{summary}\n"))?;
    Ok(())
}

/// Print one line per attempted issue plus totals.
///
/// Created:  ✓ #1 Bug A -> https://github.com/octo/widgets/issues/1
/// Failed:   ✗ Bug B: GitHub API returned 422 ...
pub fn print_terminal_summary(outcome: &BatchOutcome) {
    println!();
    for issue in &outcome.created {
        println!(
            "  {} #{} {} -> {}",
            "✓".green().bold(),
            issue.number,
            issue.title,
            issue.url.cyan()
        );
    }
    for failure in &outcome.failed {
        println!(
            "  {} {}: {}",
            "✗".red().bold(),
            failure.title,
            failure.reason
        );
    }
    println!();

    let totals = format!(
        "{} of {} issues created",
        outcome.created.len(),
        outcome.total()
    );
    if outcome.failed.is_empty() {
        println!("{}", totals.green().bold());
    } else {
        println!(
            "{} ({} failed)",
            totals.yellow().bold(),
            outcome.failed.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::issues::FailedIssue;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issue(title: &str, number: u64) -> CreatedIssue {
        CreatedIssue {
            title: title.to_string(),
            url: format!("https://github.com/octo/widgets/issues/{number}"),
            number,
        }
    }

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&Config {
            repo_owner: "octo".to_string(),
            repo_name: "widgets".to_string(),
            auth_token: "t0ken".to_string(),
            comment_id: Some(42),
            api_url: server.uri(),
            user_agent: "test".to_string(),
            max_concurrency: 1,
        })
    }

    #[test]
    fn test_summary_two_issues() {
        let text = summary(&[issue("Bug A", 1), issue("Bug B", 2)]);
        assert_eq!(
            text,
            "1. Bug A (https://github.com/octo/widgets/issues/1)\n\
             2. Bug B (https://github.com/octo/widgets/issues/2)"
        );
    }

    #[test]
    fn test_summary_keeps_given_order() {
        let text = summary(&[issue("later", 9), issue("earlier", 3)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. later ("));
        assert!(lines[1].starts_with("2. earlier ("));
    }

    #[test]
    fn test_summary_empty() {
        assert_eq!(summary(&[]), "No issues were created.");
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("summary.md");
        write_summary("1. Bug A (https://x/1)", &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1. Bug A (https://x/1)\n");
    }

    #[test]
    fn test_terminal_summary_does_not_panic() {
        let outcome = BatchOutcome {
            created: vec![issue("Bug A", 1)],
            failed: vec![FailedIssue {
                title: "Bug B".to_string(),
                reason: "GitHub API returned 422 Unprocessable Entity".to_string(),
            }],
        };
        print_terminal_summary(&outcome);
        print_terminal_summary(&BatchOutcome::default());
    }

    #[tokio::test]
    async fn test_publish_patches_comment() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/octo/widgets/issues/comments/42"))
            .and(body_json(serde_json::json!({"body": "1. Bug A (https://x/1)"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        publish(&client_for(&server), 42, "1. Bug A (https://x/1)")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_publish_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let err = publish(&client_for(&server), 42, NO_ISSUES_CREATED)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::CommentUpdate { comment_id: 42, .. }));
    }
}
