pub mod types;

pub use types::{CreatedIssue, FailedIssue, IssueRequest};

use std::env::VarError;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IssuesError {
    #[error("No issues provided.")]
    Missing,

    #[error(
        "Issues list is not in the correct format ({reason}). Expected a list of lists, where each inner list contains two strings: [[title1, body1], [title2, body2], ...]"
    )]
    Malformed { reason: String },
}

/// Read the ISSUES input. Unset or blank is an error, not an empty batch.
pub fn from_env() -> Result<Vec<IssueRequest>, IssuesError> {
    parse_env_value(std::env::var("ISSUES"))
}

fn parse_env_value(value: Result<String, VarError>) -> Result<Vec<IssueRequest>, IssuesError> {
    match value {
        Ok(raw) => parse_issues(&raw),
        Err(VarError::NotPresent) => Err(IssuesError::Missing),
        Err(VarError::NotUnicode(_)) => Err(IssuesError::Malformed {
            reason: "ISSUES is not valid UTF-8".to_string(),
        }),
    }
}

/// Parse a list of `[title, body]` pairs.
///
/// Accepts JSON as well as the single-quoted form Python's `str(list)`
/// produces, e.g. `[['Bug A', 'desc A']]`. Every inner list must hold exactly
/// two strings; anything else is rejected as a whole rather than skipped.
pub fn parse_issues(raw: &str) -> Result<Vec<IssueRequest>, IssuesError> {
    if raw.trim().is_empty() {
        return Err(IssuesError::Missing);
    }

    let entries: Vec<Vec<String>> = json5::from_str(raw).map_err(|e| IssuesError::Malformed {
        reason: e.to_string(),
    })?;
    debug!(count = entries.len(), "parsed issues input");

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match <[String; 2]>::try_from(entry) {
            Ok([title, body]) => Ok(IssueRequest::new(title, body)),
            Err(entry) => Err(IssuesError::Malformed {
                reason: format!("entry {} has {} items", index + 1, entry.len()),
            }),
        })
        .collect()
}
