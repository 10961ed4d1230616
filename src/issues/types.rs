use serde::Serialize;

/// One issue to create, as read from the ISSUES input.
/// Serialized as-is into the create-issue request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
}

impl IssueRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// An issue GitHub accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    /// Title as submitted
    pub title: String,
    /// Browser URL of the new issue (`html_url`)
    pub url: String,
    /// Issue number assigned by GitHub
    pub number: u64,
}

/// An issue that could not be created, kept for console output only.
#[derive(Debug, Clone)]
pub struct FailedIssue {
    pub title: String,
    pub reason: String,
}
