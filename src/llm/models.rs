use serde::{Deserialize, Serialize};

/// One validated issue suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCandidate {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub priority: u8,
}

impl IssueCandidate {
    pub fn new(title: &str, body: &str, labels: &[&str], priority: u8) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            priority,
        }
    }
}

/// Ordered list of issue suggestions produced for one request.
pub type IssueBatch = Vec<IssueCandidate>;
