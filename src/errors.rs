use std::fmt;

#[derive(Debug)]
pub enum ReportError {
    // Configuration errors
    ConfigInvalid(String),

    // Jira errors
    JiraAuthFailed(u16),
    JiraApiError(u16, String),

    // Network errors
    NetworkError(String),

    // Generic error
    Other(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ReportError::JiraAuthFailed(status) => write!(
                f,
                "Jira authentication failed ({}), check jira.email and jira.api_token",
                status
            ),
            ReportError::JiraApiError(status, body) => {
                if body.is_empty() {
                    write!(f, "Jira API error ({})", status)
                } else {
                    write!(f, "Jira API error ({}): {}", status, single_line(body))
                }
            }
            ReportError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ReportError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ReportError {}

/// Jira error bodies are JSON and may span lines; the failure output is one line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ReportError::NetworkError(err.to_string())
        } else {
            ReportError::Other(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
