use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NO_PRIORITY: &str = "N/A";
pub const UNASSIGNED: &str = "Unassigned";
pub const UNKNOWN_REPORTER: &str = "Unknown";

/// One entry of a Jira search result, as returned by the API.
#[derive(Debug, Deserialize)]
pub struct RawIssue {
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Deserialize)]
pub struct IssueFields {
    pub issuetype: Named,
    pub status: Named,
    pub summary: String,
    #[serde(default)]
    pub priority: Option<Named>,
    /// Plain text on older instances, an ADF document on API v3.
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub reporter: Option<User>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    /// Custom fields and anything else Jira attaches, keyed by field id.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct User {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Display-ready projection of a [`RawIssue`] with every optional field defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub key: String,
    pub url: String,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub status: String,
    pub summary: String,
    pub priority: String,
    pub description: String,
    pub assignee: String,
    pub reporter: String,
    pub created: String,
    pub updated: String,
    pub labels: Vec<String>,
    pub extension_fields: Map<String, Value>,
}

impl Ticket {
    pub fn from_raw(raw: RawIssue, browse_base: &str) -> Self {
        let f = raw.fields;

        Self {
            url: format!("{}{}", browse_base, raw.key),
            key: raw.key,
            issue_type: f.issuetype.name,
            status: f.status.name,
            summary: f.summary,
            priority: f
                .priority
                .map(|p| p.name)
                .unwrap_or_else(|| NO_PRIORITY.to_string()),
            description: f.description.as_ref().map(plain_text).unwrap_or_default(),
            assignee: f
                .assignee
                .map(|u| u.display_name)
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            reporter: f
                .reporter
                .map(|u| u.display_name)
                .unwrap_or_else(|| UNKNOWN_REPORTER.to_string()),
            created: f.created.unwrap_or_default(),
            updated: f.updated.unwrap_or_default(),
            labels: f.labels.unwrap_or_default(),
            extension_fields: f.extra,
        }
    }

    pub fn extension_field(&self, id: &str) -> Option<&Value> {
        self.extension_fields.get(id)
    }
}

/// Flattens a description into text. Strings pass through; ADF documents
/// keep their text nodes with one line per block.
fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => adf_text(other).trim_end().to_string(),
    }
}

fn adf_text(node: &Value) -> String {
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        return text.to_string();
    }

    let node_type = node.get("type").and_then(Value::as_str).unwrap_or_default();
    if node_type == "hardBreak" {
        return "\n".to_string();
    }

    let children = match node.get("content").and_then(Value::as_array) {
        Some(children) => children,
        None => return String::new(),
    };

    let parts = children.iter().map(adf_text);
    match node_type {
        "doc" | "bulletList" | "orderedList" | "blockquote" | "panel" => {
            parts.collect::<Vec<_>>().join("\n")
        }
        _ => parts.collect(),
    }
}
