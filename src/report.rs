use crate::api::jira::{release_jql, JiraClient, SearchRequest};
use crate::config::settings::{CustomField, Settings};
use crate::errors::Result;
use crate::models::ticket::Ticket;
use serde_json::Value;

pub const NO_LABELS: &str = "None";
pub const MISSING_FIELD: &str = "undefined";

/// The tickets of one fix version, in the order Jira returned them.
#[derive(Debug)]
pub struct ReleaseReport {
    pub fix_version: String,
    pub tickets: Vec<Ticket>,
    /// Jira holds more matches than the result cap let through.
    pub more_available: bool,
}

impl ReleaseReport {
    pub fn truncated(&self) -> bool {
        self.more_available
    }
}

pub async fn fetch(client: &JiraClient, settings: &Settings) -> Result<ReleaseReport> {
    let request = SearchRequest {
        jql: release_jql(
            &settings.jira.project_key,
            &settings.report.fix_version,
            settings.report.order,
        ),
        max_results: settings.report.max_results,
    };

    let page = client.search(&request).await?;
    let more_available = page.has_more();

    let browse_base = settings.browse_base();
    let tickets = page
        .issues
        .into_iter()
        .map(|raw| Ticket::from_raw(raw, &browse_base))
        .collect();

    Ok(ReleaseReport {
        fix_version: settings.report.fix_version.clone(),
        tickets,
        more_available,
    })
}

/// Renders the full text report: header, then one block per ticket.
pub fn render(fix_version: &str, tickets: &[Ticket], custom_fields: &[CustomField]) -> String {
    let mut out = format!(
        "Total {} issues in version \"{}\":\n\n",
        tickets.len(),
        fix_version
    );

    for (i, ticket) in tickets.iter().enumerate() {
        out.push_str(&render_ticket(i + 1, ticket, custom_fields));
    }

    out
}

pub fn render_ticket(index: usize, ticket: &Ticket, custom_fields: &[CustomField]) -> String {
    let mut lines = vec![
        format!(
            "{}. [{}] {} - {}",
            index, ticket.issue_type, ticket.key, ticket.summary
        ),
        format!("   Status: {}", ticket.status),
        format!("   Priority: {}", ticket.priority),
        format!("   Assignee: {}", ticket.assignee),
        format!("   Reporter: {}", ticket.reporter),
        format!("   Created: {}", ticket.created),
        format!("   Updated: {}", ticket.updated),
        format!("   Labels: {}", labels_line(&ticket.labels)),
    ];

    lines.extend(custom_fields.iter().map(|field| {
        format!(
            "   [{}]: {}",
            field.label,
            field_value(ticket.extension_field(&field.id))
        )
    }));

    lines.push(format!("   {}", ticket.url));

    // Each block ends with a blank separator line.
    let mut block = lines.join("\n");
    block.push_str("\n\n");
    block
}

fn labels_line(labels: &[String]) -> String {
    if labels.is_empty() {
        NO_LABELS.to_string()
    } else {
        labels.join(", ")
    }
}

/// Text for a custom field value. Select lists come back as objects, so
/// their `value` (or `name`) is shown instead of the raw JSON.
fn field_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_FIELD.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| field_value(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::Object(map)) => ["value", "name", "displayName"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
        Some(other) => other.to_string(),
    }
}
