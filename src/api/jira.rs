use crate::config::settings::SortOrder;
use crate::errors::{ReportError, Result};
use crate::models::ticket::RawIssue;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Metadata expansions requested with every search. Informational only.
const SEARCH_EXPAND: &str = "names,schema";

/// The enhanced search endpoint returns bare ids unless fields are requested.
const SEARCH_FIELDS: &str = "*navigable";

pub struct JiraClient {
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
}

#[derive(Debug)]
pub struct SearchRequest {
    pub jql: String,
    pub max_results: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default, rename = "isLast")]
    pub is_last: Option<bool>,
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl SearchResponse {
    /// True when Jira holds further matches beyond this page.
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some() || self.is_last == Some(false)
    }
}

/// JQL for every ticket of `project` whose fix version is `version`, by creation time.
pub fn release_jql(project: &str, version: &str, order: SortOrder) -> String {
    format!(
        "project = \"{}\" AND fixVersion = \"{}\" ORDER BY created {}",
        project,
        version,
        order.as_jql()
    )
}

impl JiraClient {
    pub fn new(
        base_url: String,
        email: String,
        api_token: String,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            api_token,
        })
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = format!("{}/rest/api/3/search/jql", self.base_url);
        let max_results = request.max_results.to_string();

        tracing::debug!(%url, jql = %request.jql, max_results = request.max_results, "searching Jira");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(&[
                ("jql", request.jql.as_str()),
                ("maxResults", max_results.as_str()),
                ("fields", SEARCH_FIELDS),
                ("expand", SEARCH_EXPAND),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ReportError::JiraAuthFailed(status.as_u16()),
                code => ReportError::JiraApiError(code, text),
            });
        }

        let page = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| ReportError::Other(format!("Failed to parse Jira response: {}", e)))?;

        tracing::debug!(received = page.issues.len(), more = page.has_more(), "search finished");

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> JiraClient {
        JiraClient::new(
            server.url(),
            "test@example.com".to_string(),
            "test-token".to_string(),
            None,
        )
        .unwrap()
    }

    fn request() -> SearchRequest {
        SearchRequest {
            jql: release_jql("VSFT", "1.38.1", SortOrder::Asc),
            max_results: 100,
        }
    }

    #[test]
    fn test_release_jql_ascending() {
        assert_eq!(
            release_jql("VSFT", "1.38.1", SortOrder::Asc),
            "project = \"VSFT\" AND fixVersion = \"1.38.1\" ORDER BY created ASC"
        );
    }

    #[test]
    fn test_release_jql_descending() {
        assert_eq!(
            release_jql("ABC", "2024.1", SortOrder::Desc),
            "project = \"ABC\" AND fixVersion = \"2024.1\" ORDER BY created DESC"
        );
    }

    #[test]
    fn test_jira_client_creation() {
        let client = JiraClient::new(
            "https://jira.example.com/".to_string(),
            "test@example.com".to_string(),
            "test-token".to_string(),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://jira.example.com");
        assert_eq!(client.email, "test@example.com");
        assert_eq!(client.api_token, "test-token");
    }

    #[tokio::test]
    async fn test_search_sends_query_and_parses_issues() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/api/3/search/jql")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "jql".to_string(),
                    "project = \"VSFT\" AND fixVersion = \"1.38.1\" ORDER BY created ASC"
                        .to_string(),
                ),
                Matcher::UrlEncoded("maxResults".to_string(), "100".to_string()),
                Matcher::UrlEncoded("fields".to_string(), "*navigable".to_string()),
                Matcher::UrlEncoded("expand".to_string(), "names,schema".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "isLast": true,
                    "issues": [
                        {"key": "VSFT-1", "fields": {"issuetype": {"name": "Bug"}, "status": {"name": "Open"}, "summary": "First"}},
                        {"key": "VSFT-2", "fields": {"issuetype": {"name": "Task"}, "status": {"name": "Done"}, "summary": "Second"}}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let page = client_for(&server).search(&request()).await.unwrap();

        mock.assert_async().await;
        assert!(!page.has_more());
        let keys: Vec<_> = page.issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["VSFT-1", "VSFT-2"]);
    }

    #[tokio::test]
    async fn test_search_empty_result() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/api/3/search/jql")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"isLast": true, "issues": []}"#)
            .create_async()
            .await;

        let page = client_for(&server).search(&request()).await.unwrap();
        assert!(page.issues.is_empty());
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn test_search_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/api/3/search/jql")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let err = client_for(&server).search(&request()).await.unwrap_err();
        assert!(matches!(err, ReportError::JiraAuthFailed(401)));
    }

    #[tokio::test]
    async fn test_search_bad_jql() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/api/3/search/jql")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"errorMessages": ["The value '9.9.9' does not exist for the field 'fixVersion'."]}"#)
            .create_async()
            .await;

        let err = client_for(&server).search(&request()).await.unwrap_err();
        match err {
            ReportError::JiraApiError(400, body) => assert!(body.contains("fixVersion")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/api/3/search/jql")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client_for(&server).search(&request()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse Jira response"));
    }

    #[tokio::test]
    async fn test_search_connection_refused() {
        let client = JiraClient::new(
            "http://127.0.0.1:1".to_string(),
            "test@example.com".to_string(),
            "test-token".to_string(),
            Some(Duration::from_secs(2)),
        )
        .unwrap();

        let err = client.search(&request()).await.unwrap_err();
        assert!(matches!(err, ReportError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_search_reports_further_pages() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/api/3/search/jql")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "isLast": false,
                    "nextPageToken": "CAEaAggD",
                    "issues": [
                        {"key": "VSFT-1", "fields": {"issuetype": {"name": "Bug"}, "status": {"name": "Open"}, "summary": "Only page one"}}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let page = client_for(&server).search(&request()).await.unwrap();
        assert_eq!(page.issues.len(), 1);
        assert!(page.has_more());
    }

    #[test]
    fn test_has_more_flags() {
        let page = |is_last: Option<bool>, token: Option<&str>| SearchResponse {
            issues: Vec::new(),
            is_last,
            next_page_token: token.map(str::to_string),
        };

        assert!(!page(None, None).has_more());
        assert!(!page(Some(true), None).has_more());
        assert!(page(Some(false), None).has_more());
        assert!(page(None, Some("token")).has_more());
    }
}
