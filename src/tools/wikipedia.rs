//! Encyclopedia lookup through the MediaWiki API.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{render_documents, truncate_chars, Tool, ToolError};
use crate::config::ToolLimits;

const NAME: &str = "wikipedia";
const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// MediaWiki rejects search strings longer than this.
const MAX_QUERY_CHARS: usize = 300;

/// Error object MediaWiki returns, with HTTP 200, for rejected requests.
#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}

/// Search Wikipedia and summarize the best matching pages.
pub struct WikipediaSearch {
    client: reqwest::Client,
    endpoint: String,
    limits: ToolLimits,
}

impl WikipediaSearch {
    pub fn new(client: reqwest::Client, limits: ToolLimits) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limits,
        }
    }

    /// Point at another MediaWiki installation (e.g. a different language).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, ToolError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| ToolError::unavailable(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::unavailable(NAME, format!("HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::unavailable(NAME, format!("unexpected response: {}", e)))?;

        if let Some(error) = body.get("error") {
            let error = ApiError::deserialize(error).unwrap_or_default();
            return Err(ToolError::unavailable(
                NAME,
                format!("API error {}: {}", error.code, error.info),
            ));
        }

        serde_json::from_value(body)
            .map_err(|e| ToolError::unavailable(NAME, format!("unexpected response: {}", e)))
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>, ToolError> {
        let limit = self.limits.top_k.to_string();
        let query = truncate_chars(query, MAX_QUERY_CHARS);
        let response: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query.as_str()),
                ("srlimit", limit.as_str()),
                ("format", "json"),
                ("utf8", "1"),
            ])
            .await?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn fetch_extract(&self, title: &str) -> Result<Option<Page>, ToolError> {
        let response: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
                ("utf8", "1"),
            ])
            .await?;

        Ok(response
            .query
            .and_then(|q| q.pages.into_values().next())
            .filter(|page| page.extract.as_deref().is_some_and(|e| !e.trim().is_empty())))
    }
}

#[async_trait]
impl Tool for WikipediaSearch {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Look up general knowledge on Wikipedia. Input is a search query; returns the summary of the best matching page."
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let titles = self.search_titles(query).await?;
        tracing::debug!(query, hits = titles.len(), "Wikipedia search");

        let mut documents = Vec::new();
        let mut failure = None;
        for title in titles.iter().take(self.limits.top_k) {
            match self.fetch_extract(title).await {
                Ok(Some(page)) => {
                    documents.push(format_page(&page.title, page.extract.as_deref().unwrap_or("")))
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(title = %title, "Skipping Wikipedia page: {}", e);
                    failure = Some(e);
                }
            }
        }

        if documents.is_empty() {
            return Err(failure.unwrap_or_else(|| ToolError::empty(NAME, query)));
        }
        Ok(render_documents(&documents, self.limits))
    }
}

fn format_page(title: &str, extract: &str) -> String {
    format!("Page: {}\nSummary: {}", title, extract.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_PATH: &str = "/w/api.php";

    fn tool_for(server: &MockServer, limits: ToolLimits) -> WikipediaSearch {
        WikipediaSearch::new(reqwest::Client::new(), limits)
            .with_endpoint(format!("{}{}", server.uri(), API_PATH))
    }

    async fn mount_search(server: &MockServer, titles: &[&str]) {
        let hits: Vec<Value> = titles.iter().map(|t| json!({ "ns": 0, "title": t })).collect();
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("list", "search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "query": { "search": hits } })),
            )
            .mount(server)
            .await;
    }

    async fn mount_extract(server: &MockServer, title: &str, extract: &str) {
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("prop", "extracts"))
            .and(query_param("titles", title))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": { "pages": { "1": { "title": title, "extract": extract } } }
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn parses_search_hits() {
        let body = r#"{"batchcomplete":"","query":{"searchinfo":{"totalhits":2},
            "search":[{"ns":0,"title":"Penicillin","pageid":23312},
                      {"ns":0,"title":"Alexander Fleming","pageid":1937}]}}"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let titles: Vec<String> = parsed.query.unwrap().search.into_iter().map(|h| h.title).collect();
        assert_eq!(titles, vec!["Penicillin", "Alexander Fleming"]);
    }

    #[test]
    fn parses_missing_query_as_no_hits() {
        let parsed: SearchResponse = serde_json::from_str(r#"{"batchcomplete":""}"#).unwrap();
        assert!(parsed.query.is_none());
    }

    #[test]
    fn parses_extract_pages() {
        let body = r#"{"query":{"pages":{"23312":{"pageid":23312,"ns":0,
            "title":"Penicillin","extract":"Penicillins are a group of antibiotics."}}}}"#;
        let parsed: ExtractResponse = serde_json::from_str(body).unwrap();
        let page = parsed.query.unwrap().pages.into_values().next().unwrap();
        assert_eq!(
            format_page(&page.title, page.extract.as_deref().unwrap()),
            "Page: Penicillin\nSummary: Penicillins are a group of antibiotics."
        );
    }

    #[test]
    fn missing_page_has_no_extract() {
        let body = r#"{"query":{"pages":{"-1":{"ns":0,"title":"Nope","missing":""}}}}"#;
        let parsed: ExtractResponse = serde_json::from_str(body).unwrap();
        let page = parsed.query.unwrap().pages.into_values().next().unwrap();
        assert!(page.extract.is_none());
    }

    #[tokio::test]
    async fn run_formats_best_match() {
        let server = MockServer::start().await;
        mount_search(&server, &["Penicillin"]).await;
        mount_extract(&server, "Penicillin", "Penicillins are a group of antibiotics.\n").await;

        let out = tool_for(&server, ToolLimits::default()).run("penicillin").await.unwrap();
        assert_eq!(out, "Page: Penicillin\nSummary: Penicillins are a group of antibiotics.");
    }

    #[tokio::test]
    async fn run_output_fits_budget_for_long_extracts() {
        let server = MockServer::start().await;
        mount_search(&server, &["Penicillin"]).await;
        mount_extract(&server, "Penicillin", &"antibiotic ".repeat(500)).await;

        let limits = ToolLimits::default();
        let out = tool_for(&server, limits).run("penicillin").await.unwrap();
        assert!(out.starts_with("Page: Penicillin\nSummary: antibiotic"));
        assert_eq!(out.chars().count(), limits.max_chars);
    }

    #[tokio::test]
    async fn no_hits_is_empty_result() {
        let server = MockServer::start().await;
        mount_search(&server, &[]).await;

        let err = tool_for(&server, ToolLimits::default()).run("qwzxv").await.unwrap_err();
        assert_eq!(err, ToolError::empty(NAME, "qwzxv"));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = tool_for(&server, ToolLimits::default()).run("penicillin").await.unwrap_err();
        assert!(matches!(err, ToolError::Unavailable { .. }), "{err:?}");
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn api_error_body_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "code": "maxlag", "info": "Waiting for a database server" }
            })))
            .mount(&server)
            .await;

        let err = tool_for(&server, ToolLimits::default()).run("penicillin").await.unwrap_err();
        assert_eq!(
            err,
            ToolError::unavailable(NAME, "API error maxlag: Waiting for a database server")
        );
    }

    #[tokio::test]
    async fn long_queries_are_cut_before_searching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("srsearch", "a".repeat(MAX_QUERY_CHARS)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "query": { "search": [] } })),
            )
            .mount(&server)
            .await;

        let query = "a".repeat(1000);
        let err = tool_for(&server, ToolLimits::default()).run(&query).await.unwrap_err();
        assert!(matches!(err, ToolError::EmptyResult { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn failed_page_does_not_discard_earlier_pages() {
        let server = MockServer::start().await;
        mount_search(&server, &["Penicillin", "Alexander Fleming"]).await;
        mount_extract(&server, "Penicillin", "An antibiotic.").await;
        Mock::given(method("GET"))
            .and(path(API_PATH))
            .and(query_param("titles", "Alexander Fleming"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let limits = ToolLimits {
            top_k: 2,
            max_chars: 1000,
        };
        let out = tool_for(&server, limits).run("penicillin").await.unwrap();
        assert_eq!(out, "Page: Penicillin\nSummary: An antibiotic.");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let tool = WikipediaSearch::new(reqwest::Client::new(), ToolLimits::default())
            .with_endpoint("http://127.0.0.1:9/w/api.php");
        let err = tool.run("penicillin").await.unwrap_err();
        assert!(matches!(err, ToolError::Unavailable { .. }), "{err:?}");
    }
}
