//! Academic paper lookup through the arXiv Atom API.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{decode_entities, render_documents, truncate_chars, Tool, ToolError};
use crate::config::ToolLimits;

const NAME: &str = "arxiv";
const DEFAULT_ENDPOINT: &str = "https://export.arxiv.org/api/query";

/// arXiv rejects very long search queries.
const MAX_QUERY_CHARS: usize = 300;

static ARXIV_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}\.\d{4,5}(?:v\d+)?|[a-z][a-z\-]+(?:\.[A-Z]{2})?/\d{7}(?:v\d+)?)\b").unwrap()
});
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<entry>(.*?)</entry>").unwrap());
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<author>\s*<name>(.*?)</name>").unwrap());

/// One parsed Atom entry.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Paper {
    id: String,
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

impl Paper {
    fn format(&self) -> String {
        format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.authors.join(", "),
            self.summary
        )
    }

    /// arXiv answers malformed ids with an entry pointing at its error docs.
    fn is_error_entry(&self) -> bool {
        self.id.contains("/api/errors")
    }
}

/// Search arXiv for papers.
pub struct ArxivSearch {
    client: reqwest::Client,
    endpoint: String,
    limits: ToolLimits,
}

impl ArxivSearch {
    pub fn new(client: reqwest::Client, limits: ToolLimits) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limits,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_url(&self, query: &str) -> String {
        let ids = extract_arxiv_ids(query);
        let selector = if ids.is_empty() {
            format!(
                "search_query={}",
                urlencoding::encode(&truncate_chars(query, MAX_QUERY_CHARS))
            )
        } else {
            format!("id_list={}", urlencoding::encode(&ids.join(",")))
        };
        format!(
            "{}?{}&start=0&max_results={}",
            self.endpoint, selector, self.limits.top_k
        )
    }
}

#[async_trait]
impl Tool for ArxivSearch {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Search arXiv for scientific papers in physics, mathematics, computer science and related fields. Input is a search query or an arXiv identifier such as 1706.03762."
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let url = self.request_url(query);
        tracing::debug!(query, %url, "arXiv search");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::unavailable(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::unavailable(NAME, format!("HTTP {}", status)));
        }

        let feed = response
            .text()
            .await
            .map_err(|e| ToolError::unavailable(NAME, e))?;

        let documents: Vec<String> = parse_feed(&feed)
            .into_iter()
            .filter(|p| !p.is_error_entry())
            .take(self.limits.top_k)
            .map(|p| p.format())
            .collect();

        if documents.is_empty() {
            return Err(ToolError::empty(NAME, query));
        }
        Ok(render_documents(&documents, self.limits))
    }
}

/// arXiv identifiers mentioned in a free-text query.
fn extract_arxiv_ids(query: &str) -> Vec<String> {
    ARXIV_ID_RE
        .captures_iter(query)
        .map(|cap| cap[1].to_string())
        .collect()
}

fn parse_feed(feed: &str) -> Vec<Paper> {
    ENTRY_RE
        .captures_iter(feed)
        .map(|cap| {
            let entry = &cap[1];
            let published = tag_text(entry, "published");
            Paper {
                id: tag_text(entry, "id"),
                published: published.split('T').next().unwrap_or("").to_string(),
                title: tag_text(entry, "title"),
                authors: AUTHOR_RE
                    .captures_iter(entry)
                    .map(|a| collapse_whitespace(&decode_entities(&a[1])))
                    .collect(),
                summary: tag_text(entry, "summary"),
            }
        })
        .collect()
}

/// Text of the first `<tag>` element, entity-decoded with whitespace collapsed.
fn tag_text(entry: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    entry
        .find(&open)
        .and_then(|start| {
            let rest = &entry[start..];
            let body_start = rest.find('>')? + 1;
            let body_end = rest.find(&close)?;
            (body_start <= body_end).then(|| &rest[body_start..body_end])
        })
        .map(|raw| collapse_whitespace(&decode_entities(raw)))
        .unwrap_or_default()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
