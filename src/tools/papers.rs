// src/tools/papers.rs — Semantic Scholar paper search

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infra::errors::DevflowError;

const SEMANTIC_SCHOLAR_URL: &str = "https://api.semanticscholar.org/graph/v1";
const MIN_CITATION_COUNT: u32 = 3;
const MAX_SEARCH_LIMIT: usize = 100;
const FIELDS: &str = "title,abstract,year,citationCount,url,authors,openAccessPdf";
const SOURCE_ID: &str = "semantic-scholar";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    #[serde(default)]
    pub paper_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub open_access_pdf: Option<OpenAccessPdf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAccessPdf {
    #[serde(default)]
    pub url: Option<String>,
}

impl Paper {
    /// One-line listing: title, year, citations, first author.
    pub fn summary_line(&self) -> String {
        let year = self.year.map(|y| y.to_string()).unwrap_or_else(|| "n.d.".into());
        let author = self
            .authors
            .first()
            .map(|a| a.name.as_str())
            .unwrap_or("unknown");
        let etal = if self.authors.len() > 1 { " et al." } else { "" };
        format!(
            "{} ({}, {}{}, {} citations)",
            self.title,
            year,
            author,
            etal,
            self.citation_count.unwrap_or(0)
        )
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

pub struct PaperSearcher {
    client: reqwest::Client,
    base_url: String,
}

impl Default for PaperSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperSearcher {
    pub fn new() -> Self {
        Self::with_base_url(SEMANTIC_SCHOLAR_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Open-access papers with at least three citations matching `query`.
    /// Single attempt, no retry.
    pub async fn search_papers(&self, query: &str, top_n: usize) -> Result<Vec<Paper>, DevflowError> {
        let limit = search_limit(top_n).to_string();
        let min_citations = MIN_CITATION_COUNT.to_string();

        let response = self
            .client
            .get(format!("{}/paper/search", self.base_url))
            .query(&[
                ("query", query),
                ("limit", limit.as_str()),
                ("minCitationCount", min_citations.as_str()),
                ("openAccessPdf", ""),
                ("fields", FIELDS),
            ])
            .send()
            .await
            .map_err(|e| DevflowError::Provider {
                provider: SOURCE_ID.into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DevflowError::RateLimited {
                provider: SOURCE_ID.into(),
                retry_after_ms: 0,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DevflowError::Provider {
                provider: SOURCE_ID.into(),
                message: format!("HTTP {}: {}", status, body),
                retriable: status.is_server_error(),
            });
        }

        let body = response.text().await.map_err(|e| DevflowError::Provider {
            provider: SOURCE_ID.into(),
            message: e.to_string(),
            retriable: false,
        })?;
        let papers = parse_search_response(&body)?;
        tracing::debug!(query, found = papers.len(), "Paper search complete");
        Ok(papers.into_iter().take(top_n).collect())
    }
}

fn parse_search_response(body: &str) -> Result<Vec<Paper>, DevflowError> {
    let parsed: SearchResponse = serde_json::from_str(body).map_err(|e| DevflowError::Provider {
        provider: SOURCE_ID.into(),
        message: format!("Failed to parse response: {}", e),
        retriable: false,
    })?;
    Ok(parsed.data)
}

/// The search API accepts 1..=100 results per page.
fn search_limit(top_n: usize) -> usize {
    top_n.clamp(1, MAX_SEARCH_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = r#"{
        "total": 2,
        "offset": 0,
        "data": [
            {
                "paperId": "abc",
                "title": "Attention Is All You Need",
                "abstract": "Transformers.",
                "year": 2017,
                "citationCount": 100000,
                "url": "https://example.org/abc",
                "authors": [{"authorId": "1", "name": "Ashish Vaswani"}, {"authorId": "2", "name": "Noam Shazeer"}],
                "openAccessPdf": {"url": "https://example.org/abc.pdf", "status": "GREEN"}
            },
            {"paperId": "def", "title": "Untitled", "abstract": null}
        ]
    }"#;

    #[test]
    fn test_parse_search_response() {
        let papers = parse_search_response(BODY).unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].paper_id, "abc");
        assert_eq!(papers[0].abstract_text.as_deref(), Some("Transformers."));
        assert_eq!(
            papers[0].open_access_pdf.as_ref().and_then(|p| p.url.as_deref()),
            Some("https://example.org/abc.pdf")
        );
        assert!(papers[1].abstract_text.is_none());
        assert!(papers[1].authors.is_empty());
    }

    #[test]
    fn test_parse_empty_and_invalid() {
        assert!(parse_search_response(r#"{"total": 0}"#).unwrap().is_empty());
        assert!(parse_search_response("not json").is_err());
    }

    #[test]
    fn test_summary_line() {
        let papers = parse_search_response(BODY).unwrap();
        assert_eq!(
            papers[0].summary_line(),
            "Attention Is All You Need (2017, Ashish Vaswani et al., 100000 citations)"
        );
        assert_eq!(papers[1].summary_line(), "Untitled (n.d., unknown, 0 citations)");
    }

    #[test]
    fn test_search_limit_clamped() {
        assert_eq!(search_limit(0), 1);
        assert_eq!(search_limit(10), 10);
        assert_eq!(search_limit(100), 100);
        assert_eq!(search_limit(500), 100);
    }
}
