//! Wikipedia retriever over the MediaWiki action API.
//!
//! Two steps per query:
//!
//! 1. `action=query&list=search` with `srlimit = top_k_results` to find
//!    matching pages.
//! 2. `action=query&prop=extracts|info&explaintext=1&inprop=url` per hit to
//!    fetch the page's plain text and canonical URL.
//!
//! Queries are cut to [`MAX_QUERY_CHARS`] characters and page text to
//! `doc_content_chars_max`. Each record is tagged with `title`, `source`
//! (the page URL) and `pageid`.

use async_trait::async_trait;
use rag_harness_core::retriever::Retriever;
use rag_harness_core::{Record, Result, RetrievalError};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::config::{Config, WikipediaConfig};
use crate::http::Service;
use crate::output;

/// Longest query the search API is sent.
pub const MAX_QUERY_CHARS: usize = 300;

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
    pageid: u64,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
}

pub struct WikipediaRetriever {
    lang: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
    endpoint: String,
    service: Service,
}

impl WikipediaRetriever {
    pub fn new(config: &WikipediaConfig) -> Result<Self> {
        if config.top_k_results == 0 {
            return Err(RetrievalError::InvalidParameter(
                "top_k_results must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            lang: config.lang.clone(),
            top_k_results: config.top_k_results,
            doc_content_chars_max: config.doc_content_chars_max,
            endpoint: config.endpoint(),
            service: Service::new("Wikipedia", 30, 0)?,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("list", "search".to_string()),
            ("srsearch", query.to_string()),
            ("srlimit", self.top_k_results.to_string()),
        ];
        let json = self.service.get_json(&self.endpoint, &params).await?;
        let parsed: SearchResponse = serde_json::from_value(json)
            .map_err(|e| self.service.unavailable(format!("invalid search response: {}", e)))?;
        Ok(parsed.query.map(|q| q.search).unwrap_or_default())
    }

    async fn fetch_page(&self, hit: &SearchHit) -> Result<Option<Record>> {
        let params = [
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("prop", "extracts|info".to_string()),
            ("explaintext", "1".to_string()),
            ("inprop", "url".to_string()),
            ("pageids", hit.pageid.to_string()),
        ];
        let json = self.service.get_json(&self.endpoint, &params).await?;
        let parsed: PageResponse = serde_json::from_value(json)
            .map_err(|e| self.service.unavailable(format!("invalid page response: {}", e)))?;

        let Some(page) = parsed
            .query
            .and_then(|mut q| q.pages.remove(&hit.pageid.to_string()))
        else {
            return Ok(None);
        };
        let Some(extract) = page.extract.filter(|e| !e.trim().is_empty()) else {
            debug!(title = %hit.title, "page has no extract");
            return Ok(None);
        };

        let title = page.title.unwrap_or_else(|| hit.title.clone());
        let source = page.fullurl.unwrap_or_else(|| {
            format!(
                "https://{}.wikipedia.org/wiki/{}",
                self.lang,
                title.replace(' ', "_")
            )
        });
        let text: String = extract.chars().take(self.doc_content_chars_max).collect();

        let tags = BTreeMap::from([
            ("title".to_string(), title),
            ("source".to_string(), source),
            ("pageid".to_string(), hit.pageid.to_string()),
        ]);
        Ok(Some(Record::with_tags(text, tags)))
    }
}

#[async_trait]
impl Retriever for WikipediaRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Record>> {
        let query: String = query.chars().take(MAX_QUERY_CHARS).collect();
        let hits = self.search(&query).await?;
        debug!(hits = hits.len(), "wikipedia search");

        let mut records = Vec::with_capacity(hits.len());
        for hit in hits.iter().take(self.top_k_results) {
            if let Some(record) = self.fetch_page(hit).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// `rag wiki`: retrieve Wikipedia pages for `query` and print them.
pub async fn run_wiki(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    lang: Option<String>,
) -> anyhow::Result<()> {
    let mut wiki = config.wikipedia.clone();
    if let Some(k) = top_k {
        wiki.top_k_results = k;
    }
    if let Some(lang) = lang {
        wiki.lang = lang;
    }

    let retriever = WikipediaRetriever::new(&wiki)?;
    let records = retriever.retrieve(query).await?;
    info!(results = records.len(), lang = %wiki.lang, "wikipedia retrieval complete");
    output::print_results(&records)?;
    Ok(())
}
