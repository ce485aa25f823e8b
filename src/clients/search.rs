//! Naver blog search proxy
//!
//! Queries are scoped to the destination by a configured prefix and results
//! come back newest first. Failures never escape: the caller always gets a
//! (possibly empty) list plus an optional error to show inline.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::SearchConfig;
use crate::error::{GuideError, Service};

/// Backend cap on `display`
pub const MAX_LIMIT: u32 = 100;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub link: Url,
    /// `None` when the backend sent a date we could not read
    pub published_at: Option<NaiveDate>,
}

/// Results of one search; `error` is set whenever `results` is empty because
/// something failed rather than because nothing matched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub error: Option<GuideError>,
}

impl SearchOutcome {
    fn failed(error: GuideError) -> Self {
        Self {
            results: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlogResponse {
    #[serde(default)]
    items: Vec<BlogItem>,
}

#[derive(Debug, Deserialize)]
struct BlogItem {
    title: String,
    link: String,
    #[serde(default)]
    postdate: String,
}

impl BlogItem {
    fn into_result(self) -> Option<SearchResult> {
        let link = match Url::parse(self.link.trim()) {
            Ok(link) => link,
            Err(e) => {
                debug!(link = %self.link, "Dropping result with bad link: {e}");
                return None;
            }
        };
        Some(SearchResult {
            title: strip_tags(&self.title),
            link,
            published_at: NaiveDate::parse_from_str(self.postdate.trim(), "%Y%m%d").ok(),
        })
    }
}

/// Remove markup from a result title and decode the entities the backend
/// escapes. This is a lenient pattern pass, not an HTML parser: a stray `<`
/// without a closing `>` is left as is.
#[must_use]
pub fn strip_tags(input: &str) -> String {
    let stripped = TAG.replace_all(input, "");
    stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[derive(Clone)]
pub struct SearchClient {
    http: Client,
    credentials: Option<(String, String)>,
    base_url: String,
    query_prefix: String,
    default_limit: u32,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(http: Client, config: &SearchConfig) -> Self {
        let credentials = config
            .client_id
            .clone()
            .zip(config.client_secret.clone());
        Self {
            http,
            credentials,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            query_prefix: config.query_prefix.trim().to_string(),
            default_limit: config.default_limit,
            timeout: config.timeout(),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    #[must_use]
    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// The query actually sent, scoped to the destination
    #[must_use]
    pub fn scoped_query(&self, query: &str) -> String {
        let query = query.trim();
        if self.query_prefix.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", self.query_prefix, query)
        }
    }

    /// Search recent blog posts. Never fails; see [`SearchOutcome`].
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: u32) -> SearchOutcome {
        let Some((client_id, client_secret)) = &self.credentials else {
            return SearchOutcome::failed(GuideError::unconfigured(
                Service::Search,
                "search.client_id and search.client_secret (or NAVER_CLIENT_ID / NAVER_CLIENT_SECRET)",
            ));
        };

        let display = limit.clamp(1, MAX_LIMIT);
        let url = format!("{}/v1/search/blog.json", self.base_url);
        let scoped = self.scoped_query(query);
        let display_param = display.to_string();

        let start = Instant::now();
        let response = match self
            .http
            .get(&url)
            .query(&[
                ("query", scoped.as_str()),
                ("display", display_param.as_str()),
                ("sort", "date"),
            ])
            .header("X-Naver-Client-Id", client_id)
            .header("X-Naver-Client-Secret", client_secret)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Blog search request failed: {e}");
                return SearchOutcome::failed(transport_error(&e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Blog search rejected the request");
            return SearchOutcome::failed(GuideError::from_status(
                Service::Search,
                status,
                "the blog search endpoint",
                &text,
            ));
        }

        let parsed: BlogResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unreadable blog search response: {e}");
                return SearchOutcome::failed(transport_error(&e));
            }
        };

        let results: Vec<SearchResult> = parsed
            .items
            .into_iter()
            .filter_map(BlogItem::into_result)
            .take(display as usize)
            .collect();

        info!(
            count = results.len(),
            "Blog search finished in {:.3}s",
            start.elapsed().as_secs_f64()
        );
        SearchOutcome {
            results,
            error: None,
        }
    }
}

/// Transport and parse failures both surface as a failed connection
fn transport_error(err: &reqwest::Error) -> GuideError {
    match GuideError::from_transport(Service::Search, err) {
        timeout @ GuideError::Timeout { .. } => timeout,
        _ => GuideError::connection(Service::Search, err.to_string()),
    }
}
