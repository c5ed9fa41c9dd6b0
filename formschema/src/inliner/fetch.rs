//! Fetch capability used by the inliner.
//!
//! The inliner only depends on [`SchemaFetcher`]. [`HttpFetcher`] is the
//! network implementation; [`MemoryFetcher`] serves documents that were
//! bundled or loaded up front.

use std::{borrow::Cow, collections::HashMap, sync::Mutex, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::{
    error::InlineError,
    schema::{DRAFT_07, KEY_SCHEMA},
};

/// Draft-07 meta-schema URIs seen in the wild that mean [`DRAFT_07`].
const DRAFT_07_VARIANTS: &[&str] = &[
    "https://json-schema.org/draft-07/schema#",
    "https://json-schema.org/draft-07/schema",
    "http://json-schema.org/draft-07/schema",
];

/// Fetch a JSON document by URL.
#[async_trait]
pub trait SchemaFetcher: Send + Sync {
    /// # Errors
    ///
    /// Non-success responses must surface as [`InlineError::Http`].
    async fn fetch(&self, url: &str) -> Result<Value, InlineError>;
}

/// Rewrite the `$schema` of a fetched document to the canonical draft-07 URI.
pub fn normalize_meta_schema(document: &mut Value) {
    if let Some(meta) = document.get_mut(KEY_SCHEMA)
        && meta.as_str().is_some_and(|s| DRAFT_07_VARIANTS.contains(&s))
    {
        *meta = Value::String(DRAFT_07.to_string());
    }
}

/// Regex based URL rewrite, e.g. to serve a published schema host from a
/// local mirror.
#[derive(Debug, Clone)]
pub struct UrlRewrite {
    pattern: Regex,
    replacement: String,
}

impl UrlRewrite {
    /// `replacement` may use `$1`/`${name}` capture group references.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    pub fn apply<'u>(&self, url: &'u str) -> Cow<'u, str> {
        self.pattern.replace(url, self.replacement.as_str())
    }
}

/// Apply every rewrite in order.
pub fn rewrite_url(rewrites: &[UrlRewrite], url: &str) -> String {
    rewrites
        .iter()
        .fold(url.to_string(), |url, rewrite| rewrite.apply(&url).into_owned())
}

/// Options of [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub rewrites: Vec<UrlRewrite>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("formschema/", env!("CARGO_PKG_VERSION")).to_string(),
            rewrites: Vec::new(),
        }
    }
}

/// Fetches schemas over HTTP(S).
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    rewrites: Vec<UrlRewrite>,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be created.
    pub fn new(options: FetchOptions) -> Result<Self, InlineError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()
            .map_err(|e| InlineError::Request {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            rewrites: options.rewrites,
        })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl SchemaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, InlineError> {
        let fetched_url = rewrite_url(&self.rewrites, url);
        log::debug!("fetching schema {url} from {fetched_url}");

        let request_error = |e: reqwest::Error| InlineError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self
            .client
            .get(&fetched_url)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            log::error!("fetch of {url} from {fetched_url} failed: {status}");
            return Err(InlineError::Http {
                url: url.to_string(),
                fetched_url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(request_error)?;
        serde_json::from_str(&body).map_err(|source| InlineError::Json {
            url: url.to_string(),
            source,
        })
    }
}

/// Serves documents from memory and records every fetch.
///
/// Unknown URLs answer like a server would: with a 404.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Value>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    /// A fetcher with no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` for `url`, which must match the requested URL
    /// exactly, without fragment.
    pub fn with_document(mut self, url: impl Into<String>, document: Value) -> Self {
        self.documents.insert(url.into(), document);
        self
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched
            .lock()
            .map(|fetched| fetched.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SchemaFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, InlineError> {
        if let Ok(mut fetched) = self.fetched.lock() {
            fetched.push(url.to_string());
        }
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| InlineError::Http {
                url: url.to_string(),
                fetched_url: url.to_string(),
                status: 404,
            })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_normalize_meta_schema() {
        let mut doc = json!({"$schema": "https://json-schema.org/draft-07/schema#"});
        normalize_meta_schema(&mut doc);
        assert_eq!(doc["$schema"], json!(DRAFT_07));

        let mut doc = json!({"$schema": "https://json-schema.org/draft/2020-12/schema"});
        normalize_meta_schema(&mut doc);
        assert_eq!(doc["$schema"], json!("https://json-schema.org/draft/2020-12/schema"));
    }

    #[test]
    fn test_url_rewrite() {
        let rewrites = vec![
            UrlRewrite::new(
                r"https?://locationobjects\.schemas\.here\.com/*[0-9.]*",
                "http://localhost:3000/mom/2.51.1",
            )
            .unwrap(),
        ];
        assert_eq!(
            rewrite_url(&rewrites, "https://locationobjects.schemas.here.com/2.51/place.json"),
            "http://localhost:3000/mom/2.51.1/place.json"
        );
        assert_eq!(
            rewrite_url(&rewrites, "https://example.com/a.json"),
            "https://example.com/a.json"
        );
    }

    #[test]
    fn test_memory_fetcher_missing_is_404() {
        let fetcher = MemoryFetcher::new().with_document("https://h/a.json", json!({}));
        tokio_test::block_on(async {
            assert_eq!(fetcher.fetch("https://h/a.json").await.unwrap(), json!({}));
            let err = fetcher.fetch("https://h/b.json").await.unwrap_err();
            assert!(matches!(err, InlineError::Http { status: 404, .. }));
        });
        assert_eq!(fetcher.fetched(), vec!["https://h/a.json", "https://h/b.json"]);
    }
}
