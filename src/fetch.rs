//! HTTP retrieval of the upstream emoji dataset.
//!
//! Two source kinds are supported. `discord_client` loads the Discord login
//! page, walks the `/assets/*.js` bundles it references (last one first, since
//! the dataset lives in one of the late chunks) and lifts the category object
//! out of the first bundle where it parses. `json` downloads the category
//! object from a plain endpoint.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, error, info, warn};

use crate::config::{FetchConfig, SourceAction};
use crate::contract::{Fetcher, RawDataset};
use crate::error::FetchError;

/// The category object as it appears inline in the client bundle:
/// `{"people":[{"names":[...],"surrogates":"..."},...],...}`.
static DATASET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{("\w+":\[(\{"names":.+"surrogates":.+\},)*\{"names":.+"surrogates":.+\}\])+\}"#,
    )
    .unwrap_or_else(|_| unreachable!())
});

static SCRIPT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script[src]").unwrap_or_else(|_| unreachable!()));

/// Fetches the dataset over HTTP, once, within the configured time limit.
pub struct HttpFetcher {
    client: reqwest::Client,
    source: SourceAction,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(source: SourceAction, fetch: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(fetch.timeout())
            .user_agent(fetch.user_agent.as_str())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            source,
            timeout: fetch.timeout(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| self.request_error(url, source))?;

        let status = response.status();
        if !status.is_success() {
            error!(url, status = status.as_u16(), "Upstream answered with an error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| self.request_error(url, source))
    }

    fn request_error(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }

    async fn fetch_from_client(&self, login_url: &str) -> Result<RawDataset, FetchError> {
        let base =
            Url::parse(login_url).map_err(|e| FetchError::Payload(format!("{login_url}: {e}")))?;
        let page = self.get_text(login_url).await?;
        let scripts = extract_script_urls(&page, &base);
        info!(scripts = scripts.len(), "Found client scripts on login page");

        for script in scripts.iter().rev() {
            let body = self.get_text(script.as_str()).await?;
            match find_dataset(&body) {
                Some(Ok(raw)) => {
                    info!(script = %script, entries = raw.entry_count(), "Found emoji dataset");
                    return Ok(raw);
                }
                Some(Err(e)) => warn!(script = %script, error = %e, "Candidate dataset did not decode, trying next script"),
                None => debug!(script = %script, "No dataset in script"),
            }
        }

        error!(scripts = scripts.len(), "Emoji map could not be found");
        Err(FetchError::DatasetNotFound {
            scripts: scripts.len(),
        })
    }

    async fn fetch_json(&self, url: &str) -> Result<RawDataset, FetchError> {
        let body = self.get_text(url).await?;
        let raw = RawDataset::from_json(&body)?;
        info!(url, entries = raw.entry_count(), "Downloaded emoji dataset");
        Ok(raw)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> Result<RawDataset, FetchError> {
        let attempt = async {
            match &self.source {
                SourceAction::DiscordClient(source) => {
                    self.fetch_from_client(&source.login_url).await
                }
                SourceAction::Json(source) => self.fetch_json(&source.url).await,
            }
        };
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                error!(timeout = ?self.timeout, "Fetch timed out");
                Err(FetchError::Timeout(self.timeout))
            }
        }
    }
}

/// Absolute URLs of the `/assets/*.js` bundles referenced by `page`, in
/// document order.
pub fn extract_script_urls(page: &str, base: &Url) -> Vec<Url> {
    let document = Html::parse_document(page);
    document
        .select(&SCRIPT_SELECTOR)
        .filter_map(|script| script.value().attr("src"))
        .filter(|src| src.starts_with("/assets/") && src.ends_with(".js"))
        .filter_map(|src| base.join(src).ok())
        .collect()
}

/// Locate the category object inside a client bundle. `None` when nothing
/// looks like it, `Some(Err)` when the match is not valid JSON.
pub fn find_dataset(script: &str) -> Option<Result<RawDataset, FetchError>> {
    let found = DATASET_PATTERN.find(script)?;
    Some(RawDataset::from_json(found.as_str()).map_err(|e| {
        FetchError::Payload(format!("position {}-{}: {e}", found.start(), found.end()))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_asset_bundles_in_document_order() {
        let page = r#"<html><head>
            <script src="/assets/a1.js"></script>
            <script src="https://cdn.example.com/x.js"></script>
            <script src="/assets/style.css"></script>
            <script>inline()</script>
            </head><body><script src="/assets/b2.js" defer></script></body></html>"#;
        let base = Url::parse("https://discord.com/login").unwrap();
        let urls: Vec<String> = extract_script_urls(page, &base)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            urls,
            vec!["https://discord.com/assets/a1.js", "https://discord.com/assets/b2.js"]
        );
    }

    #[test]
    fn finds_dataset_embedded_in_bundle() {
        let script = r#"var x=1;e.exports=JSON.parse('x');const c={"people":[{"names":["smile"],"surrogates":"s"},{"names":["wink"],"surrogates":"w"}],"nature":[{"names":["dog"],"surrogates":"d"}]};foo()"#;
        let raw = find_dataset(script).unwrap().unwrap();
        assert_eq!(raw.entry_count(), 3);
        assert_eq!(
            raw.categories().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["nature", "people"]
        );
    }

    #[test]
    fn finds_dataset_on_its_own_line() {
        let script = "a();\n{\"people\":[{\"names\":[\"smile\"],\"surrogates\":\"s\"}],\"nature\":[{\"names\":[\"dog\"],\"surrogates\":\"d\"}]}\nb();";
        let raw = find_dataset(script).unwrap().unwrap();
        assert_eq!(raw.entry_count(), 2);
    }

    #[test]
    fn bundle_without_dataset_yields_none() {
        assert!(find_dataset("function a(){return {\"x\":1}}").is_none());
    }
}
