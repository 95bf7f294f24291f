//! Web search over the DuckDuckGo HTML endpoint.

use crate::config::SearchSettings;
use crate::error::{Result, ScoutError};
use crate::retry::RetryPolicy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

/// Returned when the provider has no results for a query.
pub const NO_RESULTS: &str = "No good search result was found.";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; scout/0.1)";

/// A single search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// DuckDuckGo HTML search client.
pub struct WebSearch {
    client: reqwest::Client,
    endpoint: String,
    max_results: usize,
    retry: RetryPolicy,
    title_regex: Regex,
    snippet_regex: Regex,
    href_regex: Regex,
    tag_regex: Regex,
}

impl WebSearch {
    /// Create a search client from settings.
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ScoutError::Config(format!("Invalid pattern: {}", e)))
        };

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            max_results: settings.max_results,
            retry: RetryPolicy::default(),
            title_regex: compile(r#"(?s)<a([^>]*)class="result__a"([^>]*)>(.*?)</a>"#)?,
            snippet_regex: compile(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|div|td)>"#)?,
            href_regex: compile(r#"href="([^"]*)""#)?,
            tag_regex: compile(r"<[^>]+>")?,
        })
    }

    /// Set the retry policy for provider requests.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Query the provider and return up to `max_results` hits.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<WebResult>> {
        let query = query.trim().trim_matches('"');
        if query.is_empty() {
            return Err(ScoutError::InvalidInput("empty search query".to_string()));
        }

        let html = self.retry.run("web search", || self.fetch(query)).await?;
        let results = self.parse_results(&html);

        debug!("Web search returned {} results", results.len());
        Ok(results)
    }

    /// Search and format the results for the agent.
    ///
    /// Failures are reported in the returned text instead of as errors.
    pub async fn run(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(results) => format_results(&results),
            Err(e) => {
                warn!("Web search failed: {}", e);
                format!("Error: web search failed: {}", e)
            }
        }
    }

    async fn fetch(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ScoutError::Provider(format!("search provider returned {}", status)));
        }
        if !status.is_success() {
            return Err(ScoutError::Search(format!("search provider returned {}", status)));
        }

        Ok(response.text().await?)
    }

    /// Extract result titles, snippets and target URLs from a result page.
    fn parse_results(&self, html: &str) -> Vec<WebResult> {
        let titles: Vec<_> = self.title_regex.captures_iter(html).collect();
        let mut results = Vec::new();

        for (i, caps) in titles.iter().enumerate() {
            if results.len() >= self.max_results {
                break;
            }
            let (Some(whole), Some(text)) = (caps.get(0), caps.get(3)) else {
                continue;
            };

            let attrs = format!(
                "{} {}",
                caps.get(1).map_or("", |m| m.as_str()),
                caps.get(2).map_or("", |m| m.as_str())
            );
            let href = self
                .href_regex
                .captures(&attrs)
                .and_then(|c| c.get(1))
                .map_or("", |m| m.as_str());

            // The snippet sits between this title and the next one.
            let block_end = titles
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let snippet = self
                .snippet_regex
                .captures(&html[whole.end()..block_end])
                .and_then(|c| c.get(1))
                .map(|m| self.clean_text(m.as_str()))
                .unwrap_or_default();

            let title = self.clean_text(text.as_str());
            if title.is_empty() {
                continue;
            }

            results.push(WebResult {
                title,
                snippet,
                url: resolve_link(&html_decode(href)),
            });
        }

        results
    }

    fn clean_text(&self, fragment: &str) -> String {
        let stripped = self.tag_regex.replace_all(fragment, "");
        html_decode(&stripped)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Format hits as text blocks, or the no-results sentinel.
pub fn format_results(results: &[WebResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    results
        .iter()
        .map(|r| {
            if r.snippet.is_empty() {
                format!("{}\nURL: {}", r.title, r.url)
            } else {
                format!("{}\n{}\nURL: {}", r.title, r.snippet, r.url)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Unwrap DuckDuckGo redirect links (`//duckduckgo.com/l/?uddg=...`).
fn resolve_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    match Url::parse(&absolute) {
        Ok(url) if url.path() == "/l/" => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RESULT_PAGE: &str = r#"
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.python.org%2Fdownloads%2F&amp;rut=abc">Download <b>Python</b> | Python.org</a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">The latest release is <b>Python</b> 3.13 &amp; more.</a>
  </div>
</div>
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://docs.python.org/3/whatsnew/">What&#x27;s New In Python</a>
    </h2>
  </div>
</div>
"#;

    fn settings(endpoint: String, max_results: usize) -> SearchSettings {
        SearchSettings {
            endpoint,
            max_results,
            timeout_secs: 5,
        }
    }

    fn search(max_results: usize) -> WebSearch {
        WebSearch::new(&settings("http://localhost/html/".to_string(), max_results)).unwrap()
    }

    #[test]
    fn test_parse_results_extracts_titles_snippets_and_links() {
        let results = search(5).parse_results(RESULT_PAGE);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Download Python | Python.org");
        assert_eq!(results[0].snippet, "The latest release is Python 3.13 & more.");
        assert_eq!(results[0].url, "https://www.python.org/downloads/");
        assert_eq!(results[1].title, "What's New In Python");
        assert_eq!(results[1].snippet, "");
        assert_eq!(results[1].url, "https://docs.python.org/3/whatsnew/");
    }

    #[test]
    fn test_parse_results_respects_max_results() {
        assert_eq!(search(1).parse_results(RESULT_PAGE).len(), 1);
    }

    #[test]
    fn test_format_results() {
        assert_eq!(format_results(&[]), NO_RESULTS);

        let out = format_results(&[WebResult {
            title: "Python".to_string(),
            snippet: "Release notes".to_string(),
            url: "https://python.org".to_string(),
        }]);
        assert_eq!(out, "Python\nRelease notes\nURL: https://python.org");
    }

    #[tokio::test]
    async fn test_run_against_mock_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "latest python version"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RESULT_PAGE))
            .mount(&server)
            .await;

        let search = WebSearch::new(&settings(format!("{}/html/", server.uri()), 5)).unwrap();
        let out = search.run("latest python version").await;

        assert!(out.starts_with("Download Python | Python.org\n"));
        assert!(out.contains("URL: https://www.python.org/downloads/"));
    }

    #[tokio::test]
    async fn test_empty_page_returns_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let search = WebSearch::new(&settings(server.uri(), 5)).unwrap();
        assert_eq!(search.run("nothing").await, NO_RESULTS);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let search = WebSearch::new(&settings(server.uri(), 5))
            .unwrap()
            .with_retry(RetryPolicy::none());
        let out = search.run("python").await;

        assert!(out.starts_with("Error: web search failed:"), "{}", out);
    }
}
