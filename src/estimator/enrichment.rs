//! Live related-terms enrichment
//!
//! Optional lookup of related searches on the portals' own result pages.
//! The heuristic metric never depends on it: callers replace the heuristic
//! related terms only when this lookup succeeds.
//!
//! Features:
//! - User-Agent rotation
//! - Rate limiting with governor
//! - Retry with exponential backoff on 429/5xx and timeouts
//! - UTF-8 / EUC-KR decoding

use async_trait::async_trait;
use encoding_rs::{EUC_KR, UTF_8};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::seq::SliceRandom;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT},
    Client, Response,
};
use scraper::{Html, Selector};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::EnrichmentConfig;
use crate::models::Portal;
use crate::utils::error::EnrichmentError;
use crate::utils::normalize_whitespace;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// Source of live related search terms
#[async_trait]
pub trait RelatedTermsSource: Send + Sync {
    /// Related terms for `keyword` on `portal`
    async fn related_terms(
        &self,
        keyword: &str,
        portal: Portal,
    ) -> Result<Vec<String>, EnrichmentError>;
}

/// Search page location and related-search markup for one portal
struct PortalPage {
    origin: &'static str,
    path: &'static str,
    query_param: &'static str,
    selectors: &'static [&'static str],
}

fn portal_page(portal: Portal) -> Option<PortalPage> {
    match portal {
        Portal::Google => Some(PortalPage {
            origin: "https://www.google.com",
            path: "/search",
            query_param: "q",
            selectors: &["div.s75CSd", "a.k8XOCe div", "div.related-question-pair span"],
        }),
        Portal::Naver => Some(PortalPage {
            origin: "https://search.naver.com",
            path: "/search.naver",
            query_param: "query",
            selectors: &["div.related_srch a.keyword div.tit", "ul.lst_related_srch a div.tit"],
        }),
        Portal::Daum => Some(PortalPage {
            origin: "https://search.daum.net",
            path: "/search",
            query_param: "q",
            selectors: &["div.list_related a", "#netizen_lists_top a"],
        }),
        // Results are rendered client-side; nothing to scrape.
        Portal::YouTube => None,
    }
}

/// Related-terms fetcher scraping portal search pages
pub struct PortalEnricher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter shared by every portal
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    retry: RetryConfig,

    /// Maximum number of terms returned per lookup
    max_terms: usize,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl PortalEnricher {
    /// Create an enricher from configuration
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Http` if the HTTP client cannot be created
    pub fn new(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            retry: RetryConfig::with_delays(
                config.max_retries,
                config.retry_base_delay_ms,
                config.retry_base_delay_ms.saturating_mul(8),
            ),
            max_terms: config.max_terms,
            base_url: None,
        })
    }

    /// Create an enricher that sends every request to `base_url`
    ///
    /// # Errors
    ///
    /// Returns `EnrichmentError::Http` if the HTTP client cannot be created
    pub fn with_base_url(
        base_url: &str,
        config: &EnrichmentConfig,
    ) -> Result<Self, EnrichmentError> {
        let mut enricher = Self::new(config)?;
        enricher.base_url = Some(base_url.trim_end_matches('/').to_string());
        Ok(enricher)
    }

    /// Search page URL for `keyword` on `portal`
    fn search_url(&self, page: &PortalPage, keyword: &str) -> Result<Url, EnrichmentError> {
        let origin = self.base_url.as_deref().unwrap_or(page.origin);
        let raw = format!("{origin}{}", page.path);

        Url::parse_with_params(&raw, &[(page.query_param, keyword)])
            .map_err(|e| EnrichmentError::InvalidUrl(format!("{raw}: {e}")))
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, EnrichmentError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url.clone())
            .headers(self.build_headers())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EnrichmentError::Timeout
                } else {
                    EnrichmentError::Http(e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            self.decode_response(response).await
        } else if status.as_u16() == 429 {
            Err(EnrichmentError::RateLimit)
        } else {
            Err(EnrichmentError::ServerError(status.as_u16()))
        }
    }

    async fn decode_response(&self, response: Response) -> Result<String, EnrichmentError> {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?;
        decode_bytes(&bytes, &content_type)
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        headers
    }
}

#[async_trait]
impl RelatedTermsSource for PortalEnricher {
    async fn related_terms(
        &self,
        keyword: &str,
        portal: Portal,
    ) -> Result<Vec<String>, EnrichmentError> {
        let page =
            portal_page(portal).ok_or_else(|| EnrichmentError::Unsupported(portal.to_string()))?;
        let url = self.search_url(&page, keyword)?;

        let html = with_retry_if(
            &self.retry,
            || self.fetch_once(&url),
            EnrichmentError::is_retryable,
        )
        .await?;

        let terms = extract_related(&html, page.selectors, keyword, self.max_terms)?;
        debug!(%portal, keyword, terms = terms.len(), "Fetched related terms");
        Ok(terms)
    }
}

/// Collect distinct related-search texts matching any of `selectors`
///
/// The keyword itself is skipped and at most `limit` terms are returned.
pub fn extract_related(
    html: &str,
    selectors: &[&str],
    keyword: &str,
    limit: usize,
) -> Result<Vec<String>, EnrichmentError> {
    let document = Html::parse_document(html);
    let mut terms: Vec<String> = Vec::new();

    for raw in selectors {
        let selector = Selector::parse(raw)
            .map_err(|e| EnrichmentError::Decode(format!("invalid selector {raw}: {e}")))?;

        for element in document.select(&selector) {
            let text = normalize_whitespace(&element.text().collect::<String>());
            if text.is_empty() || text.eq_ignore_ascii_case(keyword) || terms.contains(&text) {
                continue;
            }
            terms.push(text);
            if terms.len() >= limit {
                return Ok(terms);
            }
        }
    }

    Ok(terms)
}

/// Decode bytes to a UTF-8 string, honouring an EUC-KR charset
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, EnrichmentError> {
    let content_type = content_type.to_lowercase();
    if content_type.contains("charset=euc-kr") {
        return decode_with(bytes, EUC_KR);
    }

    if let Ok(text) = decode_with(bytes, UTF_8) {
        return Ok(text);
    }

    decode_with(bytes, EUC_KR)
        .map_err(|_| EnrichmentError::Decode("content is neither UTF-8 nor EUC-KR".to_string()))
}

fn decode_with(
    bytes: &[u8],
    encoding: &'static encoding_rs::Encoding,
) -> Result<String, EnrichmentError> {
    let (cow, _encoding, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(EnrichmentError::Decode(format!(
            "{} decoding errors",
            encoding.name()
        )));
    }
    Ok(cow.into_owned())
}

fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAVER_HTML: &str = r#"<html><body>
        <div class="related_srch">
            <a class="keyword"><div class="tit">파이썬 강의</div></a>
            <a class="keyword"><div class="tit">파이썬   독학</div></a>
            <a class="keyword"><div class="tit">파이썬 강의</div></a>
            <a class="keyword"><div class="tit">파이썬</div></a>
        </div>
    </body></html>"#;

    #[test]
    fn test_extract_related_dedupes_and_skips_keyword() {
        let selectors = portal_page(Portal::Naver).unwrap().selectors;
        let terms = extract_related(NAVER_HTML, selectors, "파이썬", 10).unwrap();
        assert_eq!(terms, vec!["파이썬 강의", "파이썬 독학"]);
    }

    #[test]
    fn test_extract_related_respects_limit() {
        let selectors = portal_page(Portal::Naver).unwrap().selectors;
        let terms = extract_related(NAVER_HTML, selectors, "파이썬", 1).unwrap();
        assert_eq!(terms.len(), 1);
    }

    #[test]
    fn test_decode_euc_kr() {
        // "안녕하세요" in EUC-KR
        let bytes: &[u8] = &[0xbe, 0xc8, 0xb3, 0xe7, 0xc7, 0xcf, 0xbc, 0xbc, 0xbf, 0xe4];
        assert_eq!(decode_bytes(bytes, "text/html; charset=EUC-KR").unwrap(), "안녕하세요");
        assert_eq!(decode_bytes(bytes, "text/html").unwrap(), "안녕하세요");
    }

    #[test]
    fn test_decode_utf8() {
        let text = "related 검색어";
        assert_eq!(decode_bytes(text.as_bytes(), "text/html").unwrap(), text);
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let enricher =
            PortalEnricher::with_base_url("http://127.0.0.1:9999/", &EnrichmentConfig::default())
                .unwrap();
        let page = portal_page(Portal::Naver).unwrap();
        let url = enricher.search_url(&page, "파이썬 강의").unwrap();
        assert_eq!(url.path(), "/search.naver");
        assert_eq!(
            url.query_pairs().next().map(|(k, v)| (k.into_owned(), v.into_owned())),
            Some(("query".to_string(), "파이썬 강의".to_string()))
        );
    }

    #[test]
    fn test_user_agent_rotation() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }
}
