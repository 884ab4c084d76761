use super::transport::CalendarTransport;
use crate::components::store::{keys, SessionStore};
use crate::error::{BotResult, Error};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

/// Path of the public page the nonce is scraped from
pub const CALENDAR_PAGE_PATH: &str = "/calendar/";

/// How long a scraped nonce is trusted before it is treated as a cache miss.
/// The upstream rotates them daily.
pub const NONCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Manages the session nonce the upstream AJAX endpoints require.
///
/// The nonce is not issued by any documented auth flow; it sits in an inline
/// script on the public calendar page. The cache is an injected capability so
/// a calendar fetch and any in-flight detail fetches can both trigger a
/// refresh without coordination: a redundant refresh just overwrites the
/// cache with an equally valid value.
#[derive(Clone)]
pub struct SessionManager {
    transport: Arc<dyn CalendarTransport>,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn CalendarTransport>, store: Arc<dyn SessionStore>) -> Self {
        Self { transport, store }
    }

    /// Get the cached nonce, scraping a fresh one on a cache miss
    pub async fn get_token(&self) -> BotResult<String> {
        if let Some(nonce) = self.store.get_value(keys::SESSION_NONCE).await? {
            debug!("Using cached session nonce");
            return Ok(nonce);
        }

        self.fetch_and_cache().await
    }

    /// Discard any cached nonce and scrape a fresh one
    pub async fn invalidate_and_refresh(&self) -> BotResult<String> {
        self.store.delete_value(keys::SESSION_NONCE).await?;
        self.fetch_and_cache().await
    }

    async fn fetch_and_cache(&self) -> BotResult<String> {
        let html = self.transport.get_page(CALENDAR_PAGE_PATH).await?;
        let nonce = extract_nonce(&html).ok_or(Error::TokenNotFound)?;

        self.store
            .set_value(keys::SESSION_NONCE, &nonce, NONCE_TTL)
            .await?;

        info!("Fetched fresh session nonce");
        Ok(nonce)
    }
}

fn nonce_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)["']nonce["']\s*:\s*["']([0-9a-f]+)["']"#).expect("valid nonce pattern")
    })
}

/// Scan all inline script blocks for a `"nonce": "<hex>"` pair and return
/// the first match
fn extract_nonce(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let scripts = Selector::parse("script").expect("valid script selector");

    for script in document.select(&scripts) {
        let content: String = script.text().collect();
        if let Some(captures) = nonce_pattern().captures(&content) {
            return Some(captures[1].to_string());
        }
    }

    None
}
