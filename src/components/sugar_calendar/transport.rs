use crate::error::{upstream_error, BotResult, Error};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Browser-like user agent; the upstream rejects obviously non-browser
/// clients from its admin-ajax endpoint
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Status and body of a form POST; non-2xx statuses are returned rather than
/// turned into errors so the caller can apply its authorization-retry policy
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// HTTP seam between the fetchers and the upstream site. Implemented by
/// [`ReqwestTransport`] in production and by in-memory mocks in tests.
#[async_trait]
pub trait CalendarTransport: Send + Sync {
    /// GET an HTML page from the site, returning the body on 2xx
    async fn get_page(&self, path: &str) -> BotResult<String>;

    /// POST a form-encoded action to the site
    async fn post_form(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> BotResult<HttpResponse>;
}

/// Transport backed by a shared reqwest client with an explicit timeout
pub struct ReqwestTransport {
    base_url: String,
    client: Client,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> BotResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl CalendarTransport for ReqwestTransport {
    async fn get_page(&self, path: &str) -> BotResult<String> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(
                "accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("accept-language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| upstream_error(&format!("Failed to fetch {}: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(upstream_error(&format!(
                "Failed to fetch {}: HTTP {}",
                path,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| upstream_error(&format!("Failed to read {} body: {}", path, e)))
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> BotResult<HttpResponse> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("accept", "*/*")
            .header("accept-language", "en-US,en;q=0.9")
            .header("origin", self.base_url.clone())
            .header("referer", format!("{}/calendar/", self.base_url))
            .header("x-requested-with", "XMLHttpRequest")
            .form(&form)
            .send()
            .await
            .map_err(|e| upstream_error(&format!("Failed to post to {}: {}", path, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| upstream_error(&format!("Failed to read {} body: {}", path, e)))?;

        Ok(HttpResponse { status, body })
    }
}
