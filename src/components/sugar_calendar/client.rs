use super::models::{CalendarEnvelope, CalendarEvent, CalendarQuery, PopoverEnvelope};
use super::parse;
use super::schema;
use super::session::SessionManager;
use super::transport::CalendarTransport;
use crate::components::store::SessionStore;
use crate::error::{upstream_error, BotResult, Error};
use futures::future;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Form-dispatch endpoint both calendar actions go through
pub const ADMIN_AJAX_PATH: &str = "/wp-admin/admin-ajax.php";

const BLOCK_UPDATE_ACTION: &str = "sugar_calendar_block_update";
const POPOVER_ACTION: &str = "sugar_calendar_event_popover";

/// Accent color the upstream block is configured with
const BLOCK_ACCENT_COLOR: &str = "#ff7b00";

/// Upper bound on simultaneous in-flight detail-fetch requests. Fixed, not
/// adaptive; the upstream has its own abuse protections we must stay under.
pub const DETAIL_CONCURRENCY: usize = 5;

/// Fetches the month grid and per-event popover descriptions from the
/// upstream Sugar Calendar AJAX API.
///
/// Authorization failures (401/403) at either layer trigger one nonce
/// refresh followed by a single retry; the two layers retry independently
/// and a detail-fetch retry never re-triggers the outer calendar retry.
pub struct CalendarClient {
    transport: Arc<dyn CalendarTransport>,
    session: SessionManager,
    detail_limiter: Semaphore,
    visitor_tz: String,
}

impl CalendarClient {
    pub fn new(
        transport: Arc<dyn CalendarTransport>,
        store: Arc<dyn SessionStore>,
        visitor_tz: String,
    ) -> Self {
        Self {
            session: SessionManager::new(Arc::clone(&transport), store),
            transport,
            detail_limiter: Semaphore::new(DETAIL_CONCURRENCY),
            visitor_tz,
        }
    }

    /// Fetch and validate all events for the month the query points at.
    ///
    /// Events come back in document order. Cells that fail validation are
    /// dropped with a warning; an envelope that fails validation aborts the
    /// whole call.
    pub async fn fetch_calendar(&self, query: &CalendarQuery) -> BotResult<Vec<CalendarEvent>> {
        let envelope = self.fetch_envelope(query).await?;

        if !envelope.success {
            return Err(Error::InvalidUpstreamFormat(
                "calendar response reported success=false".to_string(),
            ));
        }

        let cells = parse::parse_event_cells(&envelope.data.body);
        debug!("Parsed {} event cells from grid body", cells.len());

        // Fan out one popover fetch per cell. join_all keeps the results in
        // dispatch order, so each description lands back on its originating
        // cell no matter which request completes first.
        let descriptions = future::join_all(
            cells
                .iter()
                .map(|cell| self.fetch_description(cell.external_event_id.clone())),
        )
        .await;

        let mut events = Vec::with_capacity(cells.len());
        for (cell, description) in cells.into_iter().zip(descriptions) {
            let accent_color = cell
                .accent_color_raw
                .as_deref()
                .and_then(|raw| parse::parse_accent_color(raw, &cell.title));

            match schema::validate_event(cell, description, accent_color) {
                Ok(event) => events.push(event),
                Err(reason) => warn!("Invalid event skipped: {}", reason),
            }
        }

        Ok(events)
    }

    /// POST the block-update action and validate the response envelope,
    /// retrying once with a fresh nonce on an authorization failure
    async fn fetch_envelope(&self, query: &CalendarQuery) -> BotResult<CalendarEnvelope> {
        let mut refreshed = false;

        loop {
            let nonce = self.session.get_token().await?;
            let form = build_calendar_form(query, &self.visitor_tz, &nonce);
            let response = self.transport.post_form(ADMIN_AJAX_PATH, &form).await?;

            if is_auth_failure(response.status) {
                if refreshed {
                    return Err(Error::AuthorizationExpired(format!(
                        "calendar fetch rejected with HTTP {} after nonce refresh",
                        response.status
                    )));
                }
                refreshed = true;
                self.session.invalidate_and_refresh().await?;
                continue;
            }

            if !response.status.is_success() {
                return Err(upstream_error(&format!(
                    "Failed to fetch calendar: HTTP {}",
                    response.status
                )));
            }

            let value: Value = serde_json::from_str(&response.body).map_err(|e| {
                Error::InvalidUpstreamFormat(format!("calendar response is not JSON: {}", e))
            })?;

            return schema::validate_envelope(&value)
                .map_err(|e| Error::InvalidUpstreamFormat(e.to_string()));
        }
    }

    /// Fetch one event's popover description, bounded by the concurrency
    /// limiter. Failures degrade to `None`: a calendar image with a blank
    /// description line is strictly better than dropping the event.
    async fn fetch_description(&self, event_object_id: String) -> Option<String> {
        let _permit = match self.detail_limiter.acquire().await {
            Ok(permit) => permit,
            // The semaphore is never closed while the client lives
            Err(_) => return None,
        };

        match self.try_fetch_description(&event_object_id).await {
            Ok(description) => description,
            Err(e) => {
                warn!(
                    "Failed to fetch description for event {}: {}",
                    event_object_id, e
                );
                None
            }
        }
    }

    async fn try_fetch_description(&self, event_object_id: &str) -> BotResult<Option<String>> {
        let mut refreshed = false;

        loop {
            let nonce = self.session.get_token().await?;
            let form = [
                ("action", POPOVER_ACTION.to_string()),
                ("event_object_id", event_object_id.to_string()),
                ("nonce", nonce),
            ];
            let response = self.transport.post_form(ADMIN_AJAX_PATH, &form).await?;

            if is_auth_failure(response.status) {
                if refreshed {
                    return Err(Error::AuthorizationExpired(format!(
                        "popover fetch rejected with HTTP {} after nonce refresh",
                        response.status
                    )));
                }
                refreshed = true;
                self.session.invalidate_and_refresh().await?;
                continue;
            }

            if !response.status.is_success() {
                return Err(upstream_error(&format!(
                    "Failed to fetch event description: HTTP {}",
                    response.status
                )));
            }

            let envelope: PopoverEnvelope = serde_json::from_str(&response.body).map_err(|e| {
                Error::InvalidUpstreamFormat(format!("popover response is not JSON: {}", e))
            })?;

            // success=false means the event has no popover content, which is
            // legitimate, not an error
            if !envelope.success {
                return Ok(None);
            }

            return Ok(envelope.data.and_then(|d| d.description));
        }
    }
}

/// Authorization failures are detected by status code only; matching on
/// response text would break behind proxies or localized error pages
fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Replicate the form payload the upstream widget sends for a month-grid
/// update
fn build_calendar_form(
    query: &CalendarQuery,
    visitor_tz: &str,
    nonce: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("action", BLOCK_UPDATE_ACTION.to_string()),
        ("calendar_block[id]", format!("sc-{}", query.calendar_id)),
        ("calendar_block[attributes][clientId]", String::new()),
        ("calendar_block[attributes][display]", "month".to_string()),
        (
            "calendar_block[attributes][accentColor]",
            BLOCK_ACCENT_COLOR.to_string(),
        ),
        (
            "calendar_block[attributes][should_not_load_events]",
            "true".to_string(),
        ),
        (
            "calendar_block[attributes][groupEventsByWeek]",
            "true".to_string(),
        ),
        (
            "calendar_block[attributes][calendarId]",
            query.calendar_id.clone(),
        ),
        (
            "calendar_block[attributes][allowUserChangeDisplay]",
            "false".to_string(),
        ),
        ("calendar_block[attributes][showSearch]", "false".to_string()),
        ("calendar_block[attributes][appearance]", "dark".to_string()),
        (
            "calendar_block[attributes][showBlockHeader]",
            "true".to_string(),
        ),
        ("calendar_block[attributes][showFilters]", "true".to_string()),
        ("calendar_block[day]", query.day.to_string()),
        ("calendar_block[month]", query.month.to_string()),
        ("calendar_block[year]", query.year.to_string()),
        ("calendar_block[accentColor]", BLOCK_ACCENT_COLOR.to_string()),
        ("calendar_block[display]", "month".to_string()),
        ("calendar_block[visitor_tz_convert]", "1".to_string()),
        ("calendar_block[visitor_tz]", visitor_tz.to_string()),
        ("calendar_block[updateDisplay]", "false".to_string()),
        ("calendar_block[action]", String::new()),
        ("nonce", nonce.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failure_is_status_based() {
        assert!(is_auth_failure(StatusCode::FORBIDDEN));
        assert!(is_auth_failure(StatusCode::UNAUTHORIZED));
        assert!(!is_auth_failure(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_auth_failure(StatusCode::OK));
    }

    #[test]
    fn calendar_form_carries_query_and_nonce() {
        let query = CalendarQuery {
            day: 14,
            month: 3,
            year: 2026,
            calendar_id: "86b19402-2c15-4a33-9102-2b6a34ac6699".to_string(),
        };

        let form = build_calendar_form(&query, "America/Chicago", "9f8e7d");
        let lookup = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(lookup("action"), Some("sugar_calendar_block_update"));
        assert_eq!(lookup("calendar_block[day]"), Some("14"));
        assert_eq!(lookup("calendar_block[month]"), Some("3"));
        assert_eq!(lookup("calendar_block[year]"), Some("2026"));
        assert_eq!(
            lookup("calendar_block[id]"),
            Some("sc-86b19402-2c15-4a33-9102-2b6a34ac6699")
        );
        assert_eq!(
            lookup("calendar_block[visitor_tz]"),
            Some("America/Chicago")
        );
        assert_eq!(lookup("nonce"), Some("9f8e7d"));
    }
}
