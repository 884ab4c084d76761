//! End-to-end tests for the scrape-validate-cache pipeline, driven through
//! an in-memory upstream so the retry, concurrency, and ordering behavior
//! can be observed precisely.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use sokeribotti::components::store::MemoryStore;
use sokeribotti::components::sugar_calendar::client::CalendarClient;
use sokeribotti::components::sugar_calendar::models::CalendarQuery;
use sokeribotti::components::sugar_calendar::transport::{CalendarTransport, HttpResponse};
use sokeribotti::error::{BotResult, Error};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted stand-in for the upstream site
#[derive(Default)]
struct MockUpstream {
    /// Grid body served on a successful block update
    grid_body: String,
    /// Statuses returned for block-update POSTs before succeeding
    calendar_statuses: Mutex<Vec<u16>>,
    /// Statuses returned for popover POSTs before succeeding
    popover_statuses: Mutex<Vec<u16>>,
    /// Per-event artificial popover latency
    popover_delays_ms: HashMap<String, u64>,
    /// Number of nonce-page fetches observed
    page_hits: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockUpstream {
    fn new(grid_body: impl Into<String>) -> Self {
        Self {
            grid_body: grid_body.into(),
            ..Default::default()
        }
    }

    fn with_calendar_statuses(self, statuses: &[u16]) -> Self {
        *self.calendar_statuses.lock().unwrap() = statuses.to_vec();
        self
    }

    fn with_popover_statuses(self, statuses: &[u16]) -> Self {
        *self.popover_statuses.lock().unwrap() = statuses.to_vec();
        self
    }

    fn with_popover_delay(mut self, event_id: &str, millis: u64) -> Self {
        self.popover_delays_ms.insert(event_id.to_string(), millis);
        self
    }

    fn page_fetches(&self) -> usize {
        self.page_hits.load(Ordering::SeqCst)
    }

    fn max_concurrent_popovers(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn form_value<'a>(form: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

fn envelope_body(grid_body: &str) -> String {
    json!({
        "success": true,
        "data": {
            "body": grid_body,
            "heading": "March 2026",
            "heading_mobile": "Mar 2026",
            "is_update_display": false,
            "control_labels": { "prev": "Previous", "next": "Next" },
            "date": { "day": "14", "month": 3, "year": "2026" }
        }
    })
    .to_string()
}

#[async_trait]
impl CalendarTransport for MockUpstream {
    async fn get_page(&self, _path: &str) -> BotResult<String> {
        let hits = self.page_hits.fetch_add(1, Ordering::SeqCst);
        // Each page fetch hands out a distinct hex nonce
        Ok(format!(
            r#"<html><script>var scFrontend = {{"nonce": "{:06x}"}};</script></html>"#,
            0xa0c0e0 + hits
        ))
    }

    async fn post_form(
        &self,
        _path: &str,
        form: &[(&'static str, String)],
    ) -> BotResult<HttpResponse> {
        match form_value(form, "action") {
            Some("sugar_calendar_block_update") => {
                let scripted = self.calendar_statuses.lock().unwrap().pop();
                if let Some(status) = scripted {
                    return Ok(HttpResponse {
                        status: StatusCode::from_u16(status).unwrap(),
                        body: String::new(),
                    });
                }

                Ok(HttpResponse {
                    status: StatusCode::OK,
                    body: envelope_body(&self.grid_body),
                })
            }
            Some("sugar_calendar_event_popover") => {
                let event_id = form_value(form, "event_object_id").unwrap_or("").to_string();

                let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(current, Ordering::SeqCst);

                let delay = self.popover_delays_ms.get(&event_id).copied().unwrap_or(5);
                tokio::time::sleep(Duration::from_millis(delay)).await;

                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                let scripted = self.popover_statuses.lock().unwrap().pop();
                if let Some(status) = scripted {
                    return Ok(HttpResponse {
                        status: StatusCode::from_u16(status).unwrap(),
                        body: String::new(),
                    });
                }

                Ok(HttpResponse {
                    status: StatusCode::OK,
                    body: json!({
                        "success": true,
                        "data": { "description": format!("Description for {}", event_id), "image": false }
                    })
                    .to_string(),
                })
            }
            other => panic!("unexpected form action: {:?}", other),
        }
    }
}

fn event_cell(id: &str, title: &str) -> String {
    format!(
        r#"<div class="sugar-calendar-block__event-cell" data-eventobjid="{id}"
             data-calendarsinfo="{{&quot;primary_event_color&quot;:&quot;#3a86ff&quot;}}">
            <span class="sugar-calendar-block__event-cell__title">{title}</span>
            <time datetime="2026-03-14T18:00:00-05:00">6:00 pm</time>
            <time datetime="2026-03-14T20:00:00-05:00">8:00 pm</time>
        </div>"#
    )
}

fn test_query() -> CalendarQuery {
    CalendarQuery {
        day: 14,
        month: 3,
        year: 2026,
        calendar_id: "86b19402-2c15-4a33-9102-2b6a34ac6699".to_string(),
    }
}

fn client_for(upstream: Arc<MockUpstream>) -> CalendarClient {
    CalendarClient::new(
        upstream,
        Arc::new(MemoryStore::new()),
        "America/Chicago".to_string(),
    )
}

#[tokio::test]
async fn empty_grid_returns_empty_list() {
    let upstream = Arc::new(MockUpstream::new(
        "<div class=\"sugar-calendar-block__events\"></div>",
    ));
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn events_carry_descriptions_and_accent_colors() {
    let body = format!("<div>{}</div>", event_cell("42", "Scrim night"));
    let upstream = Arc::new(MockUpstream::new(body));
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Scrim night");
    assert_eq!(events[0].event_object_id, "42");
    assert_eq!(events[0].accent_color.as_deref(), Some("#3a86ff"));
    assert_eq!(
        events[0].description.as_deref(),
        Some("Description for 42")
    );
}

#[tokio::test]
async fn cell_without_calendarsinfo_still_validates() {
    let body = r#"<div class="sugar-calendar-block__event-cell" data-eventobjid="7">
        <span class="sugar-calendar-block__event-cell__title">Plain event</span>
    </div>"#;
    let upstream = Arc::new(MockUpstream::new(body));
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].accent_color.is_none());
}

#[tokio::test]
async fn cell_without_event_id_is_dropped() {
    let body = format!(
        r#"<div class="sugar-calendar-block__event-cell">
            <span class="sugar-calendar-block__event-cell__title">Orphan</span>
        </div>{}"#,
        event_cell("8", "Kept")
    );
    let upstream = Arc::new(MockUpstream::new(body));
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Kept");
}

#[tokio::test]
async fn single_auth_failure_recovers_with_one_refresh() {
    let body = format!("<div>{}</div>", event_cell("1", "After retry"));
    let upstream =
        Arc::new(MockUpstream::new(body).with_calendar_statuses(&[403]));
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert_eq!(events.len(), 1);
    // One lazy nonce fetch plus exactly one refresh
    assert_eq!(upstream.page_fetches(), 2);
}

#[tokio::test]
async fn repeated_auth_failures_propagate_without_retry_loop() {
    let upstream = Arc::new(
        MockUpstream::new("<div></div>").with_calendar_statuses(&[403, 403]),
    );
    let client = client_for(Arc::clone(&upstream));

    let result = client.fetch_calendar(&test_query()).await;
    assert!(matches!(result, Err(Error::AuthorizationExpired(_))));
    // Still only one refresh: the second 403 must not trigger another
    assert_eq!(upstream.page_fetches(), 2);
}

#[tokio::test]
async fn non_auth_failure_is_upstream_unavailable() {
    let upstream =
        Arc::new(MockUpstream::new("<div></div>").with_calendar_statuses(&[500]));
    let client = client_for(Arc::clone(&upstream));

    let result = client.fetch_calendar(&test_query()).await;
    assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
    assert_eq!(upstream.page_fetches(), 1);
}

#[tokio::test]
async fn unsuccessful_envelope_is_invalid_upstream_format() {
    struct FailingUpstream;

    #[async_trait]
    impl CalendarTransport for FailingUpstream {
        async fn get_page(&self, _path: &str) -> BotResult<String> {
            Ok(r#"<script>var s = {"nonce": "abc123"};</script>"#.to_string())
        }

        async fn post_form(
            &self,
            _path: &str,
            _form: &[(&'static str, String)],
        ) -> BotResult<HttpResponse> {
            Ok(HttpResponse {
                status: StatusCode::OK,
                body: json!({ "success": false, "data": { "error": "nope" } }).to_string(),
            })
        }
    }

    let client = CalendarClient::new(
        Arc::new(FailingUpstream),
        Arc::new(MemoryStore::new()),
        "America/Chicago".to_string(),
    );

    let result = client.fetch_calendar(&test_query()).await;
    assert!(matches!(result, Err(Error::InvalidUpstreamFormat(_))));
}

#[tokio::test]
async fn detail_fetches_respect_concurrency_bound() {
    let body: String = (0..20).map(|i| event_cell(&i.to_string(), "Busy day")).collect();
    let mut upstream = MockUpstream::new(body);
    for i in 0..20 {
        upstream = upstream.with_popover_delay(&i.to_string(), 25);
    }
    let upstream = Arc::new(upstream);
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert_eq!(events.len(), 20);
    assert!(
        upstream.max_concurrent_popovers() <= 5,
        "observed {} concurrent popover fetches",
        upstream.max_concurrent_popovers()
    );
}

#[tokio::test]
async fn results_keep_document_order_despite_completion_order() {
    let body = format!(
        "<div>{}{}{}</div>",
        event_cell("a", "First"),
        event_cell("b", "Second"),
        event_cell("c", "Third")
    );
    // B resolves long before A and C
    let upstream = Arc::new(
        MockUpstream::new(body)
            .with_popover_delay("a", 80)
            .with_popover_delay("b", 1)
            .with_popover_delay("c", 40),
    );
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.event_object_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    // And every description joined back onto its originating cell
    for event in &events {
        assert_eq!(
            event.description.as_deref(),
            Some(format!("Description for {}", event.event_object_id).as_str())
        );
    }
}

#[tokio::test]
async fn failed_description_degrades_to_none() {
    let body = format!("<div>{}</div>", event_cell("9", "No popover"));
    let upstream =
        Arc::new(MockUpstream::new(body).with_popover_statuses(&[500]));
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].description.is_none());
}

#[tokio::test]
async fn detail_auth_failure_refreshes_and_retries_independently() {
    let body = format!("<div>{}</div>", event_cell("5", "Guarded"));
    let upstream =
        Arc::new(MockUpstream::new(body).with_popover_statuses(&[403]));
    let client = client_for(Arc::clone(&upstream));

    let events = client.fetch_calendar(&test_query()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].description.as_deref(),
        Some("Description for 5")
    );
    // The popover retry refreshed the nonce once; the calendar fetch itself
    // never retried
    assert_eq!(upstream.page_fetches(), 2);
}
