//! Extraction of raw event cells from the scraped month-grid HTML fragment.
//!
//! Everything here is best-effort: a missing attribute becomes an empty or
//! absent field and is dealt with by the schema layer, never a panic.

use super::models::RawEventCell;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::warn;

struct CellSelectors {
    cell: Selector,
    title: Selector,
    time: Selector,
}

fn selectors() -> &'static CellSelectors {
    static SELECTORS: OnceLock<CellSelectors> = OnceLock::new();
    SELECTORS.get_or_init(|| CellSelectors {
        cell: Selector::parse(".sugar-calendar-block__event-cell").expect("valid cell selector"),
        title: Selector::parse(".sugar-calendar-block__event-cell__title")
            .expect("valid title selector"),
        time: Selector::parse("time").expect("valid time selector"),
    })
}

/// Extract all event cells from the grid body, in document order
pub fn parse_event_cells(body: &str) -> Vec<RawEventCell> {
    let document = Html::parse_fragment(body);
    let selectors = selectors();
    let mut cells = Vec::new();

    for element in document.select(&selectors.cell) {
        let title = element
            .select(&selectors.title)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        // First <time> node is the start, second the end
        let mut times = element.select(&selectors.time);
        let start_time = times
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .map(str::to_string);
        let end_time = times
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .map(str::to_string);

        let external_event_id = element
            .value()
            .attr("data-eventobjid")
            .unwrap_or_default()
            .to_string();

        let accent_color_raw = element
            .value()
            .attr("data-calendarsinfo")
            .map(str::to_string);

        cells.push(RawEventCell {
            title,
            start_time,
            end_time,
            accent_color_raw,
            external_event_id,
        });
    }

    cells
}

/// Pull the accent color out of the entity-escaped JSON blob carried in the
/// `data-calendarsinfo` attribute. A malformed blob is logged and the color
/// simply omitted; it never fails the event.
pub fn parse_accent_color(raw: &str, title: &str) -> Option<String> {
    let unescaped = raw.replace("&quot;", "\"");

    match serde_json::from_str::<Value>(&unescaped) {
        Ok(info) => info
            .get("primary_event_color")
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(_) => {
            warn!("Failed to parse calendars info for \"{}\"", title);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_html(id: &str, title: &str, extra_attrs: &str) -> String {
        format!(
            r#"<div class="sugar-calendar-block__event-cell" data-eventobjid="{id}" {extra_attrs}>
                <span class="sugar-calendar-block__event-cell__title"> {title} </span>
                <time datetime="2026-03-14T18:00:00-05:00">6:00 pm</time>
                <time datetime="2026-03-14T20:00:00-05:00">8:00 pm</time>
            </div>"#
        )
    }

    #[test]
    fn extracts_cells_in_document_order() {
        let body = format!(
            "<div>{}{}{}</div>",
            cell_html("1", "First", ""),
            cell_html("2", "Second", ""),
            cell_html("3", "Third", "")
        );

        let cells = parse_event_cells(&body);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].title, "First");
        assert_eq!(cells[1].external_event_id, "2");
        assert_eq!(cells[2].title, "Third");
        assert_eq!(
            cells[0].start_time.as_deref(),
            Some("2026-03-14T18:00:00-05:00")
        );
        assert_eq!(
            cells[0].end_time.as_deref(),
            Some("2026-03-14T20:00:00-05:00")
        );
    }

    #[test]
    fn empty_grid_yields_no_cells() {
        let cells = parse_event_cells("<div class=\"sugar-calendar-block__events\"></div>");
        assert!(cells.is_empty());
    }

    #[test]
    fn missing_time_nodes_become_none() {
        let body = r#"<div class="sugar-calendar-block__event-cell" data-eventobjid="7">
            <span class="sugar-calendar-block__event-cell__title">All day</span>
        </div>"#;

        let cells = parse_event_cells(body);
        assert_eq!(cells.len(), 1);
        assert!(cells[0].start_time.is_none());
        assert!(cells[0].end_time.is_none());
    }

    #[test]
    fn accent_color_from_escaped_json() {
        let raw = "{&quot;primary_event_color&quot;:&quot;#3a86ff&quot;}";
        assert_eq!(
            parse_accent_color(raw, "Scrims"),
            Some("#3a86ff".to_string())
        );
    }

    #[test]
    fn malformed_calendars_info_is_dropped() {
        assert_eq!(parse_accent_color("{not json", "Scrims"), None);
    }
}
