//! Two-stage calendar renderer: a pure layout pass over the validated event
//! list, then a raster backend that turns the draw list into a fixed-size
//! PNG. The stages are independently testable and the backend is swappable.

pub mod layout;
pub mod raster;

use crate::components::sugar_calendar::models::CalendarEvent;
use crate::error::BotResult;
use chrono::DateTime;
use chrono_tz::Tz;

pub use layout::{month_layout, CalendarLayout, Color, DrawOp};

/// Render the month `now` falls in as a 1920x1080 PNG
pub fn render_month(events: &[CalendarEvent], now: DateTime<Tz>) -> BotResult<Vec<u8>> {
    let layout = layout::month_layout(events, now);
    raster::rasterize(&layout)
}
