//! Pure layout pass: validated events in, a flat draw list out.
//!
//! No I/O happens here. The layout for a given event list and "now" instant
//! is fully deterministic, which is what makes the renderer testable without
//! decoding pixels.

use crate::components::sugar_calendar::models::CalendarEvent;
use crate::utils::time::{days_in_month, first_of_month, format_clock, zoned_instant};
use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use std::collections::HashSet;

/// Output canvas dimensions, fixed by contract
pub const CANVAS_WIDTH: u32 = 1920;
pub const CANVAS_HEIGHT: u32 = 1080;

const HEADER_HEIGHT: i32 = 72;
const DAY_ROW_HEIGHT: i32 = 48;
const GRID_TOP: i32 = HEADER_HEIGHT + DAY_ROW_HEIGHT;
const GRID_HEIGHT: i32 = CANVAS_HEIGHT as i32 - GRID_TOP;

const CARD_HEIGHT: i32 = 50;
const CARD_GAP: i32 = 6;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Solid RGB color used throughout the draw list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` hex string
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#')?;
        // Length is in bytes; slicing below needs all-ASCII input so a
        // multi-byte character cannot straddle a pair boundary
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }

    /// Blend `amount` of self over `base`, e.g. a faint card tint
    pub fn mix(self, base: Color, amount: f32) -> Color {
        let blend = |a: u8, b: u8| -> u8 {
            (f32::from(a) * amount + f32::from(b) * (1.0 - amount)).round() as u8
        };
        Color {
            r: blend(self.r, base.r),
            g: blend(self.g, base.g),
            b: blend(self.b, base.b),
        }
    }
}

pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
pub const HEADER_BG: Color = Color::rgb(0xef, 0x44, 0x44);
pub const DAY_ROW_BG: Color = Color::rgb(0xf5, 0xf5, 0xf5);
pub const CELL_BORDER: Color = Color::rgb(0xe5, 0xe5, 0xe5);
pub const TEXT_COLOR: Color = Color::rgb(0x17, 0x17, 0x17);
pub const MUTED_TEXT: Color = Color::rgb(0x52, 0x52, 0x52);

/// Fallback accent when an event carries none
pub const DEFAULT_ACCENT: Color = Color::rgb(0xff, 0x7b, 0x00);

/// One drawing instruction for the raster backend
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    },
    Border {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: Color,
    },
    Text {
        x: i32,
        y: i32,
        size: f32,
        color: Color,
        bold: bool,
        content: String,
    },
}

/// Flat draw list for one month view
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarLayout {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

/// Events whose zone-converted start date falls on `date`, in input order.
/// Events without a start time are excluded; they cannot be placed on the
/// grid.
pub fn bucket_events<'a>(
    events: &'a [CalendarEvent],
    date: NaiveDate,
    tz: Tz,
) -> Vec<&'a CalendarEvent> {
    events
        .iter()
        .filter(|event| {
            event
                .start_time
                .as_deref()
                .and_then(|start| zoned_instant(start, tz))
                .is_some_and(|start| start.date_naive() == date)
        })
        .collect()
}

/// Compute the full draw list for the month `now` falls in
pub fn month_layout(events: &[CalendarEvent], now: DateTime<Tz>) -> CalendarLayout {
    let tz = now.timezone();
    let month_start = first_of_month(&now);
    let day_count = days_in_month(month_start.year(), month_start.month());
    let leading_blanks = month_start.weekday().num_days_from_sunday() as i32;
    let week_count = (leading_blanks + day_count as i32 + 6) / 7;

    // Duplicate event ids within a single render collapse to the first
    // occurrence
    let mut seen = HashSet::new();
    let events: Vec<CalendarEvent> = events
        .iter()
        .filter(|event| seen.insert(event.event_object_id.clone()))
        .cloned()
        .collect();

    let mut ops = Vec::new();

    // Month banner
    ops.push(DrawOp::Rect {
        x: 0,
        y: 0,
        width: CANVAS_WIDTH,
        height: HEADER_HEIGHT as u32,
        color: HEADER_BG,
    });
    let heading = now.format("%B %Y").to_string();
    ops.push(DrawOp::Text {
        x: centered_x(0, CANVAS_WIDTH as i32, &heading, 44.0),
        y: 14,
        size: 44.0,
        color: WHITE,
        bold: true,
        content: heading,
    });

    // Day-name row
    ops.push(DrawOp::Rect {
        x: 0,
        y: HEADER_HEIGHT,
        width: CANVAS_WIDTH,
        height: DAY_ROW_HEIGHT as u32,
        color: DAY_ROW_BG,
    });
    for (index, name) in DAY_NAMES.iter().enumerate() {
        let left = column_x(index as i32);
        let right = column_x(index as i32 + 1);
        ops.push(DrawOp::Text {
            x: centered_x(left, right - left, name, 20.0),
            y: HEADER_HEIGHT + 13,
            size: 20.0,
            color: TEXT_COLOR,
            bold: true,
            content: (*name).to_string(),
        });
    }

    // Day grid, leading and trailing blanks included
    for slot in 0..(week_count * 7) {
        let week = slot / 7;
        let column = slot % 7;

        let left = column_x(column);
        let top = row_y(week, week_count);
        let width = (column_x(column + 1) - left) as u32;
        let height = (row_y(week + 1, week_count) - top) as u32;

        ops.push(DrawOp::Rect {
            x: left,
            y: top,
            width,
            height,
            color: WHITE,
        });
        ops.push(DrawOp::Border {
            x: left,
            y: top,
            width,
            height,
            color: CELL_BORDER,
        });

        let day = slot - leading_blanks + 1;
        if day < 1 || day > day_count as i32 {
            continue;
        }

        ops.push(DrawOp::Text {
            x: left + 12,
            y: top + 8,
            size: 22.0,
            color: TEXT_COLOR,
            bold: false,
            content: day.to_string(),
        });

        let Some(date) =
            NaiveDate::from_ymd_opt(month_start.year(), month_start.month(), day as u32)
        else {
            continue;
        };

        let mut card_y = top + 44;
        let cell_bottom = top + height as i32 - 8;
        for event in bucket_events(&events, date, tz) {
            if card_y + CARD_HEIGHT > cell_bottom {
                // Cell is full; remaining events would draw over the border
                break;
            }
            push_event_card(&mut ops, event, left + 8, card_y, width as i32 - 16, tz);
            card_y += CARD_HEIGHT + CARD_GAP;
        }
    }

    CalendarLayout {
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
        ops,
    }
}

fn push_event_card(
    ops: &mut Vec<DrawOp>,
    event: &CalendarEvent,
    x: i32,
    y: i32,
    width: i32,
    tz: Tz,
) {
    let accent = event
        .accent_color
        .as_deref()
        .and_then(Color::from_hex)
        .unwrap_or(DEFAULT_ACCENT);

    ops.push(DrawOp::Rect {
        x,
        y,
        width: width as u32,
        height: CARD_HEIGHT as u32,
        color: accent.mix(WHITE, 0.12),
    });
    // Accent bar along the left edge
    ops.push(DrawOp::Rect {
        x,
        y,
        width: 4,
        height: CARD_HEIGHT as u32,
        color: accent,
    });

    // Clock column on the right, title gets the rest
    let title_width = width - 110;
    ops.push(DrawOp::Text {
        x: x + 12,
        y: y + 7,
        size: 16.0,
        color: TEXT_COLOR,
        bold: true,
        content: truncate_to_width(&event.title, title_width, 16.0),
    });

    let mut clock_y = y + 7;
    for instant in [event.start_time.as_deref(), event.end_time.as_deref()]
        .into_iter()
        .flatten()
    {
        if let Some(zoned) = zoned_instant(instant, tz) {
            let clock = format_clock(&zoned);
            ops.push(DrawOp::Text {
                x: x + width - 8 - approx_text_width(&clock, 12.0),
                y: clock_y,
                size: 12.0,
                color: MUTED_TEXT,
                bold: false,
                content: clock,
            });
            clock_y += 15;
        }
    }

    if let Some(description) = event.description.as_deref() {
        let description = description.trim();
        if !description.is_empty() {
            ops.push(DrawOp::Text {
                x: x + 12,
                y: y + 30,
                size: 12.0,
                color: MUTED_TEXT,
                bold: false,
                content: truncate_to_width(description, width - 24, 12.0),
            });
        }
    }
}

fn column_x(column: i32) -> i32 {
    column * CANVAS_WIDTH as i32 / 7
}

fn row_y(week: i32, week_count: i32) -> i32 {
    GRID_TOP + week * GRID_HEIGHT / week_count
}

/// Rough width estimate for proportional text; only used for centering and
/// truncation, so an average advance per glyph is good enough
fn approx_text_width(text: &str, size: f32) -> i32 {
    (text.chars().count() as f32 * size * 0.52).round() as i32
}

fn centered_x(left: i32, width: i32, text: &str, size: f32) -> i32 {
    left + (width - approx_text_width(text, size)) / 2
}

/// Cut text to the given pixel budget, appending an ellipsis when trimmed
fn truncate_to_width(text: &str, width: i32, size: f32) -> String {
    let budget = (width as f32 / (size * 0.52)).floor() as usize;
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let kept: String = text.chars().take(budget.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;

    fn event(id: &str, start: Option<&str>) -> CalendarEvent {
        CalendarEvent {
            title: format!("Event {}", id),
            start_time: start.map(str::to_string),
            end_time: None,
            accent_color: None,
            event_object_id: id.to_string(),
            description: None,
        }
    }

    #[test]
    fn bucket_uses_zone_converted_date() {
        // 23:30 CDT on March 31 stays on March 31 in Chicago
        let local = event("1", Some("2024-03-31T23:30:00-05:00"));
        // 04:30 UTC on April 1 is still March 31 evening in Chicago
        let utc_evening = event("2", Some("2024-04-01T04:30:00+00:00"));
        let events = vec![local, utc_evening];

        let march_31 = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let april_1 = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

        let in_march = bucket_events(&events, march_31, Chicago);
        assert_eq!(in_march.len(), 2);
        assert!(bucket_events(&events, april_1, Chicago).is_empty());
    }

    #[test]
    fn events_without_start_are_not_bucketed() {
        let events = vec![event("1", None)];
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert!(bucket_events(&events, date, Chicago).is_empty());
    }

    #[test]
    fn layout_is_deterministic() {
        let now = Chicago.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let events = vec![
            event("1", Some("2026-03-14T18:00:00-05:00")),
            event("2", Some("2026-03-20T10:00:00-05:00")),
        ];

        assert_eq!(month_layout(&events, now), month_layout(&events, now));
    }

    #[test]
    fn duplicate_event_ids_collapse() {
        let now = Chicago.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let first = event("1", Some("2026-03-14T18:00:00-05:00"));
        let duplicate = event("1", Some("2026-03-14T18:00:00-05:00"));

        let single = month_layout(&[first.clone()], now);
        let doubled = month_layout(&[first, duplicate], now);
        assert_eq!(single, doubled);
    }

    #[test]
    fn grid_spans_exactly_the_weeks_of_the_month() {
        // March 2026 starts on a Sunday and has 31 days: 5 weeks
        let now = Chicago.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let layout = month_layout(&[], now);

        let cell_borders = layout
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Border { .. }))
            .count();
        assert_eq!(cell_borders, 35);
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(Color::from_hex("#ff7b00"), Some(DEFAULT_ACCENT));
        assert_eq!(Color::from_hex("ff7b00"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn multibyte_hex_colors_are_rejected_not_panicked() {
        // 6 bytes, valid hex prefix, with byte index 4 inside the '€'
        assert_eq!(Color::from_hex("#ab€x"), None);
        assert_eq!(Color::from_hex("#ä€a"), None);
        assert_eq!(Color::from_hex("#€€"), None);
    }
}
