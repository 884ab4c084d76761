use serde::{Deserialize, Serialize};

/// Identifies exactly one month-grid request against the upstream widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarQuery {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub calendar_id: String,
}

/// One event cell extracted from the scraped month-grid HTML, before
/// its description has been resolved or the record has been validated
#[derive(Debug, Clone, Default)]
pub struct RawEventCell {
    pub title: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub accent_color_raw: Option<String>,
    pub external_event_id: String,
}

/// A validated calendar event, the unit the renderer consumes.
/// `event_object_id` is non-empty and stable across refreshes for the
/// same underlying event; it is only used for keying within one render.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalendarEvent {
    pub title: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub accent_color: Option<String>,
    pub event_object_id: String,
    pub description: Option<String>,
}

/// Outer `{success, data}` wrapper of the month-grid AJAX response
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEnvelope {
    pub success: bool,
    pub data: CalendarEnvelopeData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEnvelopeData {
    /// Month-grid HTML fragment the event cells are extracted from
    pub body: String,
    pub heading: String,
    pub heading_mobile: String,
    pub is_update_display: bool,
    pub control_labels: ControlLabels,
    pub date: EnvelopeDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlLabels {
    pub prev: String,
    pub next: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeDate {
    pub day: String,
    pub month: i64,
    pub year: String,
}

/// Outer wrapper of the event popover AJAX response
#[derive(Debug, Clone, Deserialize)]
pub struct PopoverEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<PopoverData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopoverData {
    #[serde(default)]
    pub description: Option<String>,
}
