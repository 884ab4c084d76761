//! Structural contracts for untrusted upstream data.
//!
//! Validation is fail-hard at the envelope granularity (without a valid grid
//! body no events can be extracted at all) and fail-soft per event (a record
//! that does not conform is dropped, the batch continues). Only structure is
//! checked here; upstream ordering of start/end times is taken as-is.

use super::models::{CalendarEnvelope, CalendarEvent, RawEventCell};
use serde_json::Value;
use thiserror::Error;

/// Reason a piece of upstream data failed structural validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("envelope does not match expected shape: {0}")]
    Envelope(String),

    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),
}

/// Validate the outer `{success, data}` JSON wrapper of a month-grid
/// response and deserialize it into a typed envelope
pub fn validate_envelope(value: &Value) -> Result<CalendarEnvelope, ValidationError> {
    serde_json::from_value(value.clone()).map_err(|e| ValidationError::Envelope(e.to_string()))
}

/// Validate one assembled event record.
///
/// Structural checks only: the event id must be present because it keys the
/// event within a render. A missing description or accent color is fine, and
/// start/end times are optional by contract.
pub fn validate_event(
    cell: RawEventCell,
    description: Option<String>,
    accent_color: Option<String>,
) -> Result<CalendarEvent, ValidationError> {
    if cell.external_event_id.is_empty() {
        return Err(ValidationError::EmptyField("event_object_id"));
    }

    Ok(CalendarEvent {
        title: cell.title,
        start_time: cell.start_time,
        end_time: cell.end_time,
        accent_color,
        event_object_id: cell.external_event_id,
        description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope_json(success: bool, body: &str) -> Value {
        json!({
            "success": success,
            "data": {
                "body": body,
                "heading": "March 2026",
                "heading_mobile": "Mar 2026",
                "is_update_display": false,
                "control_labels": { "prev": "Previous", "next": "Next" },
                "date": { "day": "14", "month": 3, "year": "2026" }
            }
        })
    }

    #[test]
    fn well_formed_envelope_validates() {
        let envelope = validate_envelope(&envelope_json(true, "<div></div>")).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.data.body, "<div></div>");
        assert_eq!(envelope.data.date.month, 3);
    }

    #[test]
    fn envelope_missing_body_is_rejected() {
        let mut value = envelope_json(true, "");
        value["data"].as_object_mut().unwrap().remove("body");
        assert!(validate_envelope(&value).is_err());
    }

    #[test]
    fn envelope_with_wrong_types_is_rejected() {
        let mut value = envelope_json(true, "<div></div>");
        value["success"] = json!("yes");
        assert!(validate_envelope(&value).is_err());
    }

    #[test]
    fn event_without_id_is_rejected() {
        let cell = RawEventCell {
            title: "Scrims".to_string(),
            ..Default::default()
        };
        assert!(validate_event(cell, None, None).is_err());
    }

    #[test]
    fn event_without_description_or_color_is_valid() {
        let cell = RawEventCell {
            title: "Scrims".to_string(),
            external_event_id: "123".to_string(),
            ..Default::default()
        };
        let event = validate_event(cell, None, None).unwrap();
        assert_eq!(event.event_object_id, "123");
        assert!(event.description.is_none());
        assert!(event.accent_color.is_none());
    }
}
