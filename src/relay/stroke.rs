//! Wire format for drawing strokes.
//!
//! Strokes are relayed verbatim between the drawer and the rest of the
//! room. The server persists them as opaque payloads and never
//! interprets coordinates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeKind {
    /// Pen down at a point.
    Start,
    /// Line segment to a point.
    Draw,
    /// Pen up.
    End,
    /// Wipe the whole canvas.
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeEvent {
    #[serde(rename = "type")]
    pub kind: StrokeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl StrokeEvent {
    pub fn clear() -> Self {
        Self {
            kind: StrokeKind::Clear,
            x: None,
            y: None,
            color: None,
            size: None,
            tool: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stroke_round_trips_with_type_tag() {
        let stroke = StrokeEvent {
            kind: StrokeKind::Start,
            x: Some(120.5),
            y: Some(44.0),
            color: Some("#7c3aed".into()),
            size: Some(4.0),
            tool: Some("pen".into()),
        };
        let json = serde_json::to_value(&stroke).expect("serialize");
        assert_eq!(json["type"], "start");
        assert_eq!(json["x"], 120.5);
        let back: StrokeEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, stroke);
    }

    #[test]
    fn clear_stroke_omits_point_fields() {
        let json = serde_json::to_value(StrokeEvent::clear()).expect("serialize");
        assert_eq!(json, serde_json::json!({ "type": "clear" }));
    }
}
