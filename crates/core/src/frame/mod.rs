//! Control frames exchanged between the analysis and dispatch sides.

use serde::{Deserialize, Serialize};

use crate::{FeatureSet, Mood, MoodlightError, Result};

/// Type tag carried by every control message.
pub const CONTROL_FRAME_TYPE: &str = "control_frame";

/// Mood forwarded to fixtures when an inbound frame carries none.
pub const UNKNOWN_MOOD: &str = "neutral";

/// Weight of the beat pulse in the output intensity.
const BEAT_INTENSITY_GAIN: f32 = 0.35;

/// Perceptual summary of one analysis tick. Never mutated once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlFrame {
    pub mood: Mood,
    pub intensity: f32,
    pub beat: f32,
    pub hue: f32,
    pub warmth: f32,
}

impl ControlFrame {
    pub fn build(mood: Mood, features: &FeatureSet, pulse: f32) -> Self {
        Self {
            mood,
            intensity: (features.energy + BEAT_INTENSITY_GAIN * pulse).clamp(0.0, 1.0),
            beat: pulse.clamp(0.0, 1.0),
            hue: mood.palette().hue(),
            warmth: features.warmth.clamp(0.0, 1.0),
        }
    }

    /// Serialises the frame inside its `control_frame` envelope.
    pub fn to_message(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            #[serde(rename = "type")]
            kind: &'static str,
            payload: &'a ControlFrame,
        }

        Ok(serde_json::to_string(&Envelope {
            kind: CONTROL_FRAME_TYPE,
            payload: self,
        })?)
    }

    /// The frame as the dispatch side sees it after crossing the channel.
    pub fn payload(&self) -> ControlPayload {
        ControlPayload {
            mood: Some(self.mood.as_str().to_string()),
            intensity: Some(self.intensity),
            beat: Some(self.beat),
            hue: Some(self.hue),
            warmth: Some(self.warmth),
        }
    }
}

/// Leniently parsed control frame payload. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPayload {
    pub mood: Option<String>,
    pub intensity: Option<f32>,
    pub beat: Option<f32>,
    pub hue: Option<f32>,
    pub warmth: Option<f32>,
}

impl ControlPayload {
    /// Parses a text message, rejecting foreign type tags and missing payloads.
    pub fn parse_message(text: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Inbound {
            #[serde(rename = "type")]
            kind: Option<String>,
            payload: Option<ControlPayload>,
        }

        let inbound: Inbound = serde_json::from_str(text)
            .map_err(|err| MoodlightError::MalformedFrame(err.to_string()))?;

        match inbound.kind.as_deref() {
            Some(CONTROL_FRAME_TYPE) => {}
            Some(other) => {
                return Err(MoodlightError::MalformedFrame(format!(
                    "unexpected message type `{other}`"
                )))
            }
            None => return Err(MoodlightError::MalformedFrame("missing message type".into())),
        }

        inbound
            .payload
            .ok_or_else(|| MoodlightError::MalformedFrame("missing payload".into()))
    }

    /// Mood label to forward to fixtures.
    pub fn mood_label(&self) -> &str {
        self.mood.as_deref().unwrap_or(UNKNOWN_MOOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_clamped_intensity() {
        let features = FeatureSet {
            energy: 0.9,
            warmth: 0.25,
            ..Default::default()
        };
        let frame = ControlFrame::build(Mood::Driving, &features, 0.8);
        assert_eq!(frame.intensity, 1.0);
        assert_eq!(frame.beat, 0.8);
        assert!((frame.hue - 14.0 / 360.0).abs() < 1e-6);
        assert_eq!(frame.warmth, 0.25);

        let calm = ControlFrame::build(Mood::Ambient, &FeatureSet::default(), 0.5);
        assert!((calm.intensity - 0.175).abs() < 1e-6);
    }

    #[test]
    fn message_round_trips_through_parser() {
        let frame = ControlFrame::build(Mood::Tense, &FeatureSet::default(), 0.0);
        let text = frame.to_message().unwrap();
        assert!(text.starts_with(r#"{"type":"control_frame","payload":{"mood":"tense""#));

        let payload = ControlPayload::parse_message(&text).unwrap();
        assert_eq!(payload, frame.payload());
    }

    #[test]
    fn rejects_wrong_type_and_missing_payload() {
        let wrong = ControlPayload::parse_message(r#"{"type":"hello","payload":{}}"#);
        assert!(matches!(wrong, Err(MoodlightError::MalformedFrame(_))));

        let missing = ControlPayload::parse_message(r#"{"type":"control_frame"}"#);
        assert!(matches!(missing, Err(MoodlightError::MalformedFrame(_))));

        let garbage = ControlPayload::parse_message("not json");
        assert!(matches!(garbage, Err(MoodlightError::MalformedFrame(_))));
    }

    #[test]
    fn tolerates_missing_fields() {
        let payload =
            ControlPayload::parse_message(r#"{"type":"control_frame","payload":{"beat":0.5}}"#)
                .unwrap();
        assert_eq!(payload.beat, Some(0.5));
        assert_eq!(payload.intensity, None);
        assert_eq!(payload.mood_label(), "neutral");
    }
}
