use std::ops::Deref;

use serde::Serialize;

use crate::{ControlFrame, ControlPayload};

/// Number of channels in a lighting frame.
pub const CHANNEL_COUNT: usize = 8;

/// Filler channels appended after RGB and strobe for fixture compatibility.
const FILLER_CHANNELS: [u8; 4] = [255, 128, 64, 0];

/// Beat level above which the strobe channel is driven fully on.
const STROBE_THRESHOLD: f32 = 0.65;

/// `[R, G, B, strobe, 255, 128, 64, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChannelVector([u8; CHANNEL_COUNT]);

impl ChannelVector {
    pub fn new(channels: [u8; CHANNEL_COUNT]) -> Self {
        Self(channels)
    }

    /// Maps a received payload. Missing or non-finite fields read as zero,
    /// except warmth which reads as 0.5.
    pub fn from_payload(payload: &ControlPayload) -> Self {
        let hue = unit(payload.hue, 0.0);
        let intensity = unit(payload.intensity, 0.0);
        let beat = unit(payload.beat, 0.0);
        let warmth = unit(payload.warmth, 0.5);

        let red = to_byte(255.0 * intensity * (0.5 + warmth * 0.5));
        let green = to_byte(255.0 * intensity * (1.0 - (hue - 0.35).abs()));
        let blue = to_byte(255.0 * intensity * (0.5 + (1.0 - warmth) * 0.5));
        let strobe = if beat > STROBE_THRESHOLD {
            255
        } else {
            to_byte(80.0 * beat)
        };

        let [a, b, c, d] = FILLER_CHANNELS;
        Self([red, green, blue, strobe, a, b, c, d])
    }

    pub fn from_frame(frame: &ControlFrame) -> Self {
        Self::from_payload(&frame.payload())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for ChannelVector {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

fn unit(value: Option<f32>, default: f32) -> f32 {
    match value {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => default,
    }
}

fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(intensity: f32, beat: f32, hue: f32, warmth: f32) -> ControlPayload {
        ControlPayload {
            mood: None,
            intensity: Some(intensity),
            beat: Some(beat),
            hue: Some(hue),
            warmth: Some(warmth),
        }
    }

    #[test]
    fn maps_full_intensity() {
        let channels = ChannelVector::from_payload(&payload(1.0, 1.0, 0.35, 1.0));
        assert_eq!(channels.as_bytes(), &[255, 255, 128, 255, 255, 128, 64, 0]);
    }

    #[test]
    fn dark_frame_keeps_filler_channels() {
        let channels = ChannelVector::from_payload(&payload(0.0, 0.0, 0.0, 0.0));
        assert_eq!(channels.as_bytes(), &[0, 0, 0, 0, 255, 128, 64, 0]);
    }

    #[test]
    fn strobe_scales_below_threshold() {
        assert_eq!(ChannelVector::from_payload(&payload(0.5, 0.5, 0.0, 0.5))[3], 40);
        assert_eq!(ChannelVector::from_payload(&payload(0.5, 0.65, 0.0, 0.5))[3], 52);
        assert_eq!(ChannelVector::from_payload(&payload(0.5, 0.66, 0.0, 0.5))[3], 255);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let channels = ChannelVector::from_payload(&ControlPayload {
            intensity: Some(1.0),
            ..Default::default()
        });
        assert_eq!(channels.as_bytes(), &[191, 166, 191, 0, 255, 128, 64, 0]);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        for value in [-3.0, 0.0, 1.0, 7.5, f32::NAN, f32::INFINITY] {
            let channels = ChannelVector::from_payload(&payload(value, value, value, value));
            assert_eq!(channels.len(), CHANNEL_COUNT);
            assert_eq!(&channels[4..], &[255, 128, 64, 0]);
        }
        let hot = ChannelVector::from_payload(&payload(9.0, 9.0, 9.0, 9.0));
        assert_eq!(hot, ChannelVector::from_payload(&payload(1.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn maps_built_frames() {
        let frame = ControlFrame {
            mood: crate::Mood::Uplifting,
            intensity: 0.5,
            beat: 0.2,
            hue: 170.0 / 360.0,
            warmth: 0.5,
        };
        let channels = ChannelVector::from_frame(&frame);
        assert_eq!(channels[0], 96);
        assert_eq!(channels[2], 96);
        assert_eq!(channels[3], 16);
    }
}
