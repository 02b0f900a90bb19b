//! JSON text frames for networked fixtures (ESP32 controllers and the like).

use serde::Serialize;

use super::Encoder;

#[derive(Serialize)]
struct FixtureFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    mood: &'a str,
    channels: &'a [u8],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixtureJsonEncoder;

impl Encoder for FixtureJsonEncoder {
    fn protocol(&self) -> &'static str {
        "fixture-json"
    }

    fn encode(&self, channels: &[u8], mood: &str) -> Vec<u8> {
        let frame = FixtureFrame {
            kind: "frame",
            mood,
            channels,
        };
        serde_json::to_vec(&frame).unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to serialise fixture frame");
            Vec::new()
        })
    }
}
