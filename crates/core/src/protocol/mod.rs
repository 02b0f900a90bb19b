//! Lighting wire protocols.
//!
//! Every protocol turns a channel vector (and, for the fixture protocol, a
//! mood label) into a single UDP payload:
//!
//! - **Art-Net**: `Art-Net\0` header, OpDmx opcode, universe and length
//!   followed by the channel bytes.
//! - **sACN (E1.31)**: fixed 126-byte root buffer with the channel data
//!   right-aligned at its end.
//! - **KiNET**: eight byte magic/version header followed by the channels.
//! - **Fixture JSON**: `{"type":"frame","mood":..,"channels":[..]}` text.
//!
//! Encoders are pure; sockets live in [`crate::transport`].

mod artnet;
mod fixture;
mod kinet;
mod sacn;

pub use artnet::ArtNetEncoder;
pub use fixture::FixtureJsonEncoder;
pub use kinet::KinetEncoder;
pub use sacn::SacnEncoder;

/// Turns a channel vector into a protocol payload.
pub trait Encoder: Send + Sync {
    /// Short protocol name used in logs.
    fn protocol(&self) -> &'static str;

    fn encode(&self, channels: &[u8], mood: &str) -> Vec<u8>;
}
