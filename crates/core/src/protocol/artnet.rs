//! Art-Net OpDmx packets.

use super::Encoder;

const HEADER: &[u8; 8] = b"Art-Net\0";
const OP_DMX: u16 = 0x0050;
const PROTOCOL_VERSION: u16 = 14;
const HEADER_LEN: usize = 18;
const MAX_CHANNELS: usize = 512;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArtNetEncoder {
    universe: u16,
}

impl ArtNetEncoder {
    pub fn new(universe: u16) -> Self {
        Self { universe }
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }
}

impl Encoder for ArtNetEncoder {
    fn protocol(&self) -> &'static str {
        "artnet"
    }

    fn encode(&self, channels: &[u8], _mood: &str) -> Vec<u8> {
        let data = &channels[..channels.len().min(MAX_CHANNELS)];
        let mut packet = Vec::with_capacity(HEADER_LEN + data.len());

        packet.extend_from_slice(HEADER);
        packet.extend_from_slice(&OP_DMX.to_be_bytes());
        packet.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        // Sequence is disabled, physical port is always zero.
        packet.push(0);
        packet.push(0);
        packet.extend_from_slice(&self.universe.to_le_bytes());
        packet.extend_from_slice(&(data.len() as u16).to_be_bytes());
        packet.extend_from_slice(data);

        packet
    }
}
