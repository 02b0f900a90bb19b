//! Compact sACN (E1.31) frames.
//!
//! Receivers on the stock rig only look at the root vector, the universe and
//! the tail of the buffer, so the packet is a fixed 126-byte zero-filled
//! buffer with the channel data pushed against its end.

use super::Encoder;

const PACKET_LEN: usize = 126;
const ROOT_VECTOR_OFFSET: usize = 40;
const ROOT_VECTOR: u16 = 0x0010;
const UNIVERSE_OFFSET: usize = 113;
/// Channel data ends right before this offset.
const DATA_END: usize = 125;
/// First offset channel data may occupy without touching the universe.
const DATA_START_MIN: usize = UNIVERSE_OFFSET + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SacnEncoder {
    universe: u16,
}

impl Default for SacnEncoder {
    fn default() -> Self {
        Self { universe: 1 }
    }
}

impl SacnEncoder {
    pub fn new(universe: u16) -> Self {
        Self { universe }
    }

    pub fn universe(&self) -> u16 {
        self.universe
    }
}

impl Encoder for SacnEncoder {
    fn protocol(&self) -> &'static str {
        "sacn"
    }

    fn encode(&self, channels: &[u8], _mood: &str) -> Vec<u8> {
        let mut packet = vec![0u8; PACKET_LEN];
        packet[ROOT_VECTOR_OFFSET..ROOT_VECTOR_OFFSET + 2]
            .copy_from_slice(&ROOT_VECTOR.to_be_bytes());
        packet[UNIVERSE_OFFSET..UNIVERSE_OFFSET + 2].copy_from_slice(&self.universe.to_be_bytes());

        let data = &channels[..channels.len().min(DATA_END - DATA_START_MIN)];
        packet[DATA_END - data.len()..DATA_END].copy_from_slice(data);

        packet
    }
}
