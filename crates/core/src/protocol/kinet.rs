use super::Encoder;

/// KiNET v1 DMXOUT magic, version and type.
const HEADER: [u8; 8] = [0x04, 0x01, 0xDC, 0x4A, 0x01, 0x00, 0x08, 0x01];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KinetEncoder;

impl Encoder for KinetEncoder {
    fn protocol(&self) -> &'static str {
        "kinet"
    }

    fn encode(&self, channels: &[u8], _mood: &str) -> Vec<u8> {
        let mut packet = Vec::with_capacity(HEADER.len() + channels.len());
        packet.extend_from_slice(&HEADER);
        packet.extend_from_slice(channels);
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_then_channels() {
        let packet = KinetEncoder.encode(&[9, 8, 7], "driving");
        assert_eq!(packet, vec![0x04, 0x01, 0xDC, 0x4A, 0x01, 0x00, 0x08, 0x01, 9, 8, 7]);
    }
}
