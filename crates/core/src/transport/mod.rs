use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
};

use crate::Result;

/// Destination for encoded packets.
pub trait PacketSink: Send {
    fn send(&mut self, payload: &[u8]) -> io::Result<usize>;
}

/// Fire-and-forget UDP sink bound to an ephemeral local port.
///
/// The destination is resolved on first use and cached, so a host that cannot
/// be resolved at start-up surfaces as a per-packet send error instead.
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    target: String,
    resolved: Option<SocketAddr>,
}

impl UdpSink {
    pub fn bind(target: impl Into<String>) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            target: target.into(),
            resolved: None,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn destination(&mut self) -> io::Result<SocketAddr> {
        if let Some(addr) = self.resolved {
            return Ok(addr);
        }
        let addr = self
            .target
            .to_socket_addrs()?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no IPv4 address for {}", self.target),
                )
            })?;
        self.resolved = Some(addr);
        Ok(addr)
    }
}

impl PacketSink for UdpSink {
    fn send(&mut self, payload: &[u8]) -> io::Result<usize> {
        let destination = self.destination()?;
        self.socket.send_to(payload, destination)
    }
}
