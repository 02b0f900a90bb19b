//! Fan-out of channel vectors to every enabled lighting protocol.
//!
//! Each enabled adapter owns a worker thread fed by a small bounded queue.
//! [`Dispatcher::dispatch`] only encodes and enqueues, so a slow or
//! unreachable host backs up its own queue and nothing else. Send failures
//! are logged by the worker and never reach the caller.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};
use tracing::{debug, info, trace, warn};

use crate::{
    protocol::{ArtNetEncoder, Encoder, FixtureJsonEncoder, KinetEncoder, SacnEncoder},
    transport::{PacketSink, UdpSink},
    AdapterConfig, AdapterSettings, ChannelVector, ControlPayload, Result,
};

/// Packets an adapter may have in flight before new ones are dropped.
pub const QUEUE_CAPACITY: usize = 4;

pub const SACN_ADAPTER: &str = "dmx-sacn";
pub const ARTNET_ADAPTER: &str = "artnet";
pub const KINET_ADAPTER: &str = "kinet";
pub const FIXTURE_ADAPTER: &str = "esp32";

/// Outcome of handing one frame to the adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub queued: usize,
    /// Adapters whose queue was full, so this frame was skipped for them.
    pub dropped: usize,
    pub disabled: usize,
}

struct AdapterWorker {
    name: &'static str,
    encoder: Box<dyn Encoder>,
    queue: Option<Sender<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct Dispatcher {
    workers: Vec<AdapterWorker>,
    disabled: Vec<&'static str>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds UDP adapters for every enabled protocol in `settings`.
    pub fn from_settings(settings: &AdapterSettings) -> Result<Self> {
        let mut dispatcher = Self::new();
        dispatcher.add_udp(
            SACN_ADAPTER,
            &settings.dmx,
            SacnEncoder::new(settings.dmx.universe.unwrap_or(1)),
        )?;
        dispatcher.add_udp(
            ARTNET_ADAPTER,
            &settings.artnet,
            ArtNetEncoder::new(settings.artnet.universe.unwrap_or(0)),
        )?;
        dispatcher.add_udp(KINET_ADAPTER, &settings.kinet, KinetEncoder)?;
        dispatcher.add_udp(FIXTURE_ADAPTER, &settings.esp32, FixtureJsonEncoder)?;
        Ok(dispatcher)
    }

    fn add_udp<E>(&mut self, name: &'static str, config: &AdapterConfig, encoder: E) -> Result<()>
    where
        E: Encoder + 'static,
    {
        if !config.enabled {
            self.add_disabled(name);
            return Ok(());
        }
        let sink = UdpSink::bind(config.target())?;
        info!(
            adapter = name,
            protocol = encoder.protocol(),
            target = %config.target(),
            "adapter enabled"
        );
        self.add_adapter(name, encoder, sink)
    }

    /// Registers an adapter and starts its worker thread.
    pub fn add_adapter<E, S>(&mut self, name: &'static str, encoder: E, sink: S) -> Result<()>
    where
        E: Encoder + 'static,
        S: PacketSink + 'static,
    {
        let (queue, packets) = bounded::<Vec<u8>>(QUEUE_CAPACITY);
        let mut sink = sink;
        let handle = thread::Builder::new()
            .name(format!("dispatch-{name}"))
            .spawn(move || {
                for packet in packets.iter() {
                    match sink.send(&packet) {
                        Ok(sent) => trace!(adapter = name, bytes = sent, "packet sent"),
                        Err(err) => warn!(adapter = name, error = %err, "send failed"),
                    }
                }
                debug!(adapter = name, "worker stopped");
            })?;

        self.workers.push(AdapterWorker {
            name,
            encoder: Box::new(encoder),
            queue: Some(queue),
            handle: Some(handle),
        });
        Ok(())
    }

    /// Records an adapter that is configured off. Dispatching to it is a no-op.
    pub fn add_disabled(&mut self, name: &'static str) {
        debug!(adapter = name, "adapter disabled");
        self.disabled.push(name);
    }

    /// Names of the adapters that will receive packets.
    pub fn enabled(&self) -> Vec<&'static str> {
        self.workers.iter().map(|worker| worker.name).collect()
    }

    /// Encodes `channels` once per enabled adapter and enqueues the payloads.
    /// Never blocks on the network.
    pub fn dispatch(&self, channels: &ChannelVector, mood: &str) -> DispatchReport {
        let mut report = DispatchReport {
            disabled: self.disabled.len(),
            ..Default::default()
        };

        for worker in &self.workers {
            let Some(queue) = &worker.queue else {
                continue;
            };
            let packet = worker.encoder.encode(channels, mood);
            match queue.try_send(packet) {
                Ok(()) => report.queued += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(adapter = worker.name, "queue full, dropping packet");
                    report.dropped += 1;
                }
                Err(TrySendError::Disconnected(_)) => {
                    warn!(adapter = worker.name, "worker is gone, dropping packet");
                    report.dropped += 1;
                }
            }
        }

        report
    }

    /// Maps a received control payload and dispatches it.
    pub fn dispatch_payload(&self, payload: &ControlPayload) -> DispatchReport {
        let channels = ChannelVector::from_payload(payload);
        self.dispatch(&channels, payload.mood_label())
    }

    /// Closes every queue and waits for the workers to drain them.
    pub fn shutdown(&mut self) {
        for worker in &mut self.workers {
            worker.queue.take();
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    warn!(adapter = worker.name, "worker panicked");
                }
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("enabled", &self.enabled())
            .field("disabled", &self.disabled)
            .finish()
    }
}
