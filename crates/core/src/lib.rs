//! Core library for the Moodlight lighting bridge.
//!
//! The analysis side turns byte-scaled spectra into features, beat pulses and
//! a mood label, and packages them as [`ControlFrame`]s. The dispatch side maps
//! each received frame to an eight channel [`ChannelVector`] and fans it out
//! to Art-Net, sACN, KiNET and a JSON fixture protocol over UDP.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod mapping;
pub mod mood;
pub mod protocol;
pub mod timeline;
pub mod transport;

pub use analysis::{
    AnalysisEngine, AnalysisFrame, BeatParams, BeatState, BeatTracker, FeatureSet, SampleFrame,
    FFT_SIZE, FREQUENCY_BINS,
};
pub use audio::SpectrumAnalyser;
pub use config::{AdapterConfig, AdapterSettings, AppConfig, AudioConfig};
pub use dispatch::{DispatchReport, Dispatcher};
pub use error::{MoodlightError, Result};
pub use frame::{ControlFrame, ControlPayload};
pub use mapping::ChannelVector;
pub use mood::{Mood, MoodClassifier, MoodRule, Palette};
pub use protocol::{ArtNetEncoder, Encoder, FixtureJsonEncoder, KinetEncoder, SacnEncoder};
pub use timeline::{PlaybackClock, SampleClock};
pub use transport::{PacketSink, UdpSink};
