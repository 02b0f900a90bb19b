//! Perceptual feature extraction and per-stream analysis state.

mod beat;

use serde::{Deserialize, Serialize};

pub use beat::{BeatParams, BeatState, BeatTracker, DEFAULT_BPM, HISTORY_CAPACITY};

use crate::{ControlFrame, Mood, MoodClassifier};

/// Transform window the band boundaries below are tuned for.
pub const FFT_SIZE: usize = 2048;

/// Number of frequency bins in a [`SampleFrame`].
pub const FREQUENCY_BINS: usize = FFT_SIZE / 2;

const LOW_BAND: (usize, usize) = (0, 24);
const MID_BAND: (usize, usize) = (24, 120);
const HIGH_BAND: (usize, usize) = (120, 360);

/// Floor used for every ratio denominator.
const EPSILON: f32 = 0.001;

/// Byte-scaled frequency magnitudes and waveform for a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFrame {
    pub frequency: Vec<u8>,
    pub time_domain: Vec<u8>,
}

impl SampleFrame {
    pub fn new(frequency: Vec<u8>, time_domain: Vec<u8>) -> Self {
        Self {
            frequency,
            time_domain,
        }
    }

    /// A frame of pure silence: zero magnitudes, centred waveform.
    pub fn silent() -> Self {
        Self {
            frequency: vec![0; FREQUENCY_BINS],
            time_domain: vec![128; FFT_SIZE],
        }
    }

    /// Mean magnitude over `[start, end)` normalised to `[0, 1]`. Bins past
    /// the end of the spectrum read as zero.
    pub fn band_energy(&self, start: usize, end: usize) -> f32 {
        let sum: u32 = (start..end)
            .map(|bin| self.frequency.get(bin).copied().unwrap_or(0) as u32)
            .sum();
        sum as f32 / end.saturating_sub(start).max(1) as f32 / 255.0
    }
}

/// Scalar features derived from one [`SampleFrame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
    pub energy: f32,
    pub centroid: f32,
    pub warmth: f32,
}

impl FeatureSet {
    pub fn extract(frame: &SampleFrame) -> Self {
        let low = frame.band_energy(LOW_BAND.0, LOW_BAND.1);
        let mid = frame.band_energy(MID_BAND.0, MID_BAND.1);
        let high = frame.band_energy(HIGH_BAND.0, HIGH_BAND.1);
        Self::from_bands(low, mid, high)
    }

    pub fn from_bands(low: f32, mid: f32, high: f32) -> Self {
        Self {
            low,
            mid,
            high,
            energy: (low * 1.25 + mid + high * 0.8) / 3.0,
            centroid: (mid * 0.5 + high) / (low + mid + high).max(EPSILON),
            warmth: low / (low + high).max(EPSILON),
        }
    }
}

/// Everything the analysis side knows after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisFrame {
    pub time_ms: f64,
    pub features: FeatureSet,
    pub mood: Mood,
    /// Beat pulse after this tick's decay.
    pub beat: f32,
    pub bpm: u32,
    pub onset: bool,
}

impl AnalysisFrame {
    pub fn control_frame(&self) -> ControlFrame {
        ControlFrame::build(self.mood, &self.features, self.beat)
    }
}

/// Per-stream analysis pipeline: features, beat tracking and mood.
///
/// The engine is synchronous and takes the tick timestamp from the caller so
/// the same input always produces the same frames.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    beat: BeatState,
    tracker: BeatTracker,
    classifier: MoodClassifier,
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beat_state(&self) -> &BeatState {
        &self.beat
    }

    /// Runs one tick over `frame`, captured at `now_ms`.
    pub fn process(&mut self, frame: &SampleFrame, now_ms: f64) -> AnalysisFrame {
        let features = FeatureSet::extract(frame);
        let onset = self.tracker.tick(&mut self.beat, features.energy, now_ms);
        let bpm = self.beat.bpm_estimate();
        let mood = self.classifier.classify(&features, bpm);

        AnalysisFrame {
            time_ms: now_ms,
            features,
            mood,
            beat: self.beat.pulse(),
            bpm,
            onset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_bands(low: u8, mid: u8, high: u8) -> SampleFrame {
        let mut frame = SampleFrame::silent();
        for (bin, value) in frame.frequency.iter_mut().enumerate() {
            *value = match bin {
                0..=23 => low,
                24..=119 => mid,
                120..=359 => high,
                _ => 0,
            };
        }
        frame
    }

    #[test]
    fn silent_frame_yields_finite_zero_features() {
        let features = FeatureSet::extract(&SampleFrame::silent());
        assert_eq!(features, FeatureSet::default());
        assert!(features.centroid.is_finite());
        assert!(features.warmth.is_finite());
    }

    #[test]
    fn computes_weighted_energy_and_ratios() {
        let features = FeatureSet::extract(&frame_with_bands(255, 51, 102));
        assert!((features.low - 1.0).abs() < 1e-6);
        assert!((features.mid - 0.2).abs() < 1e-6);
        assert!((features.high - 0.4).abs() < 1e-6);
        assert!((features.energy - (1.25 + 0.2 + 0.32) / 3.0).abs() < 1e-6);
        assert!((features.centroid - 0.5 / 1.6).abs() < 1e-6);
        assert!((features.warmth - 1.0 / 1.4).abs() < 1e-6);
    }

    #[test]
    fn short_spectrum_reads_missing_bins_as_zero() {
        let frame = SampleFrame::new(vec![255; 200], vec![128; 16]);
        let features = FeatureSet::extract(&frame);
        assert!((features.low - 1.0).abs() < 1e-6);
        assert!((features.high - 80.0 / 240.0).abs() < 1e-6);
    }

    #[test]
    fn engine_reports_onset_and_tempo() {
        let mut engine = AnalysisEngine::new();
        let quiet = frame_with_bands(20, 20, 20);
        let loud = frame_with_bands(240, 200, 160);

        let mut onsets = Vec::new();
        for tick in 0..120 {
            let now = tick as f64 * 1000.0 / 60.0;
            let frame = if tick % 30 == 0 && tick > 0 { &loud } else { &quiet };
            let analysed = engine.process(frame, now);
            if analysed.onset {
                onsets.push(tick);
            }
        }

        assert_eq!(onsets, vec![30, 60, 90]);
        assert_eq!(engine.beat_state().bpm_estimate(), 120);
    }

    #[test]
    fn silence_classifies_as_ambient_with_zero_intensity() {
        let mut engine = AnalysisEngine::new();
        let analysed = engine.process(&SampleFrame::silent(), 0.0);
        assert_eq!(analysed.mood, Mood::Ambient);
        assert_eq!(analysed.bpm, DEFAULT_BPM);

        let control = analysed.control_frame();
        assert_eq!(control.intensity, 0.0);
        assert_eq!(control.beat, 0.0);
    }
}
