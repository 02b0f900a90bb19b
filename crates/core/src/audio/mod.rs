//! Byte-scaled spectrum analysis of raw PCM.
//!
//! Produces [`SampleFrame`]s the way browser analyser nodes do: a Blackman
//! windowed FFT over the most recent `fft_size` samples, per-bin exponential
//! smoothing, then a decibel range squeezed into `0..=255`.

use std::{collections::VecDeque, f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AudioConfig, MoodlightError, Result, SampleFrame};

pub struct SpectrumAnalyser {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    samples: VecDeque<f32>,
    smoothed: Vec<f32>,
    fft: FftResources,
}

impl SpectrumAnalyser {
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let fft_size = config.fft_size;
        if fft_size < 32 || !fft_size.is_power_of_two() {
            return Err(MoodlightError::InvalidConfig(format!(
                "fft_size must be a power of two >= 32, got {fft_size}"
            )));
        }
        if !(0.0..=1.0).contains(&config.smoothing) {
            return Err(MoodlightError::InvalidConfig(format!(
                "smoothing must be within [0, 1], got {}",
                config.smoothing
            )));
        }
        if config.max_decibels <= config.min_decibels {
            return Err(MoodlightError::InvalidConfig(
                "max_decibels must exceed min_decibels".to_string(),
            ));
        }

        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(fft_size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            fft_size,
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            window: (0..fft_size).map(|i| blackman_value(i, fft_size)).collect(),
            samples: std::iter::repeat(0.0).take(fft_size).collect(),
            smoothed: vec![0.0; fft_size / 2],
            fft,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Appends samples, keeping only the most recent `fft_size`.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let skip = samples.len().saturating_sub(self.fft_size);
        for &sample in &samples[skip..] {
            self.samples.pop_front();
            self.samples.push_back(sample);
        }
    }

    /// Analyses the current window.
    pub fn snapshot(&mut self) -> Result<SampleFrame> {
        let fft = &mut self.fft;
        for ((slot, sample), weight) in fft.input.iter_mut().zip(&self.samples).zip(&self.window) {
            *slot = sample * weight;
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)
            .map_err(|err| MoodlightError::msg(format!("fft failed: {err}")))?;

        let scale = 1.0 / self.fft_size as f32;
        let db_range = self.max_decibels - self.min_decibels;
        let mut frequency = Vec::with_capacity(self.smoothed.len());
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&fft.spectrum) {
            let magnitude = bin.norm() * scale;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;
            let decibels = 20.0 * smoothed.log10();
            let scaled = 255.0 * (decibels - self.min_decibels) / db_range;
            frequency.push(if scaled.is_finite() {
                scaled.clamp(0.0, 255.0) as u8
            } else {
                0
            });
        }

        let time_domain = self
            .samples
            .iter()
            .map(|sample| (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8)
            .collect();

        Ok(SampleFrame::new(frequency, time_domain))
    }

    /// Pushes `samples` and analyses the resulting window.
    pub fn process(&mut self, samples: &[f32]) -> Result<SampleFrame> {
        self.push_samples(samples);
        self.snapshot()
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    let x = 2.0 * PI * index as f32 / len as f32;
    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeatureSet, FREQUENCY_BINS};

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn silence_produces_empty_spectrum() {
        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default()).unwrap();
        let frame = analyser.process(&[0.0; 2048]).unwrap();

        assert_eq!(frame.frequency.len(), FREQUENCY_BINS);
        assert!(frame.frequency.iter().all(|&b| b == 0));
        assert!(frame.time_domain.iter().all(|&b| b == 128));
    }

    #[test]
    fn bass_tone_lands_in_the_low_band() {
        let config = AudioConfig {
            smoothing: 0.0,
            ..AudioConfig::default()
        };
        let mut analyser = SpectrumAnalyser::new(&config).unwrap();
        // 48 kHz / 2048 = 23.4 Hz per bin, so 100 Hz sits around bin 4.
        let frame = analyser.process(&sine(100.0, 48_000.0, 2048)).unwrap();
        let features = FeatureSet::extract(&frame);

        assert!(frame.frequency[4] > 200);
        assert!(features.low > features.high);
        assert!(features.warmth > 0.5);
    }

    #[test]
    fn smoothing_carries_energy_across_ticks() {
        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default()).unwrap();
        let quiet_tone: Vec<f32> = sine(1_000.0, 48_000.0, 2048)
            .into_iter()
            .map(|sample| sample * 0.01)
            .collect();
        let tone = analyser.process(&quiet_tone).unwrap();
        let tail = analyser.process(&[0.0; 2048]).unwrap();

        let peak = (0..tone.frequency.len())
            .max_by_key(|&bin| tone.frequency[bin])
            .unwrap();
        assert!(tail.frequency[peak] > 0);
        assert!(tail.frequency[peak] < tone.frequency[peak]);
    }

    #[test]
    fn keeps_only_latest_window() {
        let config = AudioConfig {
            fft_size: 32,
            ..AudioConfig::default()
        };
        let mut analyser = SpectrumAnalyser::new(&config).unwrap();
        analyser.push_samples(&[1.0; 40]);
        analyser.push_samples(&[-1.0; 8]);
        let frame = analyser.snapshot().unwrap();

        assert_eq!(frame.time_domain.len(), 32);
        assert_eq!(&frame.time_domain[..24], &[255; 24]);
        assert_eq!(&frame.time_domain[24..], &[0; 8]);
    }

    #[test]
    fn rejects_bad_configuration() {
        let odd = AudioConfig {
            fft_size: 1000,
            ..AudioConfig::default()
        };
        assert!(SpectrumAnalyser::new(&odd).is_err());

        let inverted = AudioConfig {
            min_decibels: -20.0,
            max_decibels: -40.0,
            ..AudioConfig::default()
        };
        assert!(SpectrumAnalyser::new(&inverted).is_err());
    }
}
