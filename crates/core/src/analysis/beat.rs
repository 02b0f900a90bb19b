use std::collections::VecDeque;

/// Number of energy values retained for the rolling average.
pub const HISTORY_CAPACITY: usize = 100;

/// Tempo assumed before the first pair of beats has been observed.
pub const DEFAULT_BPM: u32 = 90;

/// Tunables of the onset detector and tempo estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatParams {
    /// An onset requires `energy > onset_ratio * average`.
    pub onset_ratio: f32,
    /// Absolute energy floor that keeps near-silence from triggering.
    pub onset_floor: f32,
    /// Onsets closer than this to the last beat only refresh the pulse.
    pub refractory_ms: f64,
    /// Exclusive bounds of a plausible inter-beat interval (50-240 BPM).
    pub min_interval_ms: f64,
    pub max_interval_ms: f64,
    /// Multiplier applied to the pulse every tick.
    pub pulse_decay: f32,
}

impl Default for BeatParams {
    fn default() -> Self {
        Self {
            onset_ratio: 1.35,
            onset_floor: 0.12,
            refractory_ms: 200.0,
            min_interval_ms: 250.0,
            max_interval_ms: 1200.0,
            pulse_decay: 0.92,
        }
    }
}

/// Rolling beat state of a single audio stream.
///
/// Every stream owns its own instance; nothing here is shared between
/// threads.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatState {
    history: VecDeque<f32>,
    pulse: f32,
    bpm_estimate: u32,
    last_beat_at: f64,
}

impl Default for BeatState {
    fn default() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            pulse: 0.0,
            bpm_estimate: DEFAULT_BPM,
            last_beat_at: 0.0,
        }
    }
}

impl BeatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state with an explicit pulse, tempo and last beat time.
    pub fn with_values(pulse: f32, bpm_estimate: u32, last_beat_at: f64) -> Self {
        Self {
            pulse,
            bpm_estimate,
            last_beat_at,
            ..Self::default()
        }
    }

    pub fn pulse(&self) -> f32 {
        self.pulse
    }

    pub fn bpm_estimate(&self) -> u32 {
        self.bpm_estimate
    }

    pub fn last_beat_at(&self) -> f64 {
        self.last_beat_at
    }

    pub fn history(&self) -> &VecDeque<f32> {
        &self.history
    }

    /// Arithmetic mean of the retained energy window, zero when empty.
    pub fn average_energy(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    fn push_energy(&mut self, energy: f32) {
        self.history.push_back(energy);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }
}

/// Onset detector and tempo estimator operating on an external [`BeatState`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BeatTracker {
    params: BeatParams,
}

impl BeatTracker {
    pub fn new(params: BeatParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BeatParams {
        &self.params
    }

    /// Advances `state` by one tick and reports whether an onset fired.
    ///
    /// The pulse resets on every onset, but the tempo and `last_beat_at` only
    /// move once the refractory window has passed.
    pub fn tick(&self, state: &mut BeatState, energy: f32, now_ms: f64) -> bool {
        let params = &self.params;
        state.push_energy(energy);
        let average = state.average_energy();
        let onset = energy > average * params.onset_ratio && energy > params.onset_floor;

        if onset {
            state.pulse = 1.0;
            let interval_ms = now_ms - state.last_beat_at;
            // Strict: an onset exactly `refractory_ms` after the last beat is ignored.
            if interval_ms > params.refractory_ms {
                if interval_ms > params.min_interval_ms && interval_ms < params.max_interval_ms {
                    state.bpm_estimate = (60_000.0 / interval_ms).round() as u32;
                }
                state.last_beat_at = now_ms;
            }
        }

        state.pulse *= params.pulse_decay;
        onset
    }
}
