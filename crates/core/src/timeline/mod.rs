use std::time::{Duration, Instant};

/// Clock driven by the number of samples consumed, for file and pipe input.
///
/// Advances one hop per analysis tick so offline runs see the same tick
/// spacing as a display-refresh driven live loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleClock {
    sample_rate: u32,
    hop: usize,
    position: u64,
}

impl SampleClock {
    pub fn new(sample_rate: u32, tick_rate_hz: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let hop = (sample_rate / tick_rate_hz.max(1)).max(1) as usize;
        Self {
            sample_rate,
            hop,
            position: 0,
        }
    }

    /// Samples consumed per tick.
    pub fn hop_size(&self) -> usize {
        self.hop
    }

    pub fn advance(&mut self, samples: usize) -> f64 {
        self.position += samples as u64;
        self.now_ms()
    }

    pub fn now_ms(&self) -> f64 {
        self.position as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// Wall clock started when a stream begins, used to hold sample-clocked
/// ticks to real time.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackClock {
    started: Instant,
}

impl PlaybackClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn now_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Time left until `target_ms` after start, zero once it has passed.
    pub fn delay_until(&self, target_ms: f64) -> Duration {
        let remaining = target_ms - self.now_ms();
        if remaining > 0.0 {
            Duration::from_secs_f64(remaining / 1000.0)
        } else {
            Duration::ZERO
        }
    }

    /// Sleeps until `target_ms` after start. Returns at once when late.
    pub fn wait_until(&self, target_ms: f64) {
        let delay = self.delay_until(target_ms);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_clock_counts_milliseconds() {
        let mut clock = SampleClock::new(48_000, 60);
        assert_eq!(clock.hop_size(), 800);
        assert_eq!(clock.now_ms(), 0.0);

        let now = clock.advance(clock.hop_size());
        assert!((now - 1000.0 / 60.0).abs() < 1e-9);
        assert!((clock.advance(48_000 - 800) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_rates_do_not_divide_by_zero() {
        let clock = SampleClock::new(0, 0);
        assert_eq!(clock.hop_size(), 1);
    }

    #[test]
    fn playback_clock_paces_sample_ticks() {
        let mut ticks = SampleClock::new(48_000, 100);
        let wall = PlaybackClock::start();

        for _ in 0..5 {
            let due = ticks.advance(ticks.hop_size());
            wall.wait_until(due);
            assert!(wall.now_ms() + 0.001 >= due);
        }
        assert!(wall.elapsed() >= Duration::from_millis(49));
    }

    #[test]
    fn late_targets_do_not_wait() {
        let wall = PlaybackClock::start();
        assert_eq!(wall.delay_until(-5.0), Duration::ZERO);
        assert!(wall.delay_until(60_000.0) > Duration::from_secs(59));
    }
}
