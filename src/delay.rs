//! Adaptive render delay: an EMA of inter-arrival intervals sized to
//! tolerate one lost packet without running dry of bracketing data.

use tracing::trace;

use crate::config::{AdaptiveConfig, DT};

/// Tracks inter-arrival timing and derives the current render delay.
#[derive(Debug, Clone)]
pub struct AdaptiveDelayEstimator {
    config: AdaptiveConfig,
    last_arrival: Option<u64>,
    interval_ema: f32,
    delay: f32,
}

impl AdaptiveDelayEstimator {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            last_arrival: None,
            // Seeded at the simulation period so startup delay is small,
            // biasing toward the fastest plausible server rate.
            interval_ema: DT * 1000.0,
            delay: crate::config::INTERPOLATION_DELAY_MS,
        }
    }

    /// Current render delay in milliseconds, always within
    /// `[min_delay_ms, max_delay_ms]`.
    pub fn interpolation_delay(&self) -> f32 {
        self.delay
    }

    /// Feed a snapshot arrival at wall-clock `now` (ms). Rejected intervals
    /// (<=10ms or >=500ms) still advance `last_arrival` so a burst of junk
    /// timing never permanently stalls the estimator; they just don't
    /// perturb the EMA or the delay.
    pub fn on_arrival(&mut self, now: u64) {
        if let Some(last) = self.last_arrival {
            let interval = now.saturating_sub(last) as f32;
            if interval > 10.0 && interval < 500.0 {
                self.interval_ema =
                    self.interval_ema * (1.0 - self.config.smoothing_factor)
                        + interval * self.config.smoothing_factor;

                let target = self.interval_ema * self.config.buffer_snapshots;
                self.delay = target.clamp(self.config.min_delay_ms, self.config.max_delay_ms);
            } else {
                trace!(interval, "rejected inter-arrival interval for EMA");
            }
        }
        self.last_arrival = Some(now);
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

impl Default for AdaptiveDelayEstimator {
    fn default() -> Self {
        Self::new(AdaptiveConfig::default())
    }
}
