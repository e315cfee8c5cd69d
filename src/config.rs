//! Well-known simulation and tuning constants.
//!
//! Mirrors the layout of the server's `util::time` module: plain `pub
//! const`s for values callers and tests reference directly, plus small
//! config structs for the pieces of tuning a test wants to override.

/// Server simulation tick rate (ticks per second).
pub const TICK_RATE: u32 = 30;
/// Fixed simulation step, in seconds.
pub const DT: f32 = 1.0 / TICK_RATE as f32;

/// Default interpolation delay before adaptation kicks in, in milliseconds.
pub const INTERPOLATION_DELAY_MS: f32 = 100.0;
/// Snapshot ring buffer capacity.
pub const SNAPSHOT_BUFFER_SIZE: usize = 32;
/// Pending-input queue capacity.
pub const INPUT_BUFFER_SIZE: usize = 64;

/// Ticks after `spawnTick` during which the alternate birth-animation
/// policy (see `lifecycle::animates_by_spawn_tick`) still animates.
pub const BIRTH_ANIMATION_TICKS: u64 = 15;

/// Drag applied to predicted velocity each predict-step (fraction removed
/// per step).
pub const DRAG: f32 = 0.002;
/// Maximum predicted velocity magnitude.
pub const MAX_VELOCITY: f32 = 500.0;
/// Base thrust magnitude at `REFERENCE_MASS`.
pub const BASE_THRUST: f32 = 200.0;
/// Mass floor used when computing the thrust multiplier, to avoid a
/// near-zero mass producing an absurd multiplier.
pub const MASS_MINIMUM: f32 = 10.0;
/// Mass at which the thrust multiplier is exactly 1.0.
pub const REFERENCE_MASS: f32 = 100.0;
/// Thrust multiplier clamp bounds.
pub const MIN_THRUST_MULT: f32 = 0.25;
pub const MAX_THRUST_MULT: f32 = 3.5;

/// Tuning for the adaptive interpolation delay estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveConfig {
    /// EMA smoothing factor in `(0, 1]`.
    pub smoothing_factor: f32,
    /// Multiple of the smoothed inter-arrival interval used as the delay
    /// target, so one dropped packet can still be bridged.
    pub buffer_snapshots: f32,
    /// Lower clamp for the render delay, in milliseconds.
    pub min_delay_ms: f32,
    /// Upper clamp for the render delay, in milliseconds.
    pub max_delay_ms: f32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.15,
            buffer_snapshots: 2.0,
            min_delay_ms: 80.0,
            max_delay_ms: 200.0,
        }
    }
}

impl AdaptiveConfig {
    /// Validate the configuration. The only genuinely invalid shape is an
    /// inverted clamp range; everything else is a tuning knob the caller
    /// is free to set to an unusual value.
    pub fn validate(&self) -> Result<(), crate::error::EngineError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(crate::error::EngineError::InvalidAdaptiveConfig {
                min_delay_ms: self.min_delay_ms,
                max_delay_ms: self.max_delay_ms,
            });
        }
        Ok(())
    }
}

/// Tuning for client-side prediction's thrust/drag model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    pub drag: f32,
    pub max_velocity: f32,
    pub base_thrust: f32,
    pub mass_minimum: f32,
    pub reference_mass: f32,
    pub min_thrust_mult: f32,
    pub max_thrust_mult: f32,
    pub dt: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            drag: DRAG,
            max_velocity: MAX_VELOCITY,
            base_thrust: BASE_THRUST,
            mass_minimum: MASS_MINIMUM,
            reference_mass: REFERENCE_MASS,
            min_thrust_mult: MIN_THRUST_MULT,
            max_thrust_mult: MAX_THRUST_MULT,
            dt: DT,
        }
    }
}
