//! Client-side prediction of the local player's pose, reconciled against
//! each authoritative snapshot that includes the local player.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::{PhysicsConfig, INPUT_BUFFER_SIZE};
use crate::protocol::{PlayerInput, PlayerSnapshot, PredictedPose, Tick, Vector};

/// Records local inputs and maintains the predicted local-player pose.
#[derive(Debug, Clone)]
pub struct Predictor {
    physics: PhysicsConfig,
    capacity: usize,
    local_player_id: Option<String>,
    pending: VecDeque<PlayerInput>,
    predicted_position: Vector,
    predicted_velocity: Vector,
}

impl Predictor {
    pub fn new(physics: PhysicsConfig) -> Self {
        Self {
            physics,
            capacity: INPUT_BUFFER_SIZE,
            local_player_id: None,
            pending: VecDeque::with_capacity(INPUT_BUFFER_SIZE),
            predicted_position: Vector::ZERO,
            predicted_velocity: Vector::ZERO,
        }
    }

    pub fn set_local_player_id(&mut self, id: impl Into<String>) {
        self.local_player_id = Some(id.into());
    }

    pub fn local_player_id(&self) -> Option<&str> {
        self.local_player_id.as_deref()
    }

    /// Append an input, dropping the oldest pending input if the queue is
    /// over capacity. No other state changes.
    pub fn record_input(&mut self, input: PlayerInput) {
        if self.pending.len() >= self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(input);
    }

    /// Read-only view of currently pending (unacknowledged) inputs.
    pub fn pending_inputs(&self) -> impl Iterator<Item = &PlayerInput> {
        self.pending.iter()
    }

    pub fn predicted_pose(&self) -> PredictedPose {
        PredictedPose {
            position: self.predicted_position,
            velocity: self.predicted_velocity,
        }
    }

    /// Reconcile against an authoritative snapshot containing the local
    /// player: discard acknowledged/superseded inputs, reset predicted
    /// pose to the server's values, and replay the remainder.
    ///
    /// Returns `true` if reconciliation actually ran (the local player was
    /// present in `server_player`'s owning snapshot at `server_tick`).
    pub fn reconcile(&mut self, server_tick: Tick, server_player: &PlayerSnapshot) -> bool {
        if self.local_player_id.as_deref() != Some(server_player.id.as_str()) {
            return false;
        }

        self.pending.retain(|input| input.tick > server_tick);

        self.predicted_position = server_player.position;
        self.predicted_velocity = server_player.velocity;

        let replay_count = self.pending.len();
        for input in self.pending.clone() {
            self.predict_step(&input, server_player.mass);
        }
        debug!(replay_count, server_tick, "reconciliation replay");
        true
    }

    fn predict_step(&mut self, input: &PlayerInput, mass: f32) {
        let cfg = &self.physics;

        if input.boost && input.thrust.length_squared() > 0.0 {
            let mass_floor = mass.max(cfg.mass_minimum);
            let thrust_multiplier = (cfg.reference_mass / mass_floor)
                .sqrt()
                .clamp(cfg.min_thrust_mult, cfg.max_thrust_mult);
            let thrust_magnitude = cfg.base_thrust * thrust_multiplier;
            self.predicted_velocity +=
                input.thrust.normalize() * thrust_magnitude * cfg.dt;
        }

        self.predicted_velocity *= 1.0 - cfg.drag;

        let speed = self.predicted_velocity.length();
        if speed > cfg.max_velocity {
            self.predicted_velocity = self.predicted_velocity * (cfg.max_velocity / speed);
        }

        self.predicted_position += self.predicted_velocity * cfg.dt;
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.predicted_position = Vector::ZERO;
        self.predicted_velocity = Vector::ZERO;
        // local_player_id is intentionally preserved; see DESIGN.md.
    }
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
