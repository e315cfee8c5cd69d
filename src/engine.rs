//! `NetworkEngine`: the single facade composing the snapshot buffer,
//! adaptive delay estimator, delta applier, interpolator, predictor, and
//! lifecycle tracker into the atomic operations spec.md §5 describes.

use tracing::{debug, info, trace, warn};

use crate::buffer::SnapshotBuffer;
use crate::clock::{Clock, SystemClock};
use crate::config::{AdaptiveConfig, PhysicsConfig};
use crate::delay::AdaptiveDelayEstimator;
use crate::delta::apply_delta;
use crate::interpolate::{Interpolator, NameCache};
use crate::lifecycle::LifecycleTracker;
use crate::predict::Predictor;
use crate::protocol::{
    DeltaUpdate, GameSnapshot, InterpolatedState, PlayerInput, PredictedPose, ServerMsg, Tick,
};

/// Owns every piece of mutable synchronization state for one match. All
/// public methods are synchronous and atomic: on return, the buffer,
/// `current_tick`, adaptive delay, name cache, lifecycle tracker,
/// destroyed-well set, and predicted pose are mutually consistent.
pub struct NetworkEngine<C: Clock = SystemClock> {
    clock: C,
    buffer: SnapshotBuffer,
    current_tick: Tick,
    delay: AdaptiveDelayEstimator,
    lifecycle: LifecycleTracker,
    names: NameCache,
    predictor: Predictor,
    last_local_spawn_tick: Option<Tick>,
    last_local_alive: Option<bool>,
}

impl NetworkEngine<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }
}

impl Default for NetworkEngine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> NetworkEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            buffer: SnapshotBuffer::new(),
            current_tick: 0,
            delay: AdaptiveDelayEstimator::new(AdaptiveConfig::default()),
            lifecycle: LifecycleTracker::new(),
            names: NameCache::new(),
            predictor: Predictor::new(PhysicsConfig::default()),
            last_local_spawn_tick: None,
            last_local_alive: None,
        }
    }

    pub fn with_clock_and_config(
        clock: C,
        adaptive: AdaptiveConfig,
        physics: PhysicsConfig,
    ) -> Self {
        Self {
            clock,
            buffer: SnapshotBuffer::new(),
            current_tick: 0,
            delay: AdaptiveDelayEstimator::new(adaptive),
            lifecycle: LifecycleTracker::new(),
            names: NameCache::new(),
            predictor: Predictor::new(physics),
            last_local_spawn_tick: None,
            last_local_alive: None,
        }
    }

    /// Dispatch a decoded server message: `Snapshot`/`Delta` drive the
    /// engine, everything else is logged at `trace!` and handed back to
    /// the caller for other subsystems to act on (per spec.md §6).
    pub fn handle_server_msg(&mut self, msg: &ServerMsg) {
        match msg {
            ServerMsg::Snapshot(snapshot) => self.apply_snapshot(snapshot.clone()),
            ServerMsg::Delta(delta) => self.apply_delta(delta),
            ServerMsg::GravityWellDestroyed { id } => self.mark_well_destroyed(*id),
            other => trace!(?other, "server message not handled by NetworkEngine"),
        }
    }

    /// Apply a full authoritative snapshot: append to the buffer, update
    /// `current_tick` and the adaptive delay, and reconcile prediction if
    /// the local player is present.
    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) {
        let now = self.clock.now_ms();

        if let Some(local_id) = self.predictor.local_player_id() {
            if let Some(local_player) = snapshot.players.iter().find(|p| p.id == local_id) {
                let respawned = self
                    .last_local_spawn_tick
                    .map(|prev| prev != local_player.spawn_tick)
                    .unwrap_or(false)
                    || (self.last_local_alive == Some(false) && local_player.alive);

                if respawned {
                    info!(
                        player_id = local_id,
                        spawn_tick = local_player.spawn_tick,
                        "local respawn detected: clearing snapshot buffer"
                    );
                    self.buffer.clear();
                }
                self.last_local_spawn_tick = Some(local_player.spawn_tick);
                self.last_local_alive = Some(local_player.alive);
            }
        }

        self.delay.on_arrival(now);
        let snapshot_tick = snapshot.tick;
        self.current_tick = self.current_tick.max(snapshot_tick);

        let local_player = self
            .predictor
            .local_player_id()
            .and_then(|id| snapshot.players.iter().find(|p| p.id == id))
            .cloned();

        self.buffer.append(snapshot, now);

        if let Some(local_player) = local_player {
            // Reconcile against this snapshot's own tick (spec.md §4.5
            // step 1), not the running current_tick max, so an
            // out-of-order snapshot doesn't purge inputs against the
            // wrong server tick.
            self.predictor.reconcile(snapshot_tick, &local_player);
        }
    }

    /// Reconstruct a full snapshot from `delta` and feed it through
    /// [`Self::apply_snapshot`] exactly once, or drop it silently if its
    /// base tick is missing from the buffer.
    pub fn apply_delta(&mut self, delta: &DeltaUpdate) {
        match apply_delta(&self.buffer, delta) {
            Some(snapshot) => self.apply_snapshot(snapshot),
            None => {
                debug!(
                    base_tick = delta.base_tick,
                    tick = delta.tick,
                    "delta dropped: base not buffered"
                );
            }
        }
    }

    /// Produce the render-ready world state for "now", or `None` if the
    /// buffer is empty ("do not draw the world yet").
    pub fn get_interpolated_state(&mut self) -> Option<InterpolatedState> {
        let now = self.clock.now_ms();
        Interpolator::interpolate(
            &self.buffer,
            now,
            self.delay.interpolation_delay(),
            &mut self.lifecycle,
            &mut self.names,
        )
    }

    /// Same as [`Self::get_interpolated_state`] but at an explicitly
    /// supplied render time, for deterministic tests.
    pub fn get_interpolated_state_at(&mut self, now_ms: u64) -> Option<InterpolatedState> {
        Interpolator::interpolate(
            &self.buffer,
            now_ms,
            self.delay.interpolation_delay(),
            &mut self.lifecycle,
            &mut self.names,
        )
    }

    pub fn get_predicted_local_player(&self) -> Option<PredictedPose> {
        self.predictor
            .local_player_id()
            .map(|_| self.predictor.predicted_pose())
    }

    pub fn record_input(&mut self, input: PlayerInput) {
        self.predictor.record_input(input);
    }

    pub fn set_local_player_id(&mut self, id: impl Into<String>) {
        self.predictor.set_local_player_id(id);
    }

    pub fn mark_well_destroyed(&mut self, id: u64) {
        warn!(well_id = id, "gravity well destroyed");
        self.lifecycle.mark_well_destroyed(id);
    }

    pub fn get_current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn interpolation_delay(&self) -> f32 {
        self.delay.interpolation_delay()
    }

    /// Clears the buffer, `current_tick`, pending inputs, predicted pose,
    /// destroyed set, birth-time trackers, name cache, and adaptive state.
    /// The local player id binding is preserved (reconnect-and-rejoin is
    /// the common case; see DESIGN.md).
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.current_tick = 0;
        self.delay.reset();
        self.lifecycle.reset();
        self.names.reset();
        self.predictor.reset();
        self.last_local_spawn_tick = None;
        self.last_local_alive = None;
        info!("engine reset");
    }
}
