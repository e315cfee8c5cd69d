//! Birth-time tracking for spawn/enter animations, and the destroyed-well
//! bookkeeping driven by `GravityWellDestroyed` events.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::BIRTH_ANIMATION_TICKS;
use crate::protocol::{GravityWellSnapshot, PlayerSnapshot, Tick};

/// Tracks first-seen times and destruction flags so the interpolator can
/// decide when to play a birth or keep filtering a destroyed well.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    player_born: HashMap<String, u64>,
    well_born: HashMap<u64, u64>,
    destroyed_wells: HashSet<u64>,
    has_received_first_snapshot: bool,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Called with the `before`/`after` pair of a player that exists in
    /// both snapshots (or `before = None` on first sighting) to compute and
    /// record its `bornTime`.
    ///
    /// First sighting: `bornTime = 0` (the player is entering our area of
    /// interest, not spawning). Subsequently: a `before.alive == false &&
    /// after.alive == true && after.spawn_protection == true` transition
    /// sets `bornTime = now`.
    pub fn player_born_time(
        &mut self,
        id: &str,
        before: Option<&PlayerSnapshot>,
        after: &PlayerSnapshot,
        now: u64,
    ) -> u64 {
        match before {
            None => {
                self.player_born.insert(id.to_string(), 0);
                0
            }
            Some(before) => {
                let respawned =
                    !before.alive && after.alive && after.spawn_protection;
                if respawned {
                    debug!(player_id = id, "player respawn animation triggered");
                    self.player_born.insert(id.to_string(), now);
                    now
                } else {
                    *self.player_born.entry(id.to_string()).or_insert(0)
                }
            }
        }
    }

    /// Drop tracking for ids no longer present in the current snapshot; a
    /// future re-appearance is a fresh first-sighting.
    pub fn retain_players<'a>(&mut self, present_ids: impl Iterator<Item = &'a str>) {
        let present: HashSet<&str> = present_ids.collect();
        self.player_born.retain(|id, _| present.contains(id.as_str()));
    }

    pub fn well_born_time(&mut self, well: &GravityWellSnapshot, now: u64) -> u64 {
        if let Some(&t) = self.well_born.get(&well.id) {
            return t;
        }
        let t = if self.has_received_first_snapshot { now } else { 0 };
        self.well_born.insert(well.id, t);
        t
    }

    /// Must be called exactly once per processed snapshot, after any
    /// `well_born_time` lookups for that snapshot.
    pub fn mark_first_snapshot_received(&mut self) {
        self.has_received_first_snapshot = true;
    }

    pub fn retain_wells<'a>(&mut self, present_ids: impl Iterator<Item = &'a u64>) {
        let present: HashSet<u64> = present_ids.copied().collect();
        self.well_born.retain(|id, _| present.contains(id));
    }

    pub fn mark_well_destroyed(&mut self, id: u64) {
        self.destroyed_wells.insert(id);
        self.well_born.remove(&id);
    }

    pub fn is_well_destroyed(&self, id: u64) -> bool {
        self.destroyed_wells.contains(&id)
    }

    /// For every destroyed well id the server no longer lists, the server
    /// has confirmed deletion: stop filtering it.
    pub fn reconcile_destroyed_wells<'a>(&mut self, present_ids: impl Iterator<Item = &'a u64>) {
        let present: HashSet<u64> = present_ids.copied().collect();
        self.destroyed_wells.retain(|id| present.contains(id));
    }
}

/// Alternate, spawn-tick-based birth-animation policy: a player seen with
/// `(current_tick - spawn_tick) < BIRTH_ANIMATION_TICKS` and `alive ==
/// true` animates; otherwise (including dead players) it does not. Not
/// wired into the engine (see DESIGN.md) but kept and tested as a pure
/// function since both co-existing policies are part of the spec.
pub fn animates_by_spawn_tick(current_tick: Tick, player: &PlayerSnapshot) -> bool {
    player.alive && current_tick.saturating_sub(player.spawn_tick) < BIRTH_ANIMATION_TICKS
}
