//! Render-time reconstruction of the world from bracketing buffer entries.

use std::collections::HashMap;
use std::f32::consts::PI;

use crate::buffer::{BufferEntry, SnapshotBuffer};
use crate::lifecycle::LifecycleTracker;
use crate::protocol::{
    ArenaState, DebrisSnapshot, GravityWellSnapshot, InterpolatedDebris, InterpolatedNotablePlayer,
    InterpolatedPlayer, InterpolatedProjectile, InterpolatedState, InterpolatedWell,
    NotablePlayerSnapshot, PlayerSnapshot, ProjectileSnapshot, Vector,
};

/// Caches the last non-empty display name seen per player id, since the
/// wire format omits the name field on steady-state snapshots.
#[derive(Debug, Default)]
pub struct NameCache {
    names: HashMap<String, String>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.names.clear();
    }

    /// `incoming = None` means the field was omitted (keep cached value);
    /// `incoming = Some("")` is treated the same as `None` by callers that
    /// never emit empty-but-present names, but if it does arrive we still
    /// only replace the cache on a non-empty value.
    pub fn resolve(&mut self, id: &str, incoming: Option<&str>) -> String {
        if let Some(name) = incoming {
            if !name.is_empty() {
                self.names.insert(id.to_string(), name.to_string());
                return name.to_string();
            }
        }
        self.names.get(id).cloned().unwrap_or_default()
    }
}

/// Produces [`InterpolatedState`] snapshots for rendering.
pub struct Interpolator;

impl Interpolator {
    /// `renderTime = now - interpolation_delay`. Returns `None` if the
    /// buffer is empty (the spec's "no state" contract).
    pub fn interpolate(
        buffer: &SnapshotBuffer,
        now: u64,
        interpolation_delay: f32,
        lifecycle: &mut LifecycleTracker,
        names: &mut NameCache,
    ) -> Option<InterpolatedState> {
        if buffer.is_empty() {
            return None;
        }

        let render_time = now as f32 - interpolation_delay;
        let entries: Vec<&BufferEntry> = buffer.iter().collect();

        if entries.len() == 1 {
            return Some(Self::single_snapshot(entries[0], now, lifecycle, names));
        }

        match Self::bracket(&entries, render_time) {
            Bracket::Pair(before, after, t) => {
                Some(Self::blend(before, after, t, now, lifecycle, names))
            }
            Bracket::Oldest => Some(Self::single_snapshot(entries[0], now, lifecycle, names)),
            Bracket::Newest => {
                Some(Self::single_snapshot(entries[entries.len() - 1], now, lifecycle, names))
            }
        }
    }

    fn bracket<'a>(entries: &[&'a BufferEntry], render_time: f32) -> Bracket<'a> {
        if render_time <= entries[0].arrival_time as f32 {
            return Bracket::Oldest;
        }
        let last = entries.len() - 1;
        if render_time >= entries[last].arrival_time as f32 {
            return Bracket::Newest;
        }
        for window in entries.windows(2) {
            let (before, after) = (window[0], window[1]);
            let (t0, t1) = (before.arrival_time as f32, after.arrival_time as f32);
            if t0 <= render_time && render_time <= t1 {
                let t = if (t1 - t0).abs() < f32::EPSILON {
                    0.0
                } else {
                    (render_time - t0) / (t1 - t0)
                };
                return Bracket::Pair(before, after, t);
            }
        }
        // Should be unreachable given the bounds checks above, but fall
        // back to the newest entry rather than panic.
        Bracket::Newest
    }

    fn single_snapshot(
        entry: &BufferEntry,
        now: u64,
        lifecycle: &mut LifecycleTracker,
        names: &mut NameCache,
    ) -> InterpolatedState {
        let snap = &entry.snapshot;

        let mut players = HashMap::new();
        for p in &snap.players {
            let born = lifecycle.player_born_time(&p.id, None, p, now);
            players.insert(p.id.clone(), to_interpolated_player(p, born, names));
        }
        lifecycle.retain_players(snap.players.iter().map(|p| p.id.as_str()));

        let mut wells = HashMap::new();
        for w in &snap.gravity_wells {
            if lifecycle.is_well_destroyed(w.id) {
                continue;
            }
            let born = lifecycle.well_born_time(w, now);
            wells.insert(w.id, to_interpolated_well(w, born));
        }
        lifecycle.mark_first_snapshot_received();
        lifecycle.retain_wells(snap.gravity_wells.iter().map(|w| &w.id));
        lifecycle.reconcile_destroyed_wells(snap.gravity_wells.iter().map(|w| &w.id));

        let projectiles = snap
            .projectiles
            .iter()
            .map(|p| (p.id, to_interpolated_projectile(p)))
            .collect();

        let debris = snap
            .debris
            .iter()
            .map(|d| (d.id, to_interpolated_debris(d)))
            .collect();

        let notable_players = snap
            .notable_players
            .iter()
            .map(|n| (n.id.clone(), to_interpolated_notable(n)))
            .collect();

        InterpolatedState {
            tick: snap.tick,
            phase: snap.phase,
            match_time: snap.match_time,
            countdown: snap.countdown,
            players,
            projectiles,
            debris,
            gravity_wells: wells,
            notable_players,
            arena: snap.arena.clone(),
            density_grid: snap.density_grid.clone(),
        }
    }

    fn blend(
        before: &BufferEntry,
        after: &BufferEntry,
        t: f32,
        now: u64,
        lifecycle: &mut LifecycleTracker,
        names: &mut NameCache,
    ) -> InterpolatedState {
        let before_snap = &before.snapshot;
        let after_snap = &after.snapshot;

        let before_players: HashMap<&str, &PlayerSnapshot> = before_snap
            .players
            .iter()
            .map(|p| (p.id.as_str(), p))
            .collect();

        let mut players = HashMap::new();
        for p in &after_snap.players {
            let b = before_players.get(p.id.as_str()).copied();
            let born = lifecycle.player_born_time(&p.id, b, p, now);

            let interpolated = match b {
                None => to_interpolated_player(p, born, names),
                Some(b) => {
                    let snapped = (!b.alive && p.alive) || (!b.spawn_protection && p.spawn_protection);
                    if snapped {
                        to_interpolated_player(p, born, names)
                    } else {
                        let position = b.position.lerp(p.position, t);
                        let velocity = b.velocity.lerp(p.velocity, t);
                        let mass = lerp_f32(b.mass, p.mass, t);
                        let rotation = lerp_angle(b.rotation, p.rotation, t);
                        let name = names.resolve(&p.id, p.name.as_deref());
                        InterpolatedPlayer {
                            id: p.id.clone(),
                            name,
                            position,
                            velocity,
                            rotation,
                            mass,
                            alive: p.alive,
                            spawn_protection: p.spawn_protection,
                            kills: p.kills,
                            deaths: p.deaths,
                            bot: p.bot,
                            color_index: p.color_index,
                            born_time: born,
                        }
                    }
                }
            };
            players.insert(p.id.clone(), interpolated);
        }
        lifecycle.retain_players(after_snap.players.iter().map(|p| p.id.as_str()));

        let before_wells: HashMap<u64, &GravityWellSnapshot> = before_snap
            .gravity_wells
            .iter()
            .map(|w| (w.id, w))
            .collect();

        let mut wells = HashMap::new();
        for w in &after_snap.gravity_wells {
            if lifecycle.is_well_destroyed(w.id) {
                continue;
            }
            let born = lifecycle.well_born_time(w, now);
            let interpolated = match before_wells.get(&w.id) {
                None => to_interpolated_well(w, born),
                Some(b) => InterpolatedWell {
                    id: w.id,
                    position: b.position.lerp(w.position, t),
                    mass: lerp_f32(b.mass, w.mass, t),
                    core_radius: lerp_f32(b.core_radius, w.core_radius, t),
                    born_time: born,
                },
            };
            wells.insert(w.id, interpolated);
        }
        lifecycle.mark_first_snapshot_received();
        lifecycle.retain_wells(after_snap.gravity_wells.iter().map(|w| &w.id));
        lifecycle.reconcile_destroyed_wells(after_snap.gravity_wells.iter().map(|w| &w.id));

        let before_projectiles: HashMap<u64, &ProjectileSnapshot> = before_snap
            .projectiles
            .iter()
            .map(|p| (p.id, p))
            .collect();
        let projectiles = after_snap
            .projectiles
            .iter()
            .map(|p| {
                let interpolated = match before_projectiles.get(&p.id) {
                    None => to_interpolated_projectile(p),
                    Some(b) => InterpolatedProjectile {
                        id: p.id,
                        owner_id: p.owner_id.clone(),
                        position: b.position.lerp(p.position, t),
                        velocity: b.velocity.lerp(p.velocity, t),
                        mass: lerp_f32(b.mass, p.mass, t),
                    },
                };
                (p.id, interpolated)
            })
            .collect();

        let before_debris: HashMap<u64, &DebrisSnapshot> =
            before_snap.debris.iter().map(|d| (d.id, d)).collect();
        let debris = after_snap
            .debris
            .iter()
            .map(|d| {
                let interpolated = match before_debris.get(&d.id) {
                    None => to_interpolated_debris(d),
                    Some(b) => InterpolatedDebris {
                        id: d.id,
                        position: b.position.lerp(d.position, t),
                        size_class: d.size_class,
                    },
                };
                (d.id, interpolated)
            })
            .collect();

        let before_notable: HashMap<&str, &NotablePlayerSnapshot> = before_snap
            .notable_players
            .iter()
            .map(|n| (n.id.as_str(), n))
            .collect();
        let notable_players = after_snap
            .notable_players
            .iter()
            .map(|n| {
                let interpolated = match before_notable.get(n.id.as_str()) {
                    None => to_interpolated_notable(n),
                    Some(b) => InterpolatedNotablePlayer {
                        id: n.id.clone(),
                        position: b.position.lerp(n.position, t),
                        mass: lerp_f32(b.mass, n.mass, t),
                        color_index: n.color_index,
                    },
                };
                (n.id.clone(), interpolated)
            })
            .collect();

        let arena = ArenaState {
            collapse_phase: after_snap.arena.collapse_phase,
            safe_radius: lerp_f32(before_snap.arena.safe_radius, after_snap.arena.safe_radius, t),
            scale: lerp_f32(before_snap.arena.scale, after_snap.arena.scale, t),
        };

        InterpolatedState {
            tick: after_snap.tick,
            phase: after_snap.phase,
            match_time: lerp_f32(before_snap.match_time, after_snap.match_time, t),
            countdown: lerp_f32(before_snap.countdown, after_snap.countdown, t),
            players,
            projectiles,
            debris,
            gravity_wells: wells,
            notable_players,
            arena,
            density_grid: after_snap.density_grid.clone(),
        }
    }
}

enum Bracket<'a> {
    Pair(&'a BufferEntry, &'a BufferEntry, f32),
    Oldest,
    Newest,
}

fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Shortest-angle interpolation: normalize the delta into `(-pi, pi]`
/// before applying `t`, so crossing the wraparound point never spins the
/// long way around.
fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    let mut delta = (b - a) % (2.0 * PI);
    if delta > PI {
        delta -= 2.0 * PI;
    } else if delta <= -PI {
        delta += 2.0 * PI;
    }
    a + delta * t
}

fn to_interpolated_player(p: &PlayerSnapshot, born_time: u64, names: &mut NameCache) -> InterpolatedPlayer {
    let name = names.resolve(&p.id, p.name.as_deref());
    InterpolatedPlayer {
        id: p.id.clone(),
        name,
        position: p.position,
        velocity: p.velocity,
        rotation: p.rotation,
        mass: p.mass,
        alive: p.alive,
        spawn_protection: p.spawn_protection,
        kills: p.kills,
        deaths: p.deaths,
        bot: p.bot,
        color_index: p.color_index,
        born_time,
    }
}

fn to_interpolated_well(w: &GravityWellSnapshot, born_time: u64) -> InterpolatedWell {
    InterpolatedWell {
        id: w.id,
        position: w.position,
        mass: w.mass,
        core_radius: w.core_radius,
        born_time,
    }
}

fn to_interpolated_projectile(p: &ProjectileSnapshot) -> InterpolatedProjectile {
    InterpolatedProjectile {
        id: p.id,
        owner_id: p.owner_id.clone(),
        position: p.position,
        velocity: p.velocity,
        mass: p.mass,
    }
}

fn to_interpolated_debris(d: &DebrisSnapshot) -> InterpolatedDebris {
    InterpolatedDebris {
        id: d.id,
        position: d.position,
        size_class: d.size_class,
    }
}

fn to_interpolated_notable(n: &NotablePlayerSnapshot) -> InterpolatedNotablePlayer {
    InterpolatedNotablePlayer {
        id: n.id.clone(),
        position: n.position,
        mass: n.mass,
        color_index: n.color_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ArenaState, MatchPhase};

    fn base_player(id: &str, pos: Vector) -> PlayerSnapshot {
        PlayerSnapshot {
            id: id.to_string(),
            name: None,
            position: pos,
            velocity: Vector::ZERO,
            rotation: 0.0,
            mass: 100.0,
            alive: true,
            spawn_protection: false,
            kills: 0,
            deaths: 0,
            bot: false,
            color_index: 0,
            spawn_tick: 0,
        }
    }

    fn snapshot(tick: u64, players: Vec<PlayerSnapshot>) -> crate::protocol::GameSnapshot {
        crate::protocol::GameSnapshot {
            tick,
            phase: MatchPhase::Playing,
            match_time: 0.0,
            countdown: 0.0,
            players,
            projectiles: Vec::new(),
            debris: Vec::new(),
            gravity_wells: Vec::new(),
            notable_players: Vec::new(),
            arena: ArenaState {
                collapse_phase: 0,
                safe_radius: 1000.0,
                scale: 1.0,
            },
            density_grid: Vec::new(),
            echo_client_time: 0,
        }
    }

    #[test]
    fn single_snapshot_matches_values_and_clones_vectors() {
        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(1, vec![base_player("p1", Vector::new(10.0, 20.0))]), 1000);
        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();

        let state = Interpolator::interpolate(&buf, 1000, 100.0, &mut lifecycle, &mut names).unwrap();
        let p = &state.players["p1"];
        assert_eq!(p.position, Vector::new(10.0, 20.0));

        // Mutating the returned state must not alias the buffer.
        let mut state2 = state.clone();
        state2.players.get_mut("p1").unwrap().position = Vector::new(999.0, 999.0);
        let state3 = Interpolator::interpolate(&buf, 1000, 100.0, &mut lifecycle, &mut names).unwrap();
        assert_eq!(state3.players["p1"].position, Vector::new(10.0, 20.0));
    }

    #[test]
    fn bracketing_interpolates_moving_player() {
        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(1, vec![base_player("p1", Vector::new(0.0, 0.0))]), 1000);
        buf.append(snapshot(2, vec![base_player("p1", Vector::new(100.0, 0.0))]), 1100);

        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();

        for k in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let render_now = 1000.0 + k * 100.0;
            let state = Interpolator::interpolate(&buf, render_now as u64, 0.0, &mut lifecycle, &mut names)
                .unwrap();
            let expected_x = 0.0 + (100.0 - 0.0) * k;
            assert!((state.players["p1"].position.x - expected_x).abs() < 0.5);
        }
    }

    #[test]
    fn respawn_snaps_instead_of_interpolating() {
        let mut dead = base_player("p1", Vector::new(0.0, 0.0));
        dead.alive = false;
        let mut alive = base_player("p1", Vector::new(500.0, 500.0));
        alive.spawn_protection = true;
        alive.spawn_tick = 99;

        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(1, vec![dead]), 1000);
        buf.append(snapshot(2, vec![alive]), 1100);

        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();

        let state = Interpolator::interpolate(&buf, 1050, 0.0, &mut lifecycle, &mut names).unwrap();
        assert_eq!(state.players["p1"].position, Vector::new(500.0, 500.0));
    }

    #[test]
    fn name_caching_persists_and_replaces_and_resets() {
        let mut named = base_player("p1", Vector::ZERO);
        named.name = Some("Alice".to_string());
        let unnamed = base_player("p1", Vector::ZERO);

        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(1, vec![named]), 1000);
        buf.append(snapshot(2, vec![unnamed.clone()]), 1100);

        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();

        let state = Interpolator::interpolate(&buf, 1050, 0.0, &mut lifecycle, &mut names).unwrap();
        assert_eq!(state.players["p1"].name, "Alice");

        names.reset();
        let mut buf2 = SnapshotBuffer::new();
        buf2.append(snapshot(1, vec![unnamed]), 1000);
        let mut lifecycle2 = LifecycleTracker::new();
        let state2 = Interpolator::interpolate(&buf2, 1000, 0.0, &mut lifecycle2, &mut names).unwrap();
        assert_eq!(state2.players["p1"].name, "");
    }

    #[test]
    fn shortest_angle_interpolation_wraps_correctly() {
        // From just under 2*pi to just over 0 should go forward, not backward.
        let a = 2.0 * PI - 0.1;
        let b = 0.1;
        let mid = lerp_angle(a, b, 0.5);
        // Expected to land near 0 (wrapping forward), not near pi.
        let normalized = mid.rem_euclid(2.0 * PI);
        assert!(normalized < 0.2 || normalized > 2.0 * PI - 0.2);
    }

    #[test]
    fn renderer_time_before_all_entries_uses_oldest() {
        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(1, vec![base_player("p1", Vector::new(1.0, 0.0))]), 1000);
        buf.append(snapshot(2, vec![base_player("p1", Vector::new(2.0, 0.0))]), 1100);
        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();
        let state = Interpolator::interpolate(&buf, 500, 0.0, &mut lifecycle, &mut names).unwrap();
        assert_eq!(state.players["p1"].position, Vector::new(1.0, 0.0));
    }

    #[test]
    fn renderer_time_after_all_entries_uses_newest() {
        let mut buf = SnapshotBuffer::new();
        buf.append(snapshot(1, vec![base_player("p1", Vector::new(1.0, 0.0))]), 1000);
        buf.append(snapshot(2, vec![base_player("p1", Vector::new(2.0, 0.0))]), 1100);
        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();
        let state = Interpolator::interpolate(&buf, 5000, 0.0, &mut lifecycle, &mut names).unwrap();
        assert_eq!(state.players["p1"].position, Vector::new(2.0, 0.0));
    }

    #[test]
    fn empty_buffer_yields_no_state() {
        let buf = SnapshotBuffer::new();
        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();
        assert!(Interpolator::interpolate(&buf, 1000, 0.0, &mut lifecycle, &mut names).is_none());
    }

    #[test]
    fn destroyed_well_filtered_from_output() {
        let mut snap = snapshot(1, Vec::new());
        snap.gravity_wells.push(GravityWellSnapshot {
            id: 9,
            position: Vector::ZERO,
            mass: 1.0,
            core_radius: 1.0,
        });
        let mut buf = SnapshotBuffer::new();
        buf.append(snap.clone(), 1000);

        let mut lifecycle = LifecycleTracker::new();
        let mut names = NameCache::new();
        lifecycle.mark_well_destroyed(9);

        let state = Interpolator::interpolate(&buf, 1000, 0.0, &mut lifecycle, &mut names).unwrap();
        assert!(!state.gravity_wells.contains_key(&9));

        // Server still lists it: stays filtered.
        assert!(lifecycle.is_well_destroyed(9));

        // Server now omits the well too -> unfiltered for future appearances.
        buf.append(snapshot(2, Vec::new()), 1033);
        let state = Interpolator::interpolate(&buf, 1033, 0.0, &mut lifecycle, &mut names).unwrap();
        assert!(!state.gravity_wells.contains_key(&9));
        assert!(!lifecycle.is_well_destroyed(9));
    }
}
