//! Reconstructs a full [`GameSnapshot`] from a base buffer entry plus a
//! [`DeltaUpdate`], or drops the delta if its base tick is missing.

use tracing::debug;

use crate::buffer::SnapshotBuffer;
use crate::protocol::{DeltaUpdate, GameSnapshot, ProjectileSnapshot};

/// Attempt to reconstruct a full snapshot from `delta` against `buffer`.
/// Returns `None` (and logs at `debug!`) if the delta's `base_tick` is not
/// present in the buffer — per spec, a silently recoverable condition,
/// not an error.
pub fn apply_delta(buffer: &SnapshotBuffer, delta: &DeltaUpdate) -> Option<GameSnapshot> {
    let base_entry = match buffer.find_by_tick(delta.base_tick) {
        Some(entry) => entry,
        None => {
            debug!(
                base_tick = delta.base_tick,
                tick = delta.tick,
                "dropping delta: base snapshot not in buffer"
            );
            return None;
        }
    };

    let mut snapshot = base_entry.snapshot.clone();
    snapshot.tick = delta.tick;

    // Debris is always a full replacement, never incremental.
    snapshot.debris = delta.debris.clone();

    for player_delta in &delta.player_updates {
        let Some(player) = snapshot
            .players
            .iter_mut()
            .find(|p| p.id == player_delta.id)
        else {
            // Unknown player id: ignore this delta entry; creations arrive
            // via a full snapshot, not a delta.
            continue;
        };

        if let Some(position) = player_delta.position {
            player.position = position;
        }
        if let Some(velocity) = player_delta.velocity {
            player.velocity = velocity;
        }
        if let Some(rotation) = player_delta.rotation {
            player.rotation = rotation;
        }
        if let Some(mass) = player_delta.mass {
            player.mass = mass;
        }
        if let Some(alive) = player_delta.alive {
            player.alive = alive;
        }
        if let Some(kills) = player_delta.kills {
            player.kills = kills;
        }
    }

    for projectile_delta in &delta.projectile_updates {
        match snapshot
            .projectiles
            .iter_mut()
            .find(|p| p.id == projectile_delta.id)
        {
            Some(projectile) => {
                projectile.position = projectile_delta.position;
                projectile.velocity = projectile_delta.velocity;
            }
            None => {
                // New id: append with a placeholder owner/mass, patched by
                // the next full snapshot.
                snapshot.projectiles.push(ProjectileSnapshot {
                    id: projectile_delta.id,
                    owner_id: String::new(),
                    position: projectile_delta.position,
                    velocity: projectile_delta.velocity,
                    mass: 1.0,
                });
            }
        }
    }

    if !delta.removed_projectiles.is_empty() {
        snapshot
            .projectiles
            .retain(|p| !delta.removed_projectiles.contains(&p.id));
    }

    Some(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        ArenaState, MatchPhase, PlayerDelta, PlayerSnapshot, ProjectileDelta, Vector,
    };

    fn base_player(id: &str, position: Vector, mass: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            id: id.to_string(),
            name: None,
            position,
            velocity: Vector::ZERO,
            rotation: 0.0,
            mass,
            alive: true,
            spawn_protection: false,
            kills: 0,
            deaths: 0,
            bot: false,
            color_index: 0,
            spawn_tick: 0,
        }
    }

    fn base_snapshot(tick: u64, players: Vec<PlayerSnapshot>) -> GameSnapshot {
        GameSnapshot {
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
    fn missing_base_is_dropped() {
        let buffer = SnapshotBuffer::new();
        let delta = DeltaUpdate {
            tick: 15,
            base_tick: 10,
            player_updates: Vec::new(),
            projectile_updates: Vec::new(),
            removed_projectiles: Vec::new(),
            debris: Vec::new(),
        };
        assert!(apply_delta(&buffer, &delta).is_none());
    }

    #[test]
    fn scenario_s4_delta_path() {
        let mut buffer = SnapshotBuffer::new();
        buffer.append(
            base_snapshot(10, vec![base_player("P", Vector::new(100.0, 100.0), 100.0)]),
            0,
        );

        let delta = DeltaUpdate {
            tick: 15,
            base_tick: 10,
            player_updates: vec![PlayerDelta {
                id: "P".to_string(),
                position: Some(Vector::new(200.0, 200.0)),
                velocity: None,
                rotation: None,
                mass: Some(150.0),
                alive: None,
                kills: None,
            }],
            projectile_updates: Vec::new(),
            removed_projectiles: Vec::new(),
            debris: Vec::new(),
        };

        let reconstructed = apply_delta(&buffer, &delta).unwrap();
        assert_eq!(reconstructed.tick, 15);
        let p = &reconstructed.players[0];
        assert_eq!(p.position, Vector::new(200.0, 200.0));
        assert_eq!(p.mass, 150.0);
        assert_eq!(p.velocity, Vector::ZERO); // inherited from base

        // Base entry itself is untouched.
        assert_eq!(buffer.find_by_tick(10).unwrap().snapshot.tick, 10);
        let base_player = &buffer.find_by_tick(10).unwrap().snapshot.players[0];
        assert_eq!(base_player.position, Vector::new(100.0, 100.0));
    }

    #[test]
    fn empty_delta_preserves_base_save_for_tick() {
        let mut buffer = SnapshotBuffer::new();
        buffer.append(base_snapshot(10, vec![base_player("P", Vector::new(1.0, 2.0), 80.0)]), 0);

        let delta = DeltaUpdate {
            tick: 11,
            base_tick: 10,
            player_updates: Vec::new(),
            projectile_updates: Vec::new(),
            removed_projectiles: Vec::new(),
            debris: Vec::new(),
        };

        let reconstructed = apply_delta(&buffer, &delta).unwrap();
        let base = buffer.find_by_tick(10).unwrap().snapshot.clone();
        assert_eq!(reconstructed.players, base.players);
        assert_ne!(reconstructed.tick, base.tick);
    }

    #[test]
    fn unknown_player_delta_entry_is_ignored() {
        let mut buffer = SnapshotBuffer::new();
        buffer.append(base_snapshot(10, vec![base_player("P", Vector::ZERO, 100.0)]), 0);

        let delta = DeltaUpdate {
            tick: 11,
            base_tick: 10,
            player_updates: vec![PlayerDelta {
                id: "ghost".to_string(),
                position: Some(Vector::new(5.0, 5.0)),
                ..Default::default()
            }],
            projectile_updates: Vec::new(),
            removed_projectiles: Vec::new(),
            debris: Vec::new(),
        };

        let reconstructed = apply_delta(&buffer, &delta).unwrap();
        assert_eq!(reconstructed.players.len(), 1);
        assert_eq!(reconstructed.players[0].id, "P");
    }

    #[test]
    fn new_projectile_gets_placeholder_owner_and_mass() {
        let mut buffer = SnapshotBuffer::new();
        buffer.append(base_snapshot(10, Vec::new()), 0);

        let delta = DeltaUpdate {
            tick: 11,
            base_tick: 10,
            player_updates: Vec::new(),
            projectile_updates: vec![ProjectileDelta {
                id: 7,
                position: Vector::new(1.0, 1.0),
                velocity: Vector::new(0.0, 0.0),
            }],
            removed_projectiles: Vec::new(),
            debris: Vec::new(),
        };

        let reconstructed = apply_delta(&buffer, &delta).unwrap();
        let proj = &reconstructed.projectiles[0];
        assert_eq!(proj.owner_id, "");
        assert_eq!(proj.mass, 1.0);
    }

    #[test]
    fn removed_projectiles_are_dropped() {
        let mut buffer = SnapshotBuffer::new();
        let mut base = base_snapshot(10, Vec::new());
        base.projectiles.push(ProjectileSnapshot {
            id: 3,
            owner_id: "P".to_string(),
            position: Vector::ZERO,
            velocity: Vector::ZERO,
            mass: 1.0,
        });
        buffer.append(base, 0);

        let delta = DeltaUpdate {
            tick: 11,
            base_tick: 10,
            player_updates: Vec::new(),
            projectile_updates: Vec::new(),
            removed_projectiles: vec![3],
            debris: Vec::new(),
        };

        let reconstructed = apply_delta(&buffer, &delta).unwrap();
        assert!(reconstructed.projectiles.is_empty());
    }

    #[test]
    fn debris_is_replaced_wholesale() {
        use crate::protocol::{DebrisSize, DebrisSnapshot};
        let mut buffer = SnapshotBuffer::new();
        let mut base = base_snapshot(10, Vec::new());
        base.debris.push(DebrisSnapshot {
            id: 1,
            position: Vector::ZERO,
            size_class: DebrisSize::Small,
        });
        buffer.append(base, 0);

        let delta = DeltaUpdate {
            tick: 11,
            base_tick: 10,
            player_updates: Vec::new(),
            projectile_updates: Vec::new(),
            removed_projectiles: Vec::new(),
            debris: vec![DebrisSnapshot {
                id: 2,
                position: Vector::new(5.0, 5.0),
                size_class: DebrisSize::Large,
            }],
        };

        let reconstructed = apply_delta(&buffer, &delta).unwrap();
        assert_eq!(reconstructed.debris.len(), 1);
        assert_eq!(reconstructed.debris[0].id, 2);
    }
}
