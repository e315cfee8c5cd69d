//! Wire protocol and data model shared with `ship_game_server`.
//!
//! Mirrors the tagged-enum style of the server's `ws::protocol` module so a
//! message produced by the server decodes directly into these types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A 2D vector. `glam::Vec2` is `Copy`, so every emission of a `Vector`
/// from the buffer into render output is automatically a value copy, not
/// an alias — the cloning discipline the spec calls for falls out of the
/// type rather than needing to be hand-enforced.
pub type Vector = glam::Vec2;

/// A non-negative monotonic server simulation step.
pub type Tick = u64;

/// Opaque player identity, as carried over the wire.
pub type PlayerId = String;

/// Current phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Waiting,
    Countdown,
    Playing,
    Ended,
}

/// Authoritative state of one player at a snapshot tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub position: Vector,
    pub velocity: Vector,
    pub rotation: f32,
    pub mass: f32,
    pub alive: bool,
    pub spawn_protection: bool,
    pub kills: u32,
    pub deaths: u32,
    pub bot: bool,
    pub color_index: u32,
    pub spawn_tick: Tick,
}

/// Authoritative state of one projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub owner_id: PlayerId,
    pub position: Vector,
    pub velocity: Vector,
    pub mass: f32,
}

/// Debris size class. Debris has no velocity; it is repositioned wholesale
/// each snapshot. Wire representation is the numeric `0|1|2` the spec
/// calls for, not the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DebrisSize {
    Small,
    Medium,
    Large,
}

impl From<DebrisSize> for u8 {
    fn from(size: DebrisSize) -> Self {
        match size {
            DebrisSize::Small => 0,
            DebrisSize::Medium => 1,
            DebrisSize::Large => 2,
        }
    }
}

impl TryFrom<u8> for DebrisSize {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DebrisSize::Small),
            1 => Ok(DebrisSize::Medium),
            2 => Ok(DebrisSize::Large),
            other => Err(format!("invalid debris size class: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebrisSnapshot {
    pub id: u64,
    pub position: Vector,
    pub size_class: DebrisSize,
}

/// Authoritative state of a gravity well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GravityWellSnapshot {
    pub id: u64,
    pub position: Vector,
    pub mass: f32,
    pub core_radius: f32,
}

/// A high-mass player echoed for global minimap visibility irrespective of
/// area-of-interest culling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotablePlayerSnapshot {
    pub id: PlayerId,
    pub position: Vector,
    pub mass: f32,
    pub color_index: u32,
}

/// Arena-wide battle-royale collapse state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaState {
    pub collapse_phase: u32,
    pub safe_radius: f32,
    pub scale: f32,
}

/// A full authoritative game state at a given tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub tick: Tick,
    pub phase: MatchPhase,
    pub match_time: f32,
    pub countdown: f32,
    pub players: Vec<PlayerSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub debris: Vec<DebrisSnapshot>,
    pub gravity_wells: Vec<GravityWellSnapshot>,
    pub notable_players: Vec<NotablePlayerSnapshot>,
    pub arena: ArenaState,
    pub density_grid: Vec<f32>,
    /// Echoed client timestamp for RTT measurement, 0 if not requested.
    #[serde(default)]
    pub echo_client_time: u64,
}

/// A partial update of one player's fields relative to the delta's base
/// snapshot. Fields not present inherit from the base player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerDelta {
    pub id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kills: Option<u32>,
}

/// A partial update of one projectile. New ids imply creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileDelta {
    pub id: u64,
    pub position: Vector,
    pub velocity: Vector,
}

/// An incremental update referencing a prior tick as base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaUpdate {
    pub tick: Tick,
    pub base_tick: Tick,
    #[serde(default)]
    pub player_updates: Vec<PlayerDelta>,
    #[serde(default)]
    pub projectile_updates: Vec<ProjectileDelta>,
    #[serde(default)]
    pub removed_projectiles: Vec<u64>,
    /// Always a full list, never incremental.
    pub debris: Vec<DebrisSnapshot>,
}

/// Input captured for the local player at one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub sequence: u32,
    pub tick: Tick,
    pub client_time: u64,
    pub thrust: Vector,
    pub aim: Vector,
    pub boost: bool,
    pub fire: bool,
    pub fire_released: bool,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Join { name: String },
    Input(PlayerInput),
    Ping { t: u64 },
    Leave,
}

/// A non-snapshot, non-delta server event. Opaque to this crate; handed to
/// other subsystems per the spec's external-interfaces section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: String,
    pub payload: serde_json::Value,
}

/// Messages sent from server to client. `Snapshot` and `Delta` are
/// consumed by this crate; the rest are opaque payloads for other
/// subsystems (matchmaking UI, chat, phase banners, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    Snapshot(GameSnapshot),
    Delta(DeltaUpdate),
    Pong { t: u64 },
    JoinAccepted { player_id: PlayerId },
    Kicked { reason: String },
    Event(GameEvent),
    PhaseChange { phase: MatchPhase },
    GravityWellDestroyed { id: u64 },
}

/// Render-facing, keyed mirror of a player in `InterpolatedState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedPlayer {
    pub id: PlayerId,
    pub name: String,
    pub position: Vector,
    pub velocity: Vector,
    pub rotation: f32,
    pub mass: f32,
    pub alive: bool,
    pub spawn_protection: bool,
    pub kills: u32,
    pub deaths: u32,
    pub bot: bool,
    pub color_index: u32,
    /// Wall-clock ms the renderer should treat as "start of birth
    /// animation"; 0 means no animation should play.
    pub born_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedProjectile {
    pub id: u64,
    pub owner_id: PlayerId,
    pub position: Vector,
    pub velocity: Vector,
    pub mass: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedDebris {
    pub id: u64,
    pub position: Vector,
    pub size_class: DebrisSize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedWell {
    pub id: u64,
    pub position: Vector,
    pub mass: f32,
    pub core_radius: f32,
    pub born_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedNotablePlayer {
    pub id: PlayerId,
    pub position: Vector,
    pub mass: f32,
    pub color_index: u32,
}

/// Render-ready reconstruction of the world at a given render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolatedState {
    pub tick: Tick,
    pub phase: MatchPhase,
    pub match_time: f32,
    pub countdown: f32,
    pub players: HashMap<PlayerId, InterpolatedPlayer>,
    pub projectiles: HashMap<u64, InterpolatedProjectile>,
    pub debris: HashMap<u64, InterpolatedDebris>,
    pub gravity_wells: HashMap<u64, InterpolatedWell>,
    pub notable_players: HashMap<PlayerId, InterpolatedNotablePlayer>,
    pub arena: ArenaState,
    pub density_grid: Vec<f32>,
}

/// Predicted local-player pose overlaid on top of the interpolated world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictedPose {
    pub position: Vector,
    pub velocity: Vector,
}
