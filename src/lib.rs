//! Network state synchronization engine for a realtime multiplayer ship
//! battle-royale client.
//!
//! Turns the server's low-rate, unreliable snapshot/delta stream into a
//! smooth, locally-responsive world for a 60+ Hz render loop: a bounded
//! snapshot buffer feeds an adaptive-delay interpolator, deltas rehydrate
//! against a buffered base tick, and client-side prediction reconciles the
//! local player's pose against each authoritative snapshot that contains
//! it. See [`engine::NetworkEngine`] for the facade that composes all of
//! this; everything else in this crate is a module it delegates to.
//!
//! This crate never opens a socket; the wire transport, input capture,
//! rendering, and UI are the integrator's responsibility. It only
//! consumes decoded [`protocol::ServerMsg`] values and produces
//! [`protocol::InterpolatedState`] for a renderer to draw.

pub mod buffer;
pub mod clock;
pub mod config;
pub mod delay;
pub mod delta;
pub mod engine;
pub mod error;
pub mod interpolate;
pub mod lifecycle;
pub mod predict;
pub mod protocol;

pub use engine::NetworkEngine;
pub use error::EngineError;
