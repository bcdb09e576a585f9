//! # roomsense-domain
//!
//! Pure domain model for the roomsense presence engine.
//!
//! ## Responsibilities
//! - Foundational types: entity identifiers, state snapshots, timestamps
//! - Define **StateChange** events (what the hub fans out on every write)
//! - Define **ServiceCall** commands (what actuates devices)
//! - Define **RoomConfig** (per-room wiring and thresholds) and its validation
//! - Define **RoomState** (the occupancy state a room publishes)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod entity;
pub mod event;
pub mod room;
pub mod service;
pub mod state;
pub mod time;
