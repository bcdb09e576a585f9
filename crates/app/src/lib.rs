//! # roomsense-app
//!
//! Application layer — the room engine and its **port definitions**.
//!
//! ## Responsibilities
//! - Define the **Hub port** (trait) that host adapters implement:
//!   entity state reads/writes, service calls, and the state-change stream
//! - Evaluate presence, ambient light, and day/night mode (`RoomEvaluator`)
//! - Drive one **room state machine** per configured room (`RoomPresence`):
//!   an occupancy window with a single replaceable expiry timer, an enable
//!   switch gate, and a watchdog sweep that adopts manually-switched devices
//! - Publish the room state and its diagnostics back through the hub
//!
//! ## Dependency rule
//! Depends on `roomsense-domain` only (plus `tokio` for channels and time).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod engine;
pub mod evaluator;
pub mod ports;
