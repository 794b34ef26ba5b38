//! Room session runtime for the covechat sync engine.
//!
//! Wires user intents and asynchronous backend completions into the
//! `chat-core` state machine: optimistic mutation coordinators for send,
//! delete and like-toggle, the room mount/switch/teardown lifecycle with
//! generation-tagged completions, and the fixed-interval polling
//! controller.

/// Collaborator trait the engine synchronizes against.
pub mod api;
/// Fixed-interval background refresh task.
mod polling;
/// Room session: state ownership, coordinators and lifecycle.
pub mod session;

pub use api::{ChatApi, LikeToggle, NewMessage};
pub use session::{RoomSession, SessionConfig, SnapshotCallback};
