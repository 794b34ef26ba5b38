//! Core room-synchronization contract shared by the engine and its hosts.
//!
//! This crate defines the entity model, the action taxonomy, the state
//! machine that serializes every concurrent effect into one timeline, the
//! poll change detector, the derived view projector, and the stable
//! collaborator error payload. It performs no I/O.

/// Action taxonomy applied through the state machine.
pub mod action;
/// Change detector gating poll updates.
pub mod diff;
/// Stable collaborator error types and HTTP classification helpers.
pub mod error;
/// Room state machine (reducer).
pub mod state_machine;
/// Entity model and state-slice types.
pub mod types;
/// Derived read-only view projection.
pub mod view;

pub use action::ChatRoomAction;
pub use diff::messages_changed;
pub use error::{ApiError, ApiErrorCategory, classify_http_status};
pub use types::{
    AuthState, ChatRoomState, DEFAULT_POLL_INTERVAL_MS, ErrorKind, ErrorState, LoadingMarkers,
    Message, MessageSender, PendingDelete, PendingLikeToggle, PollingState, ReplyMode,
    ReplyTarget, RoomInfo,
};
pub use view::RoomSnapshot;
