use serde::{Deserialize, Serialize};

use crate::types::{AuthState, ErrorState, Message, RoomInfo};

/// One transition of the room state machine.
///
/// Every concurrent effect — user intents, coordinator completions, poll
/// results — is expressed as one of these and serialized through
/// `ChatRoomState::apply`. Each variant carries exactly the payload its
/// transition needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatRoomAction {
    /// Replace the viewer identity.
    SetAuth {
        /// New auth state.
        auth: AuthState,
    },
    /// Replace room metadata after a successful room fetch.
    SetRoomInfo {
        /// Fetched room metadata.
        info: RoomInfo,
    },
    /// A full message load started.
    LoadStart,
    /// A full message load succeeded; replaces the whole collection.
    LoadSuccess {
        /// Authoritative message set.
        messages: Vec<Message>,
    },
    /// A full message load failed; previously displayed messages stay.
    LoadFailure {
        /// Human-readable failure text.
        message: String,
    },
    /// A send started.
    SendStart,
    /// A send succeeded; clears input, reply mode, marker and error.
    SendSuccess,
    /// A send failed; input and reply mode are left intact for retry.
    SendFailure {
        /// Human-readable failure text.
        message: String,
    },
    /// Optimistically remove a message and record the rollback snapshot.
    DeleteStart {
        /// Target message ID.
        message_id: String,
    },
    /// The delete was confirmed; the removal already applied.
    DeleteSuccess,
    /// The delete failed; reinsert the snapshot at its original position.
    DeleteFailure {
        /// Target message ID.
        message_id: String,
    },
    /// Optimistically flip the viewer-like flag and adjust the count.
    ToggleLikeStart {
        /// Target message ID.
        message_id: String,
    },
    /// The like-toggle was confirmed; the optimistic value stands.
    ToggleLikeSuccess {
        /// Target message ID.
        message_id: String,
        /// Server-reported liked flag; logged, not retrofitted.
        liked: bool,
    },
    /// The like-toggle failed; restore the pre-flip flag and count.
    ToggleLikeFailure {
        /// Target message ID.
        message_id: String,
    },
    /// Enter reply mode targeting a currently loaded message.
    StartReply {
        /// Target message ID.
        message_id: String,
    },
    /// Leave reply mode unconditionally.
    CancelReply,
    /// Replace the draft input text.
    SetInput {
        /// New draft text.
        value: String,
    },
    /// Clear the draft input text.
    ClearInput,
    /// The background refresh task started.
    PollingStarted,
    /// The background refresh task stopped.
    PollingStopped,
    /// A background refresh returned the full live message set.
    PollUpdate {
        /// Fetched message set; applied only when judged different.
        messages: Vec<Message>,
    },
    /// Surface an error directly (room-initialization failure path).
    SetError {
        /// Error to surface.
        error: ErrorState,
    },
    /// Dismiss the surfaced error.
    ClearError,
}

impl ChatRoomAction {
    /// Stable label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ChatRoomAction::SetAuth { .. } => "SetAuth",
            ChatRoomAction::SetRoomInfo { .. } => "SetRoomInfo",
            ChatRoomAction::LoadStart => "LoadStart",
            ChatRoomAction::LoadSuccess { .. } => "LoadSuccess",
            ChatRoomAction::LoadFailure { .. } => "LoadFailure",
            ChatRoomAction::SendStart => "SendStart",
            ChatRoomAction::SendSuccess => "SendSuccess",
            ChatRoomAction::SendFailure { .. } => "SendFailure",
            ChatRoomAction::DeleteStart { .. } => "DeleteStart",
            ChatRoomAction::DeleteSuccess => "DeleteSuccess",
            ChatRoomAction::DeleteFailure { .. } => "DeleteFailure",
            ChatRoomAction::ToggleLikeStart { .. } => "ToggleLikeStart",
            ChatRoomAction::ToggleLikeSuccess { .. } => "ToggleLikeSuccess",
            ChatRoomAction::ToggleLikeFailure { .. } => "ToggleLikeFailure",
            ChatRoomAction::StartReply { .. } => "StartReply",
            ChatRoomAction::CancelReply => "CancelReply",
            ChatRoomAction::SetInput { .. } => "SetInput",
            ChatRoomAction::ClearInput => "ClearInput",
            ChatRoomAction::PollingStarted => "PollingStarted",
            ChatRoomAction::PollingStopped => "PollingStopped",
            ChatRoomAction::PollUpdate { .. } => "PollUpdate",
            ChatRoomAction::SetError { .. } => "SetError",
            ChatRoomAction::ClearError => "ClearError",
        }
    }
}
