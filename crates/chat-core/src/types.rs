use serde::{Deserialize, Serialize};

/// Default background refresh cadence in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 4_000;

/// Denormalized sender info carried on every message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageSender {
    /// Sender user ID.
    pub id: String,
    /// Display nickname at fetch time.
    pub nickname: String,
}

/// Snapshot of the message a reply points at.
///
/// This is a copy taken when the message list was fetched, not a live
/// reference; it keeps rendering if the target is later deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Target message ID.
    pub id: String,
    /// Target message content at fetch time.
    pub content: String,
    /// Target message sender at fetch time.
    pub sender: MessageSender,
}

/// One chat message as served by the backend.
///
/// Immutable once created except for the two like fields, which change via
/// the optimistic like-toggle or wholesale replacement by load/poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned unique message ID.
    pub id: String,
    /// Room the message belongs to.
    pub room_id: String,
    /// Denormalized sender info.
    pub sender: MessageSender,
    /// Message body text.
    pub content: String,
    /// Optional reply target snapshot.
    pub reply_to: Option<ReplyTarget>,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at_ms: u64,
    /// Number of likes on the message.
    pub like_count: u32,
    /// Whether the current viewer has liked the message.
    pub liked_by_viewer: bool,
}

/// Room metadata fetched once per room mount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomInfo {
    /// Room ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// User ID of the room creator.
    pub creator_id: String,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created_at_ms: u64,
    /// Last-update timestamp in milliseconds since Unix epoch.
    pub updated_at_ms: u64,
}

/// Identity of the current viewer, projected in from the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AuthState {
    /// Whether a signed-in user is present.
    pub is_authenticated: bool,
    /// Viewer user ID when authenticated.
    pub user_id: Option<String>,
}

impl AuthState {
    /// Auth state for a signed-in user.
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            user_id: Some(user_id.into()),
        }
    }
}

/// Local reply-targeting sub-state.
///
/// `is_replying` and `target_message` move together; use the constructors so
/// the pair can never disagree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReplyMode {
    /// Whether the next send is a reply.
    pub is_replying: bool,
    /// Snapshot of the message being replied to.
    pub target_message: Option<Message>,
}

impl ReplyMode {
    /// Not replying.
    pub fn none() -> Self {
        Self::default()
    }

    /// Replying to the given message snapshot.
    pub fn replying(target: Message) -> Self {
        Self {
            is_replying: true,
            target_message: Some(target),
        }
    }

    /// ID of the reply target, when replying.
    pub fn target_id(&self) -> Option<&str> {
        self.target_message.as_ref().map(|message| message.id.as_str())
    }
}

/// Rollback snapshot recorded when a delete is applied optimistically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingDelete {
    /// The removed message, kept for reinsertion on failure.
    pub message: Message,
    /// The message's position in the collection before removal.
    pub index: usize,
}

/// Rollback snapshot recorded when a like-toggle is applied optimistically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingLikeToggle {
    /// Target message ID.
    pub message_id: String,
    /// Viewer-liked flag before the flip.
    pub liked_by_viewer: bool,
    /// Like count before the flip.
    pub like_count: u32,
}

/// In-flight markers for the loads and mutations the engine tracks.
///
/// At most one delete and one like-toggle may be outstanding at a time; the
/// pending snapshots double as the per-entity busy markers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LoadingMarkers {
    /// Whether a full message load is in flight.
    pub is_initial_loading: bool,
    /// Whether a send is in flight.
    pub is_sending: bool,
    /// Outstanding optimistic delete, when present.
    pub deleting: Option<PendingDelete>,
    /// Outstanding optimistic like-toggle, when present.
    pub toggling_like: Option<PendingLikeToggle>,
}

impl LoadingMarkers {
    /// ID of the message currently being deleted, when any.
    pub fn deleting_message_id(&self) -> Option<&str> {
        self.deleting
            .as_ref()
            .map(|pending| pending.message.id.as_str())
    }

    /// ID of the message whose like is currently being toggled, when any.
    pub fn toggling_like_message_id(&self) -> Option<&str> {
        self.toggling_like
            .as_ref()
            .map(|pending| pending.message_id.as_str())
    }
}

/// Which failure is currently surfaced to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No error surfaced.
    #[default]
    None,
    /// Room lookup failed; terminal for the room view.
    RoomNotFound,
    /// Message load failed; previously displayed messages are retained.
    MessageFetch,
    /// Send failed; input and reply mode are retained for retry.
    SendMessage,
    /// Delete failed; the optimistic removal was rolled back.
    DeleteMessage,
    /// Like-toggle failed; the optimistic flip was rolled back.
    ToggleLike,
}

/// Single surfaced error with human-readable text.
///
/// Overwritten or cleared by the next terminal action; background polling
/// failures never land here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorState {
    /// Error discriminant.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl ErrorState {
    /// No surfaced error.
    pub fn none() -> Self {
        Self::default()
    }

    /// Surfaced error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether no error is surfaced.
    pub fn is_none(&self) -> bool {
        self.kind == ErrorKind::None
    }
}

/// Background refresh bookkeeping.
///
/// The running task itself (cancellation token and join handle) is owned by
/// the session runtime, not by this state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingState {
    /// Whether the repeating refresh task is running.
    pub is_polling: bool,
    /// Fixed refresh cadence in milliseconds.
    pub interval_ms: u64,
}

impl PollingState {
    /// Polling state with the given cadence, not yet running.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            is_polling: false,
            interval_ms,
        }
    }
}

impl Default for PollingState {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL_MS)
    }
}

/// Full state of one mounted chat room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRoomState {
    /// Messages as of the latest load or accepted poll update.
    pub messages: Vec<Message>,
    /// Room metadata, once fetched.
    pub room_info: Option<RoomInfo>,
    /// Reply-targeting sub-state.
    pub reply_mode: ReplyMode,
    /// Draft text for the next send.
    pub message_input: String,
    /// Background refresh bookkeeping.
    pub polling: PollingState,
    /// In-flight load/mutation markers.
    pub loading: LoadingMarkers,
    /// Currently surfaced error.
    pub error: ErrorState,
    /// Viewer identity.
    pub auth: AuthState,
}

impl ChatRoomState {
    /// Fresh state for a newly mounted room.
    ///
    /// Starts with the initial-loading marker set, matching the first load
    /// that follows every mount.
    pub fn new(poll_interval_ms: u64) -> Self {
        Self {
            messages: Vec::new(),
            room_info: None,
            reply_mode: ReplyMode::none(),
            message_input: String::new(),
            polling: PollingState::new(poll_interval_ms),
            loading: LoadingMarkers {
                is_initial_loading: true,
                ..LoadingMarkers::default()
            },
            error: ErrorState::none(),
            auth: AuthState::default(),
        }
    }

    /// Look up a message by ID in the current collection.
    pub fn message_by_id(&self, message_id: &str) -> Option<&Message> {
        self.messages
            .iter()
            .find(|message| message.id == message_id)
    }
}

impl Default for ChatRoomState {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_mode_constructors_keep_flag_and_target_in_sync() {
        let none = ReplyMode::none();
        assert!(!none.is_replying);
        assert!(none.target_message.is_none());

        let target = Message {
            id: "m1".to_owned(),
            room_id: "r1".to_owned(),
            sender: MessageSender {
                id: "u1".to_owned(),
                nickname: "alice".to_owned(),
            },
            content: "hello".to_owned(),
            reply_to: None,
            created_at_ms: 1_700_000_000_000,
            like_count: 0,
            liked_by_viewer: false,
        };
        let replying = ReplyMode::replying(target);
        assert!(replying.is_replying);
        assert_eq!(replying.target_id(), Some("m1"));
    }

    #[test]
    fn fresh_state_starts_in_initial_loading() {
        let state = ChatRoomState::new(2_000);
        assert!(state.loading.is_initial_loading);
        assert!(!state.loading.is_sending);
        assert_eq!(state.loading.deleting_message_id(), None);
        assert_eq!(state.loading.toggling_like_message_id(), None);
        assert!(state.error.is_none());
        assert_eq!(state.polling.interval_ms, 2_000);
        assert!(!state.polling.is_polling);
    }

    #[test]
    fn error_kind_serializes_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::RoomNotFound).expect("serialize");
        assert_eq!(json, "\"room_not_found\"");
    }
}
