use std::collections::HashSet;

use crate::types::{ChatRoomState, ErrorState, Message, ReplyMode, RoomInfo};

/// Read-only projection of room state for rendering.
///
/// Recomputed from the latest state on every published change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Room metadata, once fetched.
    pub room_info: Option<RoomInfo>,
    /// Messages in ascending creation-time order.
    pub messages: Vec<Message>,
    /// IDs of messages authored by the current viewer.
    pub my_message_ids: HashSet<String>,
    /// Draft input text.
    pub message_input: String,
    /// Reply-targeting sub-state.
    pub reply_mode: ReplyMode,
    /// Currently surfaced error.
    pub error: ErrorState,
    /// Whether a full message load is in flight.
    pub is_initial_loading: bool,
    /// Whether a send is in flight.
    pub is_sending: bool,
    /// ID of the message currently being deleted, when any.
    pub deleting_message_id: Option<String>,
    /// ID of the message whose like is being toggled, when any.
    pub toggling_like_message_id: Option<String>,
    /// Whether the background refresh task is running.
    pub is_polling: bool,
    /// Whether a send would be accepted right now.
    pub can_send: bool,
}

impl RoomSnapshot {
    /// Project the current state into a renderable snapshot.
    pub fn project(state: &ChatRoomState) -> Self {
        let mut messages = state.messages.clone();
        // sort_by_key is stable: messages with equal timestamps keep their
        // arrival order across re-renders.
        messages.sort_by_key(|message| message.created_at_ms);

        let my_message_ids = match state.auth.user_id.as_deref() {
            Some(user_id) => state
                .messages
                .iter()
                .filter(|message| message.sender.id == user_id)
                .map(|message| message.id.clone())
                .collect(),
            None => HashSet::new(),
        };

        let can_send = !state.message_input.trim().is_empty()
            && state.auth.is_authenticated
            && !state.loading.is_sending;

        Self {
            room_info: state.room_info.clone(),
            messages,
            my_message_ids,
            message_input: state.message_input.clone(),
            reply_mode: state.reply_mode.clone(),
            error: state.error.clone(),
            is_initial_loading: state.loading.is_initial_loading,
            is_sending: state.loading.is_sending,
            deleting_message_id: state
                .loading
                .deleting_message_id()
                .map(ToOwned::to_owned),
            toggling_like_message_id: state
                .loading
                .toggling_like_message_id()
                .map(ToOwned::to_owned),
            is_polling: state.polling.is_polling,
            can_send,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::ChatRoomAction,
        types::{AuthState, MessageSender},
    };

    fn message(id: &str, sender_id: &str, created_at_ms: u64) -> Message {
        Message {
            id: id.to_owned(),
            room_id: "room-1".to_owned(),
            sender: MessageSender {
                id: sender_id.to_owned(),
                nickname: sender_id.to_owned(),
            },
            content: format!("message {id}"),
            reply_to: None,
            created_at_ms,
            like_count: 0,
            liked_by_viewer: false,
        }
    }

    #[test]
    fn messages_are_sorted_time_ascending() {
        let mut state = ChatRoomState::default();
        state.apply(ChatRoomAction::LoadSuccess {
            messages: vec![
                message("late", "u1", 300),
                message("early", "u1", 100),
                message("mid", "u1", 200),
            ],
        });

        let snapshot = RoomSnapshot::project(&state);
        let ids: Vec<&str> = snapshot.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "mid", "late"]);
    }

    #[test]
    fn equal_timestamps_keep_arrival_order() {
        let mut state = ChatRoomState::default();
        state.apply(ChatRoomAction::LoadSuccess {
            messages: vec![
                message("first", "u1", 100),
                message("second", "u1", 100),
                message("third", "u1", 100),
            ],
        });

        let snapshot = RoomSnapshot::project(&state);
        let ids: Vec<&str> = snapshot.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn my_message_ids_match_viewer_by_sender_id() {
        let mut state = ChatRoomState::default();
        state.apply(ChatRoomAction::SetAuth {
            auth: AuthState::authenticated("me"),
        });
        state.apply(ChatRoomAction::LoadSuccess {
            messages: vec![
                message("mine", "me", 100),
                message("theirs", "them", 200),
            ],
        });

        let snapshot = RoomSnapshot::project(&state);
        assert!(snapshot.my_message_ids.contains("mine"));
        assert!(!snapshot.my_message_ids.contains("theirs"));
    }

    #[test]
    fn my_message_ids_are_empty_without_a_viewer() {
        let mut state = ChatRoomState::default();
        state.apply(ChatRoomAction::LoadSuccess {
            messages: vec![message("m1", "u1", 100)],
        });

        let snapshot = RoomSnapshot::project(&state);
        assert!(snapshot.my_message_ids.is_empty());
    }

    #[test]
    fn can_send_requires_text_auth_and_idle_send() {
        let mut state = ChatRoomState::default();
        state.apply(ChatRoomAction::SetAuth {
            auth: AuthState::authenticated("me"),
        });

        assert!(!RoomSnapshot::project(&state).can_send);

        state.apply(ChatRoomAction::SetInput {
            value: "   ".to_owned(),
        });
        assert!(!RoomSnapshot::project(&state).can_send);

        state.apply(ChatRoomAction::SetInput {
            value: " hello ".to_owned(),
        });
        assert!(RoomSnapshot::project(&state).can_send);

        state.apply(ChatRoomAction::SendStart);
        assert!(!RoomSnapshot::project(&state).can_send);

        state.apply(ChatRoomAction::SendFailure {
            message: "boom".to_owned(),
        });
        assert!(RoomSnapshot::project(&state).can_send);

        state.apply(ChatRoomAction::SetAuth {
            auth: AuthState::default(),
        });
        assert!(!RoomSnapshot::project(&state).can_send);
    }
}
