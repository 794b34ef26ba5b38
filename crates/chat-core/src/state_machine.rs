use tracing::{debug, warn};

use crate::{
    action::ChatRoomAction,
    diff::messages_changed,
    types::{
        ChatRoomState, ErrorKind, ErrorState, PendingDelete, PendingLikeToggle, ReplyMode,
    },
};

const DELETE_FAILED_TEXT: &str = "Failed to delete the message.";
const TOGGLE_LIKE_FAILED_TEXT: &str = "Failed to update the like.";

impl ChatRoomState {
    /// Apply one action to completion.
    ///
    /// This is the only mutator of room state; callers must serialize
    /// invocations (one action at a time). Returns whether observable state
    /// changed — `false` only for judged no-ops such as a poll update with
    /// no content-relevant difference or a start action whose target
    /// message is not in the collection.
    pub fn apply(&mut self, action: ChatRoomAction) -> bool {
        match action {
            ChatRoomAction::SetAuth { auth } => {
                self.auth = auth;
                true
            }
            ChatRoomAction::SetRoomInfo { info } => {
                self.room_info = Some(info);
                true
            }
            ChatRoomAction::LoadStart => {
                self.loading.is_initial_loading = true;
                true
            }
            ChatRoomAction::LoadSuccess { messages } => {
                self.messages = messages;
                self.loading.is_initial_loading = false;
                self.error = ErrorState::none();
                true
            }
            ChatRoomAction::LoadFailure { message } => {
                // Keep whatever was on screen; a transient fetch failure
                // must not blank a populated view.
                self.loading.is_initial_loading = false;
                self.error = ErrorState::new(ErrorKind::MessageFetch, message);
                true
            }
            ChatRoomAction::SendStart => {
                self.loading.is_sending = true;
                true
            }
            ChatRoomAction::SendSuccess => {
                self.message_input.clear();
                self.reply_mode = ReplyMode::none();
                self.loading.is_sending = false;
                self.error = ErrorState::none();
                true
            }
            ChatRoomAction::SendFailure { message } => {
                self.loading.is_sending = false;
                self.error = ErrorState::new(ErrorKind::SendMessage, message);
                true
            }
            ChatRoomAction::DeleteStart { message_id } => {
                let Some(index) = self
                    .messages
                    .iter()
                    .position(|message| message.id == message_id)
                else {
                    warn!(%message_id, "delete start ignored: message not in collection");
                    return false;
                };
                let message = self.messages.remove(index);
                self.loading.deleting = Some(PendingDelete { message, index });
                true
            }
            ChatRoomAction::DeleteSuccess => {
                self.loading.deleting = None;
                self.error = ErrorState::none();
                true
            }
            ChatRoomAction::DeleteFailure { message_id } => {
                match self.loading.deleting.take() {
                    Some(pending) if pending.message.id == message_id => {
                        // Restore to the snapshotted position; clamp in case
                        // polls shrank the collection meanwhile. A poll may
                        // already have brought the message back, in which
                        // case there is nothing to reinsert.
                        if self.message_by_id(&message_id).is_none() {
                            let index = pending.index.min(self.messages.len());
                            self.messages.insert(index, pending.message);
                        }
                    }
                    other => {
                        self.loading.deleting = other;
                        warn!(%message_id, "delete rollback without matching pending delete");
                    }
                }
                self.error = ErrorState::new(ErrorKind::DeleteMessage, DELETE_FAILED_TEXT);
                true
            }
            ChatRoomAction::ToggleLikeStart { message_id } => {
                let Some(message) = self
                    .messages
                    .iter_mut()
                    .find(|message| message.id == message_id)
                else {
                    warn!(%message_id, "like toggle start ignored: message not in collection");
                    return false;
                };
                self.loading.toggling_like = Some(PendingLikeToggle {
                    message_id,
                    liked_by_viewer: message.liked_by_viewer,
                    like_count: message.like_count,
                });
                if message.liked_by_viewer {
                    message.liked_by_viewer = false;
                    message.like_count = message.like_count.saturating_sub(1);
                } else {
                    message.liked_by_viewer = true;
                    message.like_count += 1;
                }
                true
            }
            ChatRoomAction::ToggleLikeSuccess { message_id, liked } => {
                // The optimistic value stands; the server's flag is only
                // diagnostic here and the next poll reconciles divergence.
                debug!(%message_id, server_liked = liked, "like toggle acknowledged");
                self.loading.toggling_like = None;
                self.error = ErrorState::none();
                true
            }
            ChatRoomAction::ToggleLikeFailure { message_id } => {
                match self.loading.toggling_like.take() {
                    Some(pending) if pending.message_id == message_id => {
                        if let Some(message) = self
                            .messages
                            .iter_mut()
                            .find(|message| message.id == message_id)
                        {
                            message.liked_by_viewer = pending.liked_by_viewer;
                            message.like_count = pending.like_count;
                        }
                    }
                    other => {
                        self.loading.toggling_like = other;
                        warn!(%message_id, "like rollback without matching pending toggle");
                    }
                }
                self.error = ErrorState::new(ErrorKind::ToggleLike, TOGGLE_LIKE_FAILED_TEXT);
                true
            }
            ChatRoomAction::StartReply { message_id } => {
                let Some(target) = self.message_by_id(&message_id).cloned() else {
                    warn!(%message_id, "reply start ignored: message not in collection");
                    return false;
                };
                self.reply_mode = ReplyMode::replying(target);
                true
            }
            ChatRoomAction::CancelReply => {
                self.reply_mode = ReplyMode::none();
                true
            }
            ChatRoomAction::SetInput { value } => {
                self.message_input = value;
                true
            }
            ChatRoomAction::ClearInput => {
                self.message_input.clear();
                true
            }
            ChatRoomAction::PollingStarted => {
                self.polling.is_polling = true;
                true
            }
            ChatRoomAction::PollingStopped => {
                self.polling.is_polling = false;
                true
            }
            ChatRoomAction::PollUpdate { messages } => {
                if !messages_changed(&self.messages, &messages) {
                    return false;
                }
                self.messages = messages;
                true
            }
            ChatRoomAction::SetError { error } => {
                self.error = error;
                true
            }
            ChatRoomAction::ClearError => {
                self.error = ErrorState::none();
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthState, Message, MessageSender};

    fn message(id: &str, created_at_ms: u64, like_count: u32, liked: bool) -> Message {
        Message {
            id: id.to_owned(),
            room_id: "room-1".to_owned(),
            sender: MessageSender {
                id: "user-1".to_owned(),
                nickname: "alice".to_owned(),
            },
            content: format!("message {id}"),
            reply_to: None,
            created_at_ms,
            like_count,
            liked_by_viewer: liked,
        }
    }

    fn state_with_messages(messages: Vec<Message>) -> ChatRoomState {
        let mut state = ChatRoomState::default();
        state.apply(ChatRoomAction::LoadSuccess { messages });
        state
    }

    #[test]
    fn load_failure_preserves_displayed_messages() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);

        state.apply(ChatRoomAction::LoadStart);
        state.apply(ChatRoomAction::LoadFailure {
            message: "network down".to_owned(),
        });

        assert_eq!(state.messages.len(), 1);
        assert!(!state.loading.is_initial_loading);
        assert_eq!(state.error.kind, ErrorKind::MessageFetch);
        assert_eq!(state.error.message, "network down");
    }

    #[test]
    fn load_success_replaces_collection_and_clears_error() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);
        state.apply(ChatRoomAction::LoadFailure {
            message: "transient".to_owned(),
        });

        state.apply(ChatRoomAction::LoadSuccess {
            messages: vec![message("m2", 20, 1, true)],
        });

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].id, "m2");
        assert!(state.error.is_none());
    }

    #[test]
    fn send_success_clears_input_reply_and_error() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);
        state.apply(ChatRoomAction::SetInput {
            value: "hello".to_owned(),
        });
        state.apply(ChatRoomAction::StartReply {
            message_id: "m1".to_owned(),
        });
        state.apply(ChatRoomAction::SendStart);
        assert!(state.loading.is_sending);

        state.apply(ChatRoomAction::SendSuccess);

        assert!(state.message_input.is_empty());
        assert!(!state.reply_mode.is_replying);
        assert!(state.reply_mode.target_message.is_none());
        assert!(!state.loading.is_sending);
        assert!(state.error.is_none());
    }

    #[test]
    fn send_failure_keeps_input_and_reply_for_retry() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);
        state.apply(ChatRoomAction::SetInput {
            value: "hello".to_owned(),
        });
        state.apply(ChatRoomAction::StartReply {
            message_id: "m1".to_owned(),
        });
        state.apply(ChatRoomAction::SendStart);

        state.apply(ChatRoomAction::SendFailure {
            message: "rejected".to_owned(),
        });

        assert_eq!(state.message_input, "hello");
        assert!(state.reply_mode.is_replying);
        assert!(!state.loading.is_sending);
        assert_eq!(state.error.kind, ErrorKind::SendMessage);
    }

    #[test]
    fn delete_start_removes_message_and_records_marker() {
        let mut state = state_with_messages(vec![
            message("m1", 10, 0, false),
            message("m2", 20, 0, false),
            message("m3", 30, 0, false),
        ]);

        state.apply(ChatRoomAction::DeleteStart {
            message_id: "m2".to_owned(),
        });

        assert_eq!(state.messages.len(), 2);
        assert!(state.message_by_id("m2").is_none());
        assert_eq!(state.loading.deleting_message_id(), Some("m2"));
    }

    #[test]
    fn delete_failure_restores_message_at_original_position() {
        let mut state = state_with_messages(vec![
            message("m1", 10, 0, false),
            message("m2", 20, 0, false),
            message("m3", 30, 0, false),
        ]);

        state.apply(ChatRoomAction::DeleteStart {
            message_id: "m2".to_owned(),
        });
        state.apply(ChatRoomAction::DeleteFailure {
            message_id: "m2".to_owned(),
        });

        let ids: Vec<&str> = state.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        assert_eq!(state.loading.deleting_message_id(), None);
        assert_eq!(state.error.kind, ErrorKind::DeleteMessage);
    }

    #[test]
    fn delete_failure_clamps_position_when_collection_shrank() {
        let mut state = state_with_messages(vec![
            message("m1", 10, 0, false),
            message("m2", 20, 0, false),
            message("m3", 30, 0, false),
        ]);

        state.apply(ChatRoomAction::DeleteStart {
            message_id: "m3".to_owned(),
        });
        // A poll shrinks the collection below the snapshot index.
        state.apply(ChatRoomAction::PollUpdate {
            messages: vec![message("m1", 10, 0, false)],
        });
        state.apply(ChatRoomAction::DeleteFailure {
            message_id: "m3".to_owned(),
        });

        let ids: Vec<&str> = state.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
        assert_eq!(state.loading.deleting_message_id(), None);
    }

    #[test]
    fn delete_failure_does_not_duplicate_a_poll_restored_message() {
        let mut state = state_with_messages(vec![
            message("m1", 10, 0, false),
            message("m2", 20, 0, false),
        ]);

        state.apply(ChatRoomAction::DeleteStart {
            message_id: "m1".to_owned(),
        });
        // A poll lands before the failure and still carries the message.
        state.apply(ChatRoomAction::PollUpdate {
            messages: vec![message("m1", 10, 0, false), message("m2", 20, 0, false)],
        });
        state.apply(ChatRoomAction::DeleteFailure {
            message_id: "m1".to_owned(),
        });

        let ids: Vec<&str> = state.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(state.loading.deleting_message_id(), None);
    }

    #[test]
    fn delete_success_clears_marker_and_error() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);
        state.apply(ChatRoomAction::DeleteStart {
            message_id: "m1".to_owned(),
        });

        state.apply(ChatRoomAction::DeleteSuccess);

        assert_eq!(state.loading.deleting_message_id(), None);
        assert!(state.error.is_none());
    }

    #[test]
    fn like_toggle_applies_flip_and_failure_restores_exact_values() {
        let mut state = state_with_messages(vec![message("m1", 10, 5, false)]);

        state.apply(ChatRoomAction::ToggleLikeStart {
            message_id: "m1".to_owned(),
        });
        {
            let m = state.message_by_id("m1").expect("message present");
            assert!(m.liked_by_viewer);
            assert_eq!(m.like_count, 6);
        }
        assert_eq!(state.loading.toggling_like_message_id(), Some("m1"));

        state.apply(ChatRoomAction::ToggleLikeFailure {
            message_id: "m1".to_owned(),
        });
        let m = state.message_by_id("m1").expect("message present");
        assert!(!m.liked_by_viewer);
        assert_eq!(m.like_count, 5);
        assert_eq!(state.loading.toggling_like_message_id(), None);
        assert_eq!(state.error.kind, ErrorKind::ToggleLike);
    }

    #[test]
    fn like_rollback_is_exact_even_when_count_clamped_at_zero() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, true)]);

        state.apply(ChatRoomAction::ToggleLikeStart {
            message_id: "m1".to_owned(),
        });
        {
            let m = state.message_by_id("m1").expect("message present");
            assert!(!m.liked_by_viewer);
            assert_eq!(m.like_count, 0);
        }

        state.apply(ChatRoomAction::ToggleLikeFailure {
            message_id: "m1".to_owned(),
        });
        let m = state.message_by_id("m1").expect("message present");
        assert!(m.liked_by_viewer);
        assert_eq!(m.like_count, 0);
    }

    #[test]
    fn two_confirmed_toggles_return_to_original_pair() {
        let mut state = state_with_messages(vec![message("m1", 10, 3, false)]);

        for _ in 0..2 {
            state.apply(ChatRoomAction::ToggleLikeStart {
                message_id: "m1".to_owned(),
            });
            let liked = state.message_by_id("m1").expect("present").liked_by_viewer;
            state.apply(ChatRoomAction::ToggleLikeSuccess {
                message_id: "m1".to_owned(),
                liked,
            });
        }

        let m = state.message_by_id("m1").expect("message present");
        assert!(!m.liked_by_viewer);
        assert_eq!(m.like_count, 3);
        assert!(state.error.is_none());
    }

    #[test]
    fn reply_invariant_holds_for_start_and_cancel() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);

        let changed = state.apply(ChatRoomAction::StartReply {
            message_id: "missing".to_owned(),
        });
        assert!(!changed);
        assert_eq!(
            state.reply_mode.is_replying,
            state.reply_mode.target_message.is_some()
        );

        state.apply(ChatRoomAction::StartReply {
            message_id: "m1".to_owned(),
        });
        assert!(state.reply_mode.is_replying);
        assert_eq!(state.reply_mode.target_id(), Some("m1"));

        state.apply(ChatRoomAction::CancelReply);
        assert!(!state.reply_mode.is_replying);
        assert!(state.reply_mode.target_message.is_none());
    }

    #[test]
    fn reply_target_survives_deletion_of_the_target() {
        let mut state = state_with_messages(vec![
            message("m1", 10, 0, false),
            message("m2", 20, 0, false),
        ]);
        state.apply(ChatRoomAction::StartReply {
            message_id: "m1".to_owned(),
        });

        state.apply(ChatRoomAction::DeleteStart {
            message_id: "m1".to_owned(),
        });
        state.apply(ChatRoomAction::DeleteSuccess);

        // The banner keeps showing the snapshot until cancel or send.
        assert!(state.reply_mode.is_replying);
        assert_eq!(state.reply_mode.target_id(), Some("m1"));
    }

    #[test]
    fn poll_update_without_relevant_change_is_a_no_op() {
        let mut state = state_with_messages(vec![message("a", 36_000_000, 2, false)]);

        let changed = state.apply(ChatRoomAction::PollUpdate {
            messages: vec![message("a", 36_000_000, 2, false)],
        });

        assert!(!changed);
        assert_eq!(state.messages[0].like_count, 2);
    }

    #[test]
    fn poll_update_with_like_count_change_applies() {
        let mut state = state_with_messages(vec![message("a", 36_000_000, 2, false)]);

        let changed = state.apply(ChatRoomAction::PollUpdate {
            messages: vec![message("a", 36_000_000, 3, false)],
        });

        assert!(changed);
        assert_eq!(state.messages[0].like_count, 3);
    }

    #[test]
    fn set_auth_does_not_touch_messages() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);

        state.apply(ChatRoomAction::SetAuth {
            auth: AuthState::authenticated("user-9"),
        });

        assert_eq!(state.messages.len(), 1);
        assert!(state.auth.is_authenticated);
        assert_eq!(state.auth.user_id.as_deref(), Some("user-9"));
    }

    #[test]
    fn set_error_and_clear_error_override_directly() {
        let mut state = ChatRoomState::default();

        state.apply(ChatRoomAction::SetError {
            error: ErrorState::new(ErrorKind::RoomNotFound, "no such room"),
        });
        assert_eq!(state.error.kind, ErrorKind::RoomNotFound);

        state.apply(ChatRoomAction::ClearError);
        assert!(state.error.is_none());
    }

    #[test]
    fn polling_flags_are_bookkeeping_only() {
        let mut state = state_with_messages(vec![message("m1", 10, 0, false)]);

        state.apply(ChatRoomAction::PollingStarted);
        assert!(state.polling.is_polling);
        assert_eq!(state.messages.len(), 1);

        state.apply(ChatRoomAction::PollingStopped);
        assert!(!state.polling.is_polling);
    }
}
