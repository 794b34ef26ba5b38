//! Room session runtime that bridges user intents and backend completions
//! into the room state machine.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tracing::{debug, info, trace, warn};

use chat_core::{
    AuthState, ChatRoomAction, ChatRoomState, DEFAULT_POLL_INTERVAL_MS, ErrorKind, ErrorState,
    RoomSnapshot,
};

use crate::{
    api::{ChatApi, NewMessage},
    polling::RunningPollTask,
};

const ROOM_NOT_FOUND_TEXT: &str = "The room could not be found.";

/// Callback used to publish fresh snapshots after state changes.
pub type SnapshotCallback = Arc<dyn Fn(RoomSnapshot) + Send + Sync + 'static>;

/// Runtime tuning for a room session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed background refresh cadence.
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// One mounted chat room: state, coordinators and the poll task.
///
/// The session is the single writer of room state. Every intent or
/// completion becomes one action applied to completion under the state
/// lock, and each change publishes a fresh [`RoomSnapshot`] through the
/// caller-supplied callback. Async completions are tagged with the request
/// generation captured at issue time; completions from a superseded room
/// are discarded.
///
/// Must be mounted from within a Tokio runtime.
pub struct RoomSession<A: ChatApi + 'static> {
    pub(crate) api: Arc<A>,
    pub(crate) config: SessionConfig,
    room_id: Mutex<String>,
    state: Mutex<ChatRoomState>,
    pub(crate) generation: AtomicU64,
    pub(crate) poller: Mutex<Option<RunningPollTask>>,
    on_snapshot: SnapshotCallback,
}

impl<A: ChatApi + 'static> RoomSession<A> {
    /// Mount a room: fresh state, initial snapshot, then room info, first
    /// load and the poller.
    pub fn mount(
        api: Arc<A>,
        config: SessionConfig,
        room_id: impl Into<String>,
        on_snapshot: SnapshotCallback,
    ) -> Arc<Self> {
        let room_id = room_id.into();
        info!(
            %room_id,
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "mounting room session"
        );

        let state = ChatRoomState::new(config.poll_interval.as_millis() as u64);
        let session = Arc::new(Self {
            api,
            config,
            room_id: Mutex::new(room_id.clone()),
            state: Mutex::new(state),
            generation: AtomicU64::new(1),
            poller: Mutex::new(None),
            on_snapshot,
        });

        session.publish();
        let generation = session.generation.load(Ordering::SeqCst);
        session.spawn_initialize(generation, room_id);
        session
    }

    /// Re-initialize against another room.
    ///
    /// Bumps the request generation so in-flight completions for the old
    /// room are discarded, cancels the old poller and resets state (the
    /// viewer identity carries over).
    pub fn switch_room(self: &Arc<Self>, room_id: impl Into<String>) {
        let room_id = room_id.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(%room_id, generation, "switching room");

        self.stop_poller();
        {
            let mut current = self
                .room_id
                .lock()
                .expect("room id lock poisoned while switching room");
            *current = room_id.clone();
        }
        {
            let mut state = self
                .state
                .lock()
                .expect("room state lock poisoned while switching room");
            let auth = state.auth.clone();
            *state = ChatRoomState::new(self.config.poll_interval.as_millis() as u64);
            state.auth = auth;
        }

        self.publish();
        self.spawn_initialize(generation, room_id);
    }

    /// Tear the session down: stop the poller and invalidate in-flight
    /// completions. Safe to call more than once.
    pub fn shutdown(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "shutting down room session");
        self.stop_poller();
    }

    /// Project viewer identity changes from the auth collaborator.
    pub fn set_auth(&self, auth: AuthState) {
        self.dispatch(ChatRoomAction::SetAuth { auth });
    }

    /// Replace the draft input text.
    pub fn set_input(&self, value: impl Into<String>) {
        self.dispatch(ChatRoomAction::SetInput {
            value: value.into(),
        });
    }

    /// Clear the draft input text.
    pub fn clear_input(&self) {
        self.dispatch(ChatRoomAction::ClearInput);
    }

    /// Enter reply mode targeting a currently loaded message. Purely local;
    /// no network round trip.
    pub fn start_reply(&self, message_id: impl Into<String>) {
        self.dispatch(ChatRoomAction::StartReply {
            message_id: message_id.into(),
        });
    }

    /// Leave reply mode.
    pub fn cancel_reply(&self) {
        self.dispatch(ChatRoomAction::CancelReply);
    }

    /// Dismiss the surfaced error.
    pub fn clear_error(&self) {
        self.dispatch(ChatRoomAction::ClearError);
    }

    /// Current projected snapshot.
    pub fn snapshot(&self) -> RoomSnapshot {
        let state = self
            .state
            .lock()
            .expect("room state lock poisoned while reading snapshot");
        RoomSnapshot::project(&state)
    }

    /// Send the current draft as a message.
    ///
    /// No optimistic insert: the server owns ID and timestamp, so success
    /// triggers a full reload instead of a local patch. Returns `true` when
    /// a request was issued; whitespace-only input, a missing viewer or an
    /// in-flight send issue no network call at all.
    pub fn send_message(self: &Arc<Self>) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        let room_id = self.current_room_id();

        let (content, reply_to_id, snapshot) = {
            let mut state = self
                .state
                .lock()
                .expect("room state lock poisoned while sending message");
            let content = state.message_input.trim().to_owned();
            if content.is_empty() {
                debug!("ignoring send request with blank input");
                return false;
            }
            if !state.auth.is_authenticated {
                warn!("send request rejected: no authenticated viewer");
                return false;
            }
            if state.loading.is_sending {
                warn!("send request rejected: a send is already in flight");
                return false;
            }

            let reply_to_id = state.reply_mode.target_id().map(ToOwned::to_owned);
            state.apply(ChatRoomAction::SendStart);
            (content, reply_to_id, RoomSnapshot::project(&state))
        };
        (self.on_snapshot)(snapshot);

        info!(
            %room_id,
            body_len = content.len(),
            is_reply = reply_to_id.is_some(),
            "queueing message send"
        );
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let result = session
                .api
                .send_message(&room_id, NewMessage {
                    content,
                    reply_to_id,
                })
                .await;
            match result {
                Ok(message) => {
                    debug!(message_id = %message.id, "send confirmed; reloading authoritative list");
                    if session.complete(generation, ChatRoomAction::SendSuccess) {
                        session.load_messages(generation, &room_id).await;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "send failed");
                    session.complete(
                        generation,
                        ChatRoomAction::SendFailure {
                            message: err.message,
                        },
                    );
                }
            }
        });
        true
    }

    /// Delete a message, optimistically removing it first.
    ///
    /// Returns `true` when a request was issued. Rejected while another
    /// delete is outstanding (the duplicate guard the coordinator contract
    /// leaves to the enclosing system) or when the ID is not in the
    /// collection.
    pub fn delete_message(self: &Arc<Self>, message_id: impl Into<String>) -> bool {
        let message_id = message_id.into();
        let generation = self.generation.load(Ordering::SeqCst);
        let room_id = self.current_room_id();

        let snapshot = {
            let mut state = self
                .state
                .lock()
                .expect("room state lock poisoned while deleting message");
            if state.loading.deleting.is_some() {
                warn!(%message_id, "delete request rejected: another delete is outstanding");
                return false;
            }
            if !state.apply(ChatRoomAction::DeleteStart {
                message_id: message_id.clone(),
            }) {
                return false;
            }
            RoomSnapshot::project(&state)
        };
        (self.on_snapshot)(snapshot);

        info!(%message_id, "queueing message delete");
        let session = Arc::clone(self);
        tokio::spawn(async move {
            match session.api.delete_message(&message_id).await {
                Ok(()) => {
                    if session.complete(generation, ChatRoomAction::DeleteSuccess) {
                        session.load_messages(generation, &room_id).await;
                    }
                }
                Err(err) => {
                    warn!(%message_id, error = %err, "delete failed; rolling back");
                    session.complete(generation, ChatRoomAction::DeleteFailure { message_id });
                }
            }
        });
        true
    }

    /// Toggle the viewer's like on a message, flipping it optimistically.
    ///
    /// Returns `true` when a request was issued. Rejected while another
    /// like-toggle is outstanding or when the ID is not in the collection.
    pub fn toggle_like(self: &Arc<Self>, message_id: impl Into<String>) -> bool {
        let message_id = message_id.into();
        let generation = self.generation.load(Ordering::SeqCst);

        let snapshot = {
            let mut state = self
                .state
                .lock()
                .expect("room state lock poisoned while toggling like");
            if state.loading.toggling_like.is_some() {
                warn!(%message_id, "like request rejected: another toggle is outstanding");
                return false;
            }
            if !state.apply(ChatRoomAction::ToggleLikeStart {
                message_id: message_id.clone(),
            }) {
                return false;
            }
            RoomSnapshot::project(&state)
        };
        (self.on_snapshot)(snapshot);

        debug!(%message_id, "queueing like toggle");
        let session = Arc::clone(self);
        tokio::spawn(async move {
            match session.api.toggle_like(&message_id).await {
                Ok(outcome) => {
                    session.complete(
                        generation,
                        ChatRoomAction::ToggleLikeSuccess {
                            message_id,
                            liked: outcome.liked,
                        },
                    );
                }
                Err(err) => {
                    warn!(%message_id, error = %err, "like toggle failed; rolling back");
                    session.complete(generation, ChatRoomAction::ToggleLikeFailure { message_id });
                }
            }
        });
        true
    }

    /// Re-fetch the full message list for the current room.
    pub fn reload_messages(self: &Arc<Self>) {
        let generation = self.generation.load(Ordering::SeqCst);
        let room_id = self.current_room_id();
        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.load_messages(generation, &room_id).await;
        });
    }

    fn spawn_initialize(self: &Arc<Self>, generation: u64, room_id: String) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.initialize(generation, room_id).await;
        });
    }

    /// Room mount sequence: room info, then poller and first load. A failed
    /// room lookup is terminal for the view; nothing else is fetched.
    async fn initialize(self: Arc<Self>, generation: u64, room_id: String) {
        debug!(%room_id, generation, "initializing room");
        match self.api.get_room_info(&room_id).await {
            Ok(info) => {
                if !self.complete(generation, ChatRoomAction::SetRoomInfo { info }) {
                    return;
                }
            }
            Err(err) => {
                warn!(%room_id, error = %err, "room lookup failed; room view is blocked");
                self.complete(
                    generation,
                    ChatRoomAction::SetError {
                        error: ErrorState::new(ErrorKind::RoomNotFound, ROOM_NOT_FOUND_TEXT),
                    },
                );
                return;
            }
        }

        self.spawn_poller(generation, room_id.clone());
        self.load_messages(generation, &room_id).await;
    }

    pub(crate) async fn load_messages(&self, generation: u64, room_id: &str) {
        if !self.complete(generation, ChatRoomAction::LoadStart) {
            return;
        }
        match self.api.get_messages(room_id).await {
            Ok(messages) => {
                self.complete(generation, ChatRoomAction::LoadSuccess { messages });
            }
            Err(err) => {
                warn!(%room_id, error = %err, "message load failed; keeping displayed messages");
                self.complete(
                    generation,
                    ChatRoomAction::LoadFailure {
                        message: err.message,
                    },
                );
            }
        }
    }

    /// Apply one action and publish the new snapshot when it changed state.
    pub(crate) fn dispatch(&self, action: ChatRoomAction) {
        trace!(action = action.kind(), "dispatch");
        let snapshot = {
            let mut state = self
                .state
                .lock()
                .expect("room state lock poisoned while applying action");
            if !state.apply(action) {
                return;
            }
            RoomSnapshot::project(&state)
        };
        (self.on_snapshot)(snapshot);
    }

    /// Apply a generation-tagged completion.
    ///
    /// Returns `false` when the completion belongs to a superseded room
    /// generation and was discarded. The generation check runs under the
    /// state lock so a room switch cannot interleave between check and
    /// apply.
    pub(crate) fn complete(&self, generation: u64, action: ChatRoomAction) -> bool {
        let snapshot = {
            let mut state = self
                .state
                .lock()
                .expect("room state lock poisoned while applying completion");
            if self.generation.load(Ordering::SeqCst) != generation {
                trace!(
                    action = action.kind(),
                    generation,
                    "discarding stale completion"
                );
                return false;
            }
            if !state.apply(action) {
                return true;
            }
            RoomSnapshot::project(&state)
        };
        (self.on_snapshot)(snapshot);
        true
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        (self.on_snapshot)(snapshot);
    }

    fn current_room_id(&self) -> String {
        self.room_id
            .lock()
            .expect("room id lock poisoned while reading room id")
            .clone()
    }
}

impl<A: ChatApi + 'static> Drop for RoomSession<A> {
    fn drop(&mut self) {
        if let Some(running) = self
            .poller
            .lock()
            .expect("poller lock poisoned while dropping session")
            .take()
        {
            running.abort();
        }
    }
}
