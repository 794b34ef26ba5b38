//! Fixed-interval background refresh for a mounted room.

use std::sync::Arc;

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use chat_core::ChatRoomAction;

use crate::{api::ChatApi, session::RoomSession};

/// Handle to the repeating refresh task for one room generation.
pub(crate) struct RunningPollTask {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl RunningPollTask {
    /// Cancel the task and drop any tick still in flight.
    pub(crate) fn abort(self) {
        self.stop.cancel();
        self.task.abort();
    }
}

impl<A: ChatApi + 'static> RoomSession<A> {
    /// Start the repeating refresh task for the given room and generation.
    ///
    /// The cadence is fixed — no backoff, no jitter. The first refresh runs
    /// one full interval after start; the initial load covers time zero.
    /// Fetch failures are diagnostic only and never touch ErrorState.
    pub(crate) fn spawn_poller(self: &Arc<Self>, generation: u64, room_id: String) {
        let interval_duration = self.config.poll_interval;
        debug!(
            %room_id,
            generation,
            interval_ms = interval_duration.as_millis() as u64,
            "starting poll task"
        );

        let stop = CancellationToken::new();
        let stop_child = stop.child_token();
        let api = Arc::clone(&self.api);
        // The task holds only a weak reference so an abandoned session can
        // still drop and abort its poller.
        let session = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticker = interval(interval_duration);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; skip it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stop_child.cancelled() => break,
                    _ = ticker.tick() => {
                        match api.get_messages(&room_id).await {
                            Ok(messages) => {
                                let Some(session) = session.upgrade() else { break };
                                let current = session
                                    .complete(generation, ChatRoomAction::PollUpdate { messages });
                                if !current {
                                    break;
                                }
                            }
                            Err(err) => {
                                debug!(%room_id, error = %err, "background poll failed");
                            }
                        }
                    }
                }
            }
            trace!(%room_id, generation, "poll task exiting");
        });

        let previous = {
            let mut poller = self
                .poller
                .lock()
                .expect("poller lock poisoned while starting poll task");
            poller.replace(RunningPollTask { stop, task })
        };
        if let Some(previous) = previous {
            previous.abort();
        }
        self.dispatch(ChatRoomAction::PollingStarted);
    }

    /// Cancel the running refresh task, when any.
    pub(crate) fn stop_poller(&self) {
        let running = self
            .poller
            .lock()
            .expect("poller lock poisoned while stopping poll task")
            .take();
        if let Some(running) = running {
            running.abort();
            self.dispatch(ChatRoomAction::PollingStopped);
        }
    }
}
