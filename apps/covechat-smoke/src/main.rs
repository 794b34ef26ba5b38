//! Smoke binary: mounts a room session against a live backend and prints a
//! summary line per published snapshot.

mod config;
mod logging;

use std::sync::Arc;

use tracing::info;

use chat_client::{RoomSession, SessionConfig, SnapshotCallback};
use chat_core::AuthState;
use chat_rest::{RestChatApi, RestConfig};

use crate::config::SmokeConfig;

#[tokio::main]
async fn main() {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            eprintln!("Required: COVECHAT_BASE_URL and COVECHAT_ROOM_ID");
            eprintln!("Optional: COVECHAT_TOKEN, COVECHAT_USER_ID, COVECHAT_POLL_INTERVAL_MS");
            std::process::exit(1);
        }
    };

    let mut rest_config = RestConfig::new(config.base_url.clone());
    if let Some(token) = &config.token {
        rest_config = rest_config.with_bearer_token(token);
    }
    let api = match RestChatApi::new(rest_config) {
        Ok(api) => Arc::new(api),
        Err(err) => {
            eprintln!("Failed to build REST client: {err}");
            std::process::exit(1);
        }
    };

    let on_snapshot: SnapshotCallback = Arc::new(|snapshot| {
        let room_name = snapshot
            .room_info
            .as_ref()
            .map(|info| info.name.as_str())
            .unwrap_or("<loading>");
        println!(
            "room={room_name} messages={} polling={} can_send={} error={:?}",
            snapshot.messages.len(),
            snapshot.is_polling,
            snapshot.can_send,
            snapshot.error.kind,
        );
    });

    let session = RoomSession::mount(
        api,
        SessionConfig {
            poll_interval: config.poll_interval,
        },
        config.room_id.clone(),
        on_snapshot,
    );

    if let Some(user_id) = &config.user_id {
        session.set_auth(AuthState::authenticated(user_id.clone()));
    }

    info!(room_id = %config.room_id, "room session mounted; press Ctrl-C to exit");
    if tokio::signal::ctrl_c().await.is_err() {
        eprintln!("Failed to listen for Ctrl-C; shutting down");
    }
    session.shutdown();
}
