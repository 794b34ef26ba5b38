use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chat_core::{ApiError, Message, RoomInfo};

/// Payload for creating a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    /// Message body; must be non-blank after trimming.
    pub content: String,
    /// Optional ID of the message being replied to.
    pub reply_to_id: Option<String>,
}

/// Result of a like-toggle round trip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeToggle {
    /// Whether the viewer likes the message after the toggle, as decided by
    /// the server.
    pub liked: bool,
}

/// Remote chat backend the engine synchronizes against.
///
/// Transport, serialization and authorization are the implementor's
/// concern; the engine reacts only to success or failure of each call.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch room metadata. Called once per room mount; any failure blocks
    /// the room view.
    async fn get_room_info(&self, room_id: &str) -> Result<RoomInfo, ApiError>;

    /// Fetch the full live message set for a room. Order is unspecified;
    /// the view projector re-sorts.
    async fn get_messages(&self, room_id: &str) -> Result<Vec<Message>, ApiError>;

    /// Create a message. The server assigns ID and timestamp.
    async fn send_message(
        &self,
        room_id: &str,
        new_message: NewMessage,
    ) -> Result<Message, ApiError>;

    /// Delete a message. Only the author may delete; enforced remotely.
    async fn delete_message(&self, message_id: &str) -> Result<(), ApiError>;

    /// Toggle the viewer's like on a message. Idempotent from the caller's
    /// perspective; the server decides add vs. remove.
    async fn toggle_like(&self, message_id: &str) -> Result<LikeToggle, ApiError>;
}
