//! REST implementation of the covechat `ChatApi` collaborator.
//!
//! Thin adapter over `reqwest`: wire DTOs matching the backend schema,
//! conversion into core entities, and mapping of HTTP/transport failures
//! into the stable `ApiError` payload.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Response, StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

use chat_client::{ChatApi, LikeToggle, NewMessage};
use chat_core::{
    ApiError, ApiErrorCategory, Message, MessageSender, ReplyTarget, RoomInfo,
    classify_http_status,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ROOM_FETCH_CODE: &str = "chat_room_fetch_error";
const MESSAGE_FETCH_CODE: &str = "message_fetch_error";
const MESSAGE_CREATE_CODE: &str = "message_create_error";
const MESSAGE_DELETE_CODE: &str = "message_delete_error";
const LIKE_TOGGLE_CODE: &str = "like_toggle_error";

/// Connection settings for the REST backend.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// API base URL, for example `https://chat.example.org/api`.
    pub base_url: Url,
    /// Optional bearer token attached to every request.
    pub bearer_token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RestConfig {
    /// Settings with the default timeout and no token.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            bearer_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Attach a bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// REST-backed chat collaborator.
#[derive(Debug, Clone)]
pub struct RestChatApi {
    http: reqwest::Client,
    config: RestConfig,
}

impl RestChatApi {
    /// Build the HTTP client for the given settings.
    pub fn new(config: RestConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                ApiError::new(
                    ApiErrorCategory::Internal,
                    "client_build_error",
                    err.to_string(),
                )
            })?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ApiError::new(
                    ApiErrorCategory::Internal,
                    "invalid_base_url",
                    "base URL cannot be a base for paths",
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.config.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn expect_json<T: DeserializeOwned>(
        response: Response,
        default_code: &str,
    ) -> Result<T, ApiError> {
        let response = Self::check_status(response, default_code).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| map_transport_error(err, default_code))
    }

    async fn check_status(response: Response, default_code: &str) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        let mut mapped = error_from_body(status, &body, default_code);
        if let Some(delay) = retry_after {
            mapped = mapped.with_retry_after(delay);
        }
        Err(mapped)
    }
}

#[async_trait]
impl ChatApi for RestChatApi {
    async fn get_room_info(&self, room_id: &str) -> Result<RoomInfo, ApiError> {
        debug!(%room_id, "fetching room info");
        let url = self.endpoint(&["rooms", room_id])?;
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|err| map_transport_error(err, ROOM_FETCH_CODE))?;
        let room: RoomDto = Self::expect_json(response, ROOM_FETCH_CODE).await?;
        Ok(room.into())
    }

    async fn get_messages(&self, room_id: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&["rooms", room_id, "messages"])?;
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|err| map_transport_error(err, MESSAGE_FETCH_CODE))?;
        let messages: Vec<MessageDto> = Self::expect_json(response, MESSAGE_FETCH_CODE).await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn send_message(
        &self,
        room_id: &str,
        new_message: NewMessage,
    ) -> Result<Message, ApiError> {
        debug!(%room_id, is_reply = new_message.reply_to_id.is_some(), "posting message");
        let url = self.endpoint(&["rooms", room_id, "messages"])?;
        let body = CreateMessageBody {
            content: &new_message.content,
            reply_to_id: new_message.reply_to_id.as_deref(),
        };
        let response = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error(err, MESSAGE_CREATE_CODE))?;
        let message: MessageDto = Self::expect_json(response, MESSAGE_CREATE_CODE).await?;
        Ok(message.into())
    }

    async fn delete_message(&self, message_id: &str) -> Result<(), ApiError> {
        debug!(%message_id, "deleting message");
        let url = self.endpoint(&["messages", message_id])?;
        let response = self
            .request(reqwest::Method::DELETE, url)
            .send()
            .await
            .map_err(|err| map_transport_error(err, MESSAGE_DELETE_CODE))?;
        Self::check_status(response, MESSAGE_DELETE_CODE).await?;
        Ok(())
    }

    async fn toggle_like(&self, message_id: &str) -> Result<LikeToggle, ApiError> {
        debug!(%message_id, "toggling like");
        let url = self.endpoint(&["messages", message_id, "like"])?;
        let response = self
            .request(reqwest::Method::POST, url)
            .send()
            .await
            .map_err(|err| map_transport_error(err, LIKE_TOGGLE_CODE))?;
        let outcome: ToggleLikeDto = Self::expect_json(response, LIKE_TOGGLE_CODE).await?;
        Ok(LikeToggle {
            liked: outcome.liked,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RoomDto {
    id: String,
    name: String,
    creator_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct SenderDto {
    id: String,
    nickname: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ReplyToDto {
    id: String,
    content: String,
    sender: SenderDto,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageDto {
    id: String,
    room_id: String,
    content: String,
    created_at: DateTime<Utc>,
    sender: SenderDto,
    reply_to: Option<ReplyToDto>,
    likes_count: u32,
    is_liked_by_current_user: bool,
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageBody<'a> {
    content: &'a str,
    reply_to_id: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct ToggleLikeDto {
    liked: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl From<RoomDto> for RoomInfo {
    fn from(dto: RoomDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            creator_id: dto.creator_id,
            created_at_ms: datetime_to_ms(dto.created_at),
            updated_at_ms: datetime_to_ms(dto.updated_at),
        }
    }
}

impl From<SenderDto> for MessageSender {
    fn from(dto: SenderDto) -> Self {
        Self {
            id: dto.id,
            nickname: dto.nickname,
        }
    }
}

impl From<ReplyToDto> for ReplyTarget {
    fn from(dto: ReplyToDto) -> Self {
        Self {
            id: dto.id,
            content: dto.content,
            sender: dto.sender.into(),
        }
    }
}

impl From<MessageDto> for Message {
    fn from(dto: MessageDto) -> Self {
        Self {
            id: dto.id,
            room_id: dto.room_id,
            sender: dto.sender.into(),
            content: dto.content,
            reply_to: dto.reply_to.map(ReplyTarget::from),
            created_at_ms: datetime_to_ms(dto.created_at),
            like_count: dto.likes_count,
            liked_by_viewer: dto.is_liked_by_current_user,
        }
    }
}

fn datetime_to_ms(value: DateTime<Utc>) -> u64 {
    value.timestamp_millis().max(0) as u64
}

fn error_from_body(status: StatusCode, body: &str, default_code: &str) -> ApiError {
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope.error.code.to_ascii_lowercase(),
            envelope.error.message,
        ),
        Err(_) => (
            default_code.to_owned(),
            format!("request failed with status {status}"),
        ),
    };
    ApiError::new(classify_http_status(status.as_u16()), code, message)
}

fn map_transport_error(err: reqwest::Error, default_code: &str) -> ApiError {
    if err.is_decode() {
        ApiError::new(
            ApiErrorCategory::Serialization,
            "response_decode_error",
            err.to_string(),
        )
    } else if err.is_timeout() || err.is_connect() || err.is_request() {
        ApiError::new(ApiErrorCategory::Network, default_code, err.to_string())
    } else {
        ApiError::new(ApiErrorCategory::Internal, default_code, err.to_string())
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
