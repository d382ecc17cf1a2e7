//! Discord adapter.
//!
//! Outbound calls go through the REST API with `reqwest`; inbound events
//! arrive over the Gateway WebSocket and are forwarded as [`InboundEvent`]s.

pub mod format;

use crate::message::{
    Attachment, DirectMessage, InboundEvent, Interaction, InteractionReply, OutgoingMessage,
    REPORT_BUTTON_ID,
};
use crate::traits::{Channel, ChannelError, ChannelResult};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use intake_common::Config;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// REST API root.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// Only private messages are needed; button clicks and slash commands are
/// delivered regardless of intents.
const INTENT_DIRECT_MESSAGES: u64 = 1 << 12;

const INTERACTION_APPLICATION_COMMAND: u64 = 2;
const INTERACTION_MESSAGE_COMPONENT: u64 = 3;

const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
const CALLBACK_DEFERRED_UPDATE: u8 = 6;
const FLAG_EPHEMERAL: u64 = 1 << 6;

mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
}

/// Gateway frame.
#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

/// Discord channel.
pub struct DiscordChannel {
    bot_token: String,
    application_id: String,
    guild_id: String,
    command_name: String,
    api_base: String,
    client: Client,
}

impl DiscordChannel {
    /// Create a new Discord channel.
    pub fn new(
        bot_token: impl Into<String>,
        application_id: impl Into<String>,
        guild_id: impl Into<String>,
        command_name: impl Into<String>,
    ) -> Self {
        Self {
            bot_token: bot_token.into(),
            application_id: application_id.into(),
            guild_id: guild_id.into(),
            command_name: command_name.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.bot_token,
            &config.application_id,
            &config.guild_id,
            &config.slash_command_name,
        )
    }

    /// Point REST calls at another base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Register the slash command that posts the start button.
    ///
    /// Registered on the configured guild, or globally when there is none.
    pub async fn register_commands(&self) -> ChannelResult<()> {
        let path = if self.guild_id.is_empty() {
            format!("/applications/{}/commands", self.application_id)
        } else {
            format!(
                "/applications/{}/guilds/{}/commands",
                self.application_id, self.guild_id
            )
        };

        let body = json!({
            "name": self.command_name,
            "description": "Post the button that starts a report",
            "type": 1,
        });

        let resp = self
            .client
            .post(self.url(&path))
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Connection(format!("Command registration failed: {e}")))?;
        check_status(resp).await?;

        tracing::info!(command = %self.command_name, "Slash command registered");
        Ok(())
    }

    async fn gateway_url(&self) -> String {
        let resp = self
            .client
            .get(self.url("/gateway/bot"))
            .header("Authorization", self.auth())
            .send()
            .await;

        let body: Option<Value> = match resp {
            Ok(resp) if resp.status().is_success() => resp.json().await.ok(),
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Gateway lookup failed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gateway lookup failed");
                None
            }
        };

        body.as_ref()
            .and_then(|b| b.get("url"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_GATEWAY_URL)
            .to_string()
    }

    /// Connect to the gateway and forward events until the connection ends.
    ///
    /// Returns `Ok(())` when the receiver is gone, and an error when the
    /// gateway closes or asks for a reconnect.
    pub async fn listen(&self, tx: mpsc::Sender<InboundEvent>) -> ChannelResult<()> {
        let ws_url = format!("{}/?v=10&encoding=json", self.gateway_url().await);
        tracing::info!("Connecting to Discord gateway");

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .map_err(|e| ChannelError::Connection(format!("WebSocket connection failed: {e}")))?;
        let (mut write, mut read) = ws_stream.split();

        let hello = read
            .next()
            .await
            .ok_or_else(|| ChannelError::Connection("No hello from gateway".into()))?
            .map_err(|e| ChannelError::Connection(format!("WebSocket error: {e}")))?;
        let hello: GatewayPayload = serde_json::from_str(&hello.to_string())
            .map_err(|e| ChannelError::Connection(format!("Invalid hello: {e}")))?;
        if hello.op != opcode::HELLO {
            return Err(ChannelError::Connection(format!(
                "Expected hello, got opcode {}",
                hello.op
            )));
        }

        let heartbeat_ms = hello
            .d
            .get("heartbeat_interval")
            .and_then(Value::as_u64)
            .unwrap_or(41_250);

        let identify = json!({
            "op": opcode::IDENTIFY,
            "d": {
                "token": self.bot_token,
                "intents": INTENT_DIRECT_MESSAGES,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "intake-bot",
                    "device": "intake-bot"
                }
            }
        });
        write
            .send(Message::Text(identify.to_string()))
            .await
            .map_err(|e| ChannelError::Connection(format!("Failed to identify: {e}")))?;

        let mut heartbeat = tokio::time::interval(Duration::from_millis(heartbeat_ms));
        let mut sequence: Option<u64> = None;
        let mut bot_user_id = String::new();

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = json!({ "op": opcode::HEARTBEAT, "d": sequence });
                    write
                        .send(Message::Text(beat.to_string()))
                        .await
                        .map_err(|e| ChannelError::Connection(format!("Heartbeat failed: {e}")))?;
                }
                frame = read.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(reason))) => {
                            return Err(ChannelError::Connection(format!("Gateway closed: {reason:?}")));
                        }
                        Some(Err(e)) => {
                            return Err(ChannelError::Connection(format!("WebSocket error: {e}")));
                        }
                        None => return Err(ChannelError::Connection("Gateway stream ended".into())),
                        Some(Ok(_)) => continue,
                    };

                    let Ok(payload) = serde_json::from_str::<GatewayPayload>(&text) else {
                        tracing::debug!("Ignoring unparseable gateway frame");
                        continue;
                    };

                    if payload.s.is_some() {
                        sequence = payload.s;
                    }

                    match payload.op {
                        opcode::DISPATCH => {}
                        opcode::HEARTBEAT => {
                            heartbeat.reset_immediately();
                            continue;
                        }
                        opcode::RECONNECT | opcode::INVALID_SESSION => {
                            return Err(ChannelError::Connection(format!(
                                "Gateway requested reconnect (opcode {})",
                                payload.op
                            )));
                        }
                        _ => continue,
                    }

                    let event_type = payload.t.as_deref().unwrap_or("");
                    if event_type == "READY" {
                        bot_user_id = payload.d
                            .pointer("/user/id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        tracing::info!(bot_user_id = %bot_user_id, "Discord gateway ready");
                        continue;
                    }

                    let Some(event) = parse_event(event_type, &payload.d, &bot_user_id, &self.command_name) else {
                        continue;
                    };

                    tracing::debug!(kind = event.kind(), user_id = %event.user_id(), "Discord event received");
                    if tx.send(event).await.is_err() {
                        tracing::info!("Event queue closed, leaving gateway");
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn post_message(&self, channel_id: &str, body: &Value) -> ChannelResult<String> {
        let resp = self
            .client
            .post(self.url(&format!("/channels/{channel_id}/messages")))
            .header("Authorization", self.auth())
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Discord send error: {e}")))?;

        let data: Value = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| ChannelError::Internal(format!("Failed to parse response: {e}")))?;

        Ok(data
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

fn button_row(label: &str) -> Value {
    json!([{
        "type": 1,
        "components": [{
            "type": 2,
            "style": 1,
            "label": label,
            "custom_id": REPORT_BUTTON_ID,
        }]
    }])
}

/// Map an error status to a [`ChannelError`].
async fn check_status(resp: Response) -> ChannelResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => ChannelError::Auth(format!("Discord API error ({status}): {body}")),
        StatusCode::FORBIDDEN => ChannelError::Unreachable(format!("Discord API error ({status}): {body}")),
        _ => ChannelError::SendFailed(format!("Discord API error ({status}): {body}")),
    })
}

/// Turn a gateway dispatch into an inbound event, if it is one we handle.
fn parse_event(
    event_type: &str,
    d: &Value,
    bot_user_id: &str,
    command_name: &str,
) -> Option<InboundEvent> {
    match event_type {
        "MESSAGE_CREATE" => parse_direct_message(d, bot_user_id).map(InboundEvent::DirectMessage),
        "INTERACTION_CREATE" => parse_interaction(d, command_name),
        _ => None,
    }
}

fn parse_direct_message(d: &Value, bot_user_id: &str) -> Option<DirectMessage> {
    if d.get("guild_id").is_some_and(|g| !g.is_null()) {
        return None;
    }

    let author = d.get("author")?;
    if author.get("bot").and_then(Value::as_bool).unwrap_or(false) {
        return None;
    }
    let user_id = author.get("id").and_then(Value::as_str)?;
    if user_id == bot_user_id {
        return None;
    }

    let attachments = d
        .get("attachments")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_attachment).collect())
        .unwrap_or_default();

    let timestamp = d
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map_or_else(|| chrono::Utc::now().timestamp_millis(), |t| t.timestamp_millis());

    Some(DirectMessage {
        id: str_field(d, "id"),
        user_id: user_id.to_string(),
        channel_id: str_field(d, "channel_id"),
        content: str_field(d, "content"),
        attachments,
        timestamp,
    })
}

fn parse_attachment(item: &Value) -> Option<Attachment> {
    Some(Attachment {
        url: item.get("url").and_then(Value::as_str)?.to_string(),
        filename: str_field(item, "filename"),
        content_type: item
            .get("content_type")
            .and_then(Value::as_str)
            .map(str::to_string),
        size_bytes: item.get("size").and_then(Value::as_u64),
    })
}

fn parse_interaction(d: &Value, command_name: &str) -> Option<InboundEvent> {
    let kind = d.get("type").and_then(Value::as_u64)?;
    let data = d.get("data")?;

    // Members come from guilds; `user` is set for interactions in DMs.
    let member_user = d.pointer("/member/user/id").and_then(Value::as_str);
    let user_id = member_user.or_else(|| d.pointer("/user/id").and_then(Value::as_str))?;

    let interaction = |name: &str| Interaction {
        id: str_field(d, "id"),
        token: str_field(d, "token"),
        user_id: user_id.to_string(),
        channel_id: str_field(d, "channel_id"),
        guild_id: d.get("guild_id").and_then(Value::as_str).map(str::to_string),
        name: name.to_string(),
    };

    match kind {
        INTERACTION_MESSAGE_COMPONENT => {
            let custom_id = data.get("custom_id").and_then(Value::as_str)?;
            (custom_id == REPORT_BUTTON_ID && member_user.is_some())
                .then(|| InboundEvent::ButtonClick(interaction(custom_id)))
        }
        INTERACTION_APPLICATION_COMMAND => {
            let name = data.get("name").and_then(Value::as_str)?;
            (name == command_name).then(|| InboundEvent::SlashCommand(interaction(name)))
        }
        _ => None,
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn open_dm(&self, user_id: &str) -> ChannelResult<String> {
        let resp = self
            .client
            .post(self.url("/users/@me/channels"))
            .header("Authorization", self.auth())
            .json(&json!({ "recipient_id": user_id }))
            .send()
            .await
            .map_err(|e| ChannelError::Connection(format!("Failed to open DM: {e}")))?;

        let data: Value = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| ChannelError::Internal(format!("Failed to parse response: {e}")))?;

        data.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ChannelError::Internal("DM channel response has no id".into()))
    }

    async fn send(&self, message: OutgoingMessage) -> ChannelResult<String> {
        let body = json!({ "content": message.content.text() });
        self.post_message(&message.channel_id, &body).await
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ChannelResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/channels/{channel_id}/messages/{message_id}")))
            .header("Authorization", self.auth())
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Discord delete error: {e}")))?;
        check_status(resp).await?;
        Ok(())
    }

    async fn respond_interaction(
        &self,
        interaction: &Interaction,
        reply: InteractionReply,
    ) -> ChannelResult<()> {
        let body = match reply {
            InteractionReply::Deferred => json!({ "type": CALLBACK_DEFERRED_UPDATE }),
            InteractionReply::Ephemeral { text } => json!({
                "type": CALLBACK_CHANNEL_MESSAGE,
                "data": { "content": text, "flags": FLAG_EPHEMERAL },
            }),
            InteractionReply::ButtonPrompt { text, label } => json!({
                "type": CALLBACK_CHANNEL_MESSAGE,
                "data": { "content": text, "components": button_row(&label) },
            }),
        };

        let resp = self
            .client
            .post(self.url(&format!(
                "/interactions/{}/{}/callback",
                interaction.id, interaction.token
            )))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("Interaction response error: {e}")))?;
        check_status(resp).await?;
        Ok(())
    }
}
