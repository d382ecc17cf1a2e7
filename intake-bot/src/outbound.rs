//! Outbound message delivery.
//!
//! Wraps a [`Channel`] so that delivery problems never escape as errors:
//! every call returns a [`SendResult`] and logs the failure. Nothing here
//! retries.
//!
//! Text longer than one message is sent as several. Either every chunk
//! lands or, on a failed chunk, the ones already posted are deleted again.

use crate::discord::format::split_message;
use crate::message::{Interaction, InteractionReply, OutgoingContent, OutgoingMessage};
use crate::traits::{Channel, ChannelError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Result of a send operation.
#[derive(Debug, Clone)]
pub struct SendResult {
    /// Whether the send was successful
    pub success: bool,
    /// IDs of the messages created, in order (empty on failure)
    pub message_ids: Vec<String>,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl SendResult {
    fn ok(message_ids: Vec<String>) -> Self {
        Self {
            success: true,
            message_ids,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_ids: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Delivers text to users, channels, and interactions.
pub struct Outbound {
    channel: Arc<dyn Channel>,
    /// Destination for submitted reports
    report_channel_id: String,
    /// DM channel IDs by user ID
    dm_channels: DashMap<String, String>,
}

impl Outbound {
    /// Create a new outbound sender.
    pub fn new(channel: Arc<dyn Channel>, report_channel_id: impl Into<String>) -> Self {
        Self {
            channel,
            report_channel_id: report_channel_id.into(),
            dm_channels: DashMap::new(),
        }
    }

    /// Send text to a user's private channel.
    pub async fn send_dm(&self, user_id: &str, text: &str) -> SendResult {
        let dm_channel = match self.dm_channel(user_id).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to open DM channel");
                return SendResult::failed(e);
            }
        };

        let result = self.send_to_channel(&dm_channel, text).await;
        if !result.success {
            // The channel may have been closed on the platform side.
            self.dm_channels.remove(user_id);
        }
        result
    }

    /// Send text to a channel, split into as many messages as it needs.
    ///
    /// All or nothing: if any chunk fails, the chunks already posted are
    /// deleted before the failure is returned.
    pub async fn send_to_channel(&self, channel_id: &str, text: &str) -> SendResult {
        let chunks = split_message(text);
        let mut posted = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            match self.deliver(channel_id, chunk).await {
                Ok(message_id) => posted.push(message_id),
                Err(e) => {
                    tracing::warn!(
                        channel = self.channel.name(),
                        channel_id = %channel_id,
                        chunk = posted.len() + 1,
                        error = %e,
                        "Failed to send message"
                    );
                    self.retract(channel_id, &posted).await;
                    return SendResult::failed(e.to_string());
                }
            }
        }

        SendResult::ok(posted)
    }

    /// Post a compiled report to the destination channel.
    pub async fn post_report(&self, text: &str) -> SendResult {
        let result = self.send_to_channel(&self.report_channel_id, text).await;
        if !result.success {
            tracing::error!(
                channel_id = %self.report_channel_id,
                error = ?result.error,
                "Failed to post report"
            );
        }
        result
    }

    /// Send text to a channel and delete it after `delay`.
    pub async fn send_ephemeral(&self, channel_id: &str, text: &str, delay: Duration) -> SendResult {
        let result = self.send_to_channel(channel_id, text).await;

        if !result.message_ids.is_empty() {
            let channel = self.channel.clone();
            let channel_id = channel_id.to_string();
            let message_ids = result.message_ids.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for message_id in &message_ids {
                    if let Err(e) = channel.delete_message(&channel_id, message_id).await {
                        tracing::debug!(
                            channel_id = %channel_id,
                            message_id = %message_id,
                            error = %e,
                            "Failed to delete ephemeral notice"
                        );
                    }
                }
            });
        }

        result
    }

    /// Answer an interaction.
    pub async fn respond(&self, interaction: &Interaction, reply: InteractionReply) -> SendResult {
        match self.channel.respond_interaction(interaction, reply).await {
            Ok(()) => SendResult::ok(Vec::new()),
            Err(e) => {
                tracing::warn!(
                    interaction_id = %interaction.id,
                    error = %e,
                    "Failed to respond to interaction"
                );
                SendResult::failed(e.to_string())
            }
        }
    }

    async fn dm_channel(&self, user_id: &str) -> Result<String, String> {
        if let Some(id) = self.dm_channels.get(user_id) {
            return Ok(id.clone());
        }

        let id = self
            .channel
            .open_dm(user_id)
            .await
            .map_err(|e| e.to_string())?;
        self.dm_channels.insert(user_id.to_string(), id.clone());
        Ok(id)
    }

    async fn deliver(&self, channel_id: &str, text: String) -> Result<String, ChannelError> {
        self.channel
            .send(OutgoingMessage {
                channel_id: channel_id.to_string(),
                content: OutgoingContent::Text { text },
            })
            .await
    }

    /// Delete the chunks of a message that failed partway.
    async fn retract(&self, channel_id: &str, message_ids: &[String]) {
        for message_id in message_ids {
            if let Err(e) = self.channel.delete_message(channel_id, message_id).await {
                tracing::error!(
                    channel_id = %channel_id,
                    message_id = %message_id,
                    error = %e,
                    "Failed to retract partial message"
                );
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
