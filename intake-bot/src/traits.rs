//! Channel trait implemented by platform adapters.

use crate::message::{Interaction, InteractionReply, OutgoingMessage};
use async_trait::async_trait;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Channel error type.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Recipient unreachable: {0}")]
    Unreachable(String),

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Outbound side of a chat platform.
///
/// Every method is a single attempt; callers never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Channel: Send + Sync {
    /// Get the channel name.
    fn name(&self) -> &'static str;

    /// Open (or reuse) the private channel with a user and return its ID.
    async fn open_dm(&self, user_id: &str) -> ChannelResult<String>;

    /// Send one message and return the ID it was created with.
    async fn send(&self, message: OutgoingMessage) -> ChannelResult<String>;

    /// Delete a previously sent message.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ChannelResult<()>;

    /// Answer an interaction.
    async fn respond_interaction(
        &self,
        interaction: &Interaction,
        reply: InteractionReply,
    ) -> ChannelResult<()>;
}
