//! Message types exchanged with the chat platform.

use serde::{Deserialize, Serialize};

/// Custom ID of the "start report" button.
pub const REPORT_BUTTON_ID: &str = "report_btn";

/// An event delivered by the platform adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Private message to the bot, possibly carrying attachments
    DirectMessage(DirectMessage),
    /// Click on the "start report" button
    ButtonClick(Interaction),
    /// Invocation of the slash command that posts the button
    SlashCommand(Interaction),
}

impl InboundEvent {
    /// User that triggered the event.
    pub fn user_id(&self) -> &str {
        match self {
            Self::DirectMessage(dm) => &dm.user_id,
            Self::ButtonClick(i) | Self::SlashCommand(i) => &i.user_id,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DirectMessage(_) => "direct_message",
            Self::ButtonClick(_) => "button_click",
            Self::SlashCommand(_) => "slash_command",
        }
    }
}

/// A private message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Message ID (platform-specific)
    pub id: String,
    /// Author
    pub user_id: String,
    /// DM channel the message arrived on
    pub channel_id: String,
    /// Text content, possibly empty when only files were sent
    #[serde(default)]
    pub content: String,
    /// Files attached to the message
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Timestamp (Unix millis)
    pub timestamp: i64,
}

impl DirectMessage {
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// A component click or slash command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction ID
    pub id: String,
    /// Token used to answer the interaction
    pub token: String,
    /// User that triggered it
    pub user_id: String,
    /// Channel it was triggered in
    pub channel_id: String,
    /// Guild, if the interaction happened in a server
    pub guild_id: Option<String>,
    /// Button custom ID or slash command name
    pub name: String,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Download URL
    pub url: String,
    /// Original filename
    pub filename: String,
    /// MIME type
    pub content_type: Option<String>,
    /// Size in bytes
    pub size_bytes: Option<u64>,
}

/// Outgoing message to send to a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Target channel ID
    pub channel_id: String,
    /// Message content
    pub content: OutgoingContent,
}

/// Outgoing message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingContent {
    /// Plain text, at most one platform message long
    Text { text: String },
}

impl OutgoingContent {
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// How to answer an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionReply {
    /// Acknowledge without visible output
    Deferred,
    /// Reply only the invoking user can see
    Ephemeral { text: String },
    /// Public message carrying the "start report" button
    ButtonPrompt { text: String, label: String },
}
