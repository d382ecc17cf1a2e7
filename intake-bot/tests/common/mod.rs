//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use intake_bot::{
    Channel, ChannelError, ChannelResult, DirectMessage, Interaction, InteractionReply, Outbound,
    OutgoingMessage, ReportService, REPORT_BUTTON_ID,
};
use intake_common::{Config, QuestionConfig};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const REPORT_CHANNEL: &str = "reports";
pub const SUBMIT_CHANNEL: &str = "help-desk";

/// Channel that records everything and fails on demand.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    deleted: Mutex<Vec<(String, String)>>,
    replies: Mutex<Vec<InteractionReply>>,
    unreachable_users: Mutex<HashSet<String>>,
    failing_channels: Mutex<HashSet<String>>,
    /// Sends left before one send to the channel fails
    failing_after: Mutex<HashMap<String, usize>>,
    next_id: AtomicU64,
}

impl RecordingChannel {
    pub fn dm_channel(user_id: &str) -> String {
        format!("dm-{user_id}")
    }

    /// Texts sent to a user's DM channel, in order.
    pub fn dms(&self, user_id: &str) -> Vec<String> {
        self.texts_in(&Self::dm_channel(user_id))
    }

    /// Every text sent to a channel, including deleted ones.
    pub fn texts_in(&self, channel_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| m.channel_id == channel_id)
            .map(|(_, m)| m.content.text().to_string())
            .collect()
    }

    /// Texts still present in a channel.
    pub fn visible_in(&self, channel_id: &str) -> Vec<String> {
        let deleted = self.deleted();
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, m)| {
                m.channel_id == channel_id
                    && !deleted.iter().any(|(c, d)| c == channel_id && d == id)
            })
            .map(|(_, m)| m.content.text().to_string())
            .collect()
    }

    pub fn last_dm(&self, user_id: &str) -> String {
        self.dms(user_id).pop().unwrap_or_default()
    }

    pub fn count_dms_containing(&self, user_id: &str, needle: &str) -> usize {
        self.dms(user_id).iter().filter(|t| t.contains(needle)).count()
    }

    pub fn replies(&self) -> Vec<InteractionReply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn make_unreachable(&self, user_id: &str) {
        self.unreachable_users
            .lock()
            .unwrap()
            .insert(user_id.to_string());
    }

    pub fn fail_channel(&self, channel_id: &str) {
        self.failing_channels
            .lock()
            .unwrap()
            .insert(channel_id.to_string());
    }

    pub fn heal_channel(&self, channel_id: &str) {
        self.failing_channels.lock().unwrap().remove(channel_id);
    }

    /// Let `successes` sends to the channel through, then fail the next one.
    pub fn fail_send_after(&self, channel_id: &str, successes: usize) {
        self.failing_after
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), successes);
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn open_dm(&self, user_id: &str) -> ChannelResult<String> {
        if self.unreachable_users.lock().unwrap().contains(user_id) {
            return Err(ChannelError::Unreachable(format!("{user_id} has DMs closed")));
        }
        Ok(Self::dm_channel(user_id))
    }

    async fn send(&self, message: OutgoingMessage) -> ChannelResult<String> {
        if self
            .failing_channels
            .lock()
            .unwrap()
            .contains(&message.channel_id)
        {
            return Err(ChannelError::SendFailed("channel unavailable".into()));
        }

        {
            let mut failing_after = self.failing_after.lock().unwrap();
            if let Some(left) = failing_after.get_mut(&message.channel_id) {
                if *left == 0 {
                    failing_after.remove(&message.channel_id);
                    return Err(ChannelError::SendFailed("channel hiccup".into()));
                }
                *left -= 1;
            }
        }

        let id = format!("msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push((id.clone(), message));
        Ok(id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> ChannelResult<()> {
        self.deleted
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn respond_interaction(
        &self,
        _interaction: &Interaction,
        reply: InteractionReply,
    ) -> ChannelResult<()> {
        self.replies.lock().unwrap().push(reply);
        Ok(())
    }
}

pub fn question(prompt: &str, label: &str, fixed: &[&str]) -> QuestionConfig {
    QuestionConfig {
        question: prompt.into(),
        pretty_format: label.into(),
        fixed_answers: fixed.iter().map(|s| s.to_string()).collect(),
    }
}

/// Config with the given questions and test channel IDs.
pub fn config(questions: Vec<QuestionConfig>) -> Config {
    Config {
        bot_token: "token".into(),
        report_channel_id: REPORT_CHANNEL.into(),
        submit_channel_id: SUBMIT_CHANNEL.into(),
        questions,
        ..Config::default()
    }
}

/// Two questions: free text, then yes/no.
pub fn two_questions() -> Config {
    config(vec![
        question("What happened?", "Summary", &[]),
        question("Can you reproduce it?", "Reproducible", &["yes", "no"]),
    ])
}

/// Three free-text-or-fixed questions.
pub fn three_questions() -> Config {
    config(vec![
        question("What happened?", "Summary", &[]),
        question("Can you reproduce it?", "Reproducible", &["yes", "no"]),
        question("Which version?", "Version", &[]),
    ])
}

pub fn build(config: &Config) -> (Arc<ReportService>, Arc<RecordingChannel>) {
    let channel = Arc::new(RecordingChannel::default());
    let outbound = Arc::new(Outbound::new(channel.clone(), &config.report_channel_id));
    let service = ReportService::new(config, outbound).unwrap();
    (Arc::new(service), channel)
}

pub fn dm(user_id: &str, content: &str) -> DirectMessage {
    DirectMessage {
        id: "m".into(),
        user_id: user_id.into(),
        channel_id: RecordingChannel::dm_channel(user_id),
        content: content.into(),
        attachments: vec![],
        timestamp: 0,
    }
}

pub fn with_files(user_id: &str, names: &[&str]) -> DirectMessage {
    DirectMessage {
        attachments: names
            .iter()
            .map(|name| intake_bot::Attachment {
                url: format!("https://cdn.example/{name}"),
                filename: name.to_string(),
                content_type: None,
                size_bytes: None,
            })
            .collect(),
        ..dm(user_id, "")
    }
}

pub fn button(user_id: &str, channel_id: &str) -> Interaction {
    Interaction {
        id: "i".into(),
        token: "t".into(),
        user_id: user_id.into(),
        channel_id: channel_id.into(),
        guild_id: Some("guild".into()),
        name: REPORT_BUTTON_ID.into(),
    }
}

/// Send each text as a DM, in order.
pub async fn say(service: &ReportService, user_id: &str, texts: &[&str]) {
    for text in texts {
        service.handle_direct_message(&dm(user_id, text)).await;
    }
}
