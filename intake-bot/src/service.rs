//! Report service: owns every session and cooldown and turns inbound events
//! into session steps and outbound messages.

use crate::catalog::Catalog;
use crate::commands::CommandKeywords;
use crate::cooldown::CooldownRegistry;
use crate::message::{DirectMessage, Interaction, InteractionReply};
use crate::outbound::Outbound;
use crate::session::report::{render_preview, render_transcript};
use crate::session::{AttachmentOutcome, Session, SessionHandle, SessionRegistry, Step};
use anyhow::Context;
use chrono::Utc;
use intake_common::templates::{placeholders, user_tag};
use intake_common::{Config, LimitsConfig, MessageKind, MessageTemplates, Validate};
use std::sync::Arc;
use tokio::sync::MutexGuard;

/// How a start request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The user submitted a report recently
    OnCooldown,
    /// The user already has a session
    AlreadyActive,
    /// The welcome DM could not be delivered; no session was kept
    DmFailed,
    Started,
}

/// Single owner of the shared bot state.
pub struct ReportService {
    catalog: Arc<Catalog>,
    keywords: CommandKeywords,
    templates: MessageTemplates,
    limits: LimitsConfig,
    submit_channel_id: String,
    outbound: Arc<Outbound>,
    sessions: SessionRegistry,
    button_cooldowns: CooldownRegistry,
    message_cooldowns: CooldownRegistry,
    report_cooldowns: CooldownRegistry,
}

impl ReportService {
    /// Build the service from a validated config.
    ///
    /// The limits are checked again here since every cooldown and timeout is
    /// derived from them.
    pub fn new(config: &Config, outbound: Arc<Outbound>) -> anyhow::Result<Self> {
        config.limits.validate().context("Invalid limits")?;
        let catalog =
            Catalog::from_config(&config.questions).context("Invalid question catalog")?;
        let templates =
            MessageTemplates::compile(config).context("Failed to compile message templates")?;
        let limits = config.limits.clone();

        Ok(Self {
            catalog,
            keywords: CommandKeywords::from_config(&config.commands),
            templates,
            submit_channel_id: config.submit_channel_id.clone(),
            outbound,
            sessions: SessionRegistry::new(),
            button_cooldowns: CooldownRegistry::new("button", limits.button_cooldown()),
            message_cooldowns: CooldownRegistry::new("message", limits.message_cooldown()),
            report_cooldowns: CooldownRegistry::new("report", limits.report_cooldown()),
            limits,
        })
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// The three cooldown registries: button, message, report.
    pub fn cooldowns(&self) -> [&CooldownRegistry; 3] {
        [
            &self.button_cooldowns,
            &self.message_cooldowns,
            &self.report_cooldowns,
        ]
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn templates(&self) -> &MessageTemplates {
        &self.templates
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    // ========================================================================
    // Inbound handlers
    // ========================================================================

    /// Handle a private message.
    ///
    /// Without an active session the message only starts a new report; its
    /// content is not taken as an answer.
    pub async fn handle_direct_message(&self, dm: &DirectMessage) {
        let Some(handle) = self.sessions.get(&dm.user_id).await else {
            self.start_report(&dm.user_id, None).await;
            return;
        };

        let mut session = handle.lock().await;

        if dm.has_attachments() {
            let outcome = session.add_attachments(&dm.attachments, self.limits.max_attachments);
            self.apply_attachments(&session, outcome).await;
            return;
        }

        if dm.content.trim().is_empty() {
            tracing::debug!(user_id = %dm.user_id, "Ignoring empty message");
            return;
        }

        let step = session.handle_text(&self.keywords, &dm.content);
        tracing::debug!(
            user_id = %dm.user_id,
            step = ?step,
            slot = session.index(),
            phase = session.phase().as_str(),
            "Session step"
        );
        self.apply(&handle, session, step).await;
    }

    /// Handle a click on the start button.
    ///
    /// The click is always acknowledged first. Returns `None` when the click
    /// was swallowed by the button cooldown.
    pub async fn handle_button_click(&self, interaction: &Interaction) -> Option<StartOutcome> {
        let on_cooldown = self.button_cooldowns.check_and_set(&interaction.user_id);
        self.outbound
            .respond(interaction, InteractionReply::Deferred)
            .await;

        if on_cooldown {
            tracing::debug!(user_id = %interaction.user_id, "Button click on cooldown");
            return None;
        }

        Some(
            self.start_report(&interaction.user_id, Some(&interaction.channel_id))
                .await,
        )
    }

    /// Handle the slash command that posts the start button.
    pub async fn handle_slash_command(&self, interaction: &Interaction) -> InteractionReply {
        let allowed = self.submit_channel_id.is_empty()
            || interaction.channel_id == self.submit_channel_id;

        let reply = if allowed {
            InteractionReply::ButtonPrompt {
                text: self.templates.render(MessageKind::ButtonContent),
                label: self.templates.render(MessageKind::ButtonLabel),
            }
        } else {
            tracing::info!(
                user_id = %interaction.user_id,
                channel_id = %interaction.channel_id,
                "Slash command used outside the submit channel"
            );
            InteractionReply::Ephemeral {
                text: self.templates.render(MessageKind::InteractionNotAllowed),
            }
        };

        self.outbound.respond(interaction, reply.clone()).await;
        reply
    }

    /// Start a report for a user.
    ///
    /// `origin_channel` is the channel of the button that was clicked, used to
    /// tell the user their DMs are closed.
    pub async fn start_report(&self, user_id: &str, origin_channel: Option<&str>) -> StartOutcome {
        if self.report_cooldowns.is_active(user_id) {
            tracing::debug!(user_id = %user_id, "Report start on cooldown");
            self.notify_throttled(user_id, MessageKind::ReportOnCooldown)
                .await;
            return StartOutcome::OnCooldown;
        }

        let handle = match self
            .sessions
            .create(Session::new(user_id, self.catalog.clone()))
            .await
        {
            Ok(handle) => handle,
            Err(_) => {
                tracing::debug!(user_id = %user_id, "Report already active");
                self.notify_throttled(user_id, MessageKind::AlreadyInReport)
                    .await;
                return StartOutcome::AlreadyActive;
            }
        };

        // Held until the first question is out so an early reply waits for it.
        let mut session = handle.lock().await;
        let text = format!(
            "{}\n\n{}",
            self.templates.render(MessageKind::Welcome),
            self.question_text(0)
        );

        if self.outbound.send_dm(user_id, &text).await.success {
            tracing::info!(user_id = %user_id, questions = self.catalog.len(), "Report started");
            return StartOutcome::Started;
        }

        session.close();
        drop(session);
        self.sessions.remove_if_same(user_id, &handle).await;
        tracing::info!(user_id = %user_id, "Could not DM user, report not started");

        if let Some(channel_id) = origin_channel {
            let notice = self.templates.render_with(
                MessageKind::UnableToDm,
                &[(placeholders::USER_TAG, user_tag(user_id))],
            );
            self.outbound
                .send_ephemeral(channel_id, &notice, self.limits.ephemeral_delete_delay())
                .await;
        }

        StartOutcome::DmFailed
    }

    // ========================================================================
    // Effects
    // ========================================================================

    async fn apply(&self, handle: &SessionHandle, mut session: MutexGuard<'_, Session>, step: Step) {
        let user_id = session.user_id().to_string();

        match step {
            Step::Ask(index) => {
                self.dm(&user_id, &self.question_text(index)).await;
            }
            Step::InvalidAnswer(index) => {
                let accepted = self
                    .catalog
                    .get(index)
                    .map(|q| q.fixed_answers.join(", "))
                    .unwrap_or_default();
                let text = self.templates.render_with(
                    MessageKind::InvalidFixedAnswer,
                    &[(placeholders::ACCEPTED_ANSWERS, accepted)],
                );
                self.dm(&user_id, &text).await;
            }
            Step::InvalidEditNumber => {
                self.dm(&user_id, &self.templates.render(MessageKind::InvalidEditNumber))
                    .await;
            }
            Step::Review => {
                self.dm(&user_id, &render_preview(&session, &self.templates))
                    .await;
            }
            Step::Submit => {
                let transcript = render_transcript(&session, &self.templates, Utc::now());
                if !self.outbound.post_report(&transcript).await.success {
                    self.dm(&user_id, &self.templates.render(MessageKind::SubmitFailed))
                        .await;
                    return;
                }

                session.close();
                let elapsed = session.started_at().elapsed();
                drop(session);

                self.sessions.remove_if_same(&user_id, handle).await;
                self.report_cooldowns.set(&user_id);
                tracing::info!(
                    user_id = %user_id,
                    elapsed_secs = elapsed.as_secs(),
                    "Report submitted"
                );
                self.dm(&user_id, &self.templates.render(MessageKind::ReportSubmitted))
                    .await;
            }
            Step::Cancelled => {
                // A user's events run one at a time, so no newer session
                // can have taken this one's place.
                drop(session);
                self.sessions.remove(&user_id).await;
                tracing::info!(user_id = %user_id, "Report cancelled");
                self.dm(&user_id, &self.templates.render(MessageKind::ReportCancelled))
                    .await;
            }
            Step::Ignored => {}
        }
    }

    async fn apply_attachments(&self, session: &Session, outcome: AttachmentOutcome) {
        let user_id = session.user_id();

        match outcome {
            AttachmentOutcome::Full => {
                self.dm(user_id, &self.templates.render(MessageKind::MaxAttachments))
                    .await;
            }
            AttachmentOutcome::Added {
                added,
                remaining,
                review,
            } => {
                tracing::debug!(user_id = %user_id, added, remaining, "Attachments added");
                let text = self.templates.render_with(
                    MessageKind::AttachmentsAdded,
                    &[(placeholders::ATTACHMENTS_REMAINING, remaining.to_string())],
                );
                self.dm(user_id, &text).await;

                if review {
                    self.dm(user_id, &render_preview(session, &self.templates))
                        .await;
                }
            }
            AttachmentOutcome::Ignored => {}
        }
    }

    /// Send a notice at most once per message-cooldown window.
    async fn notify_throttled(&self, user_id: &str, kind: MessageKind) {
        if self.message_cooldowns.check_and_set(user_id) {
            return;
        }
        self.dm(user_id, &self.templates.render(kind)).await;
    }

    async fn dm(&self, user_id: &str, text: &str) -> bool {
        self.outbound.send_dm(user_id, text).await.success
    }

    fn question_text(&self, index: usize) -> String {
        self.catalog
            .get(index)
            .map(|q| q.prompt.clone())
            .unwrap_or_default()
    }
}
