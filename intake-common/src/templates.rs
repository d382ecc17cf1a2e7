//! User-facing message templates.
//!
//! Templates are compiled once when the configuration is loaded, so a broken
//! template stops the bot at startup instead of at the first send.
//!
//! # Placeholders
//!
//! | Token                       | Value                                   |
//! |-----------------------------|-----------------------------------------|
//! | `{{REPORT_TIMEOUT}}`        | idle timeout in minutes                 |
//! | `{{USER_TAG}}`              | mention of the user, e.g. `<@123>`      |
//! | `{{SUBMIT_COMMAND}}`        | prefix + submit keyword                 |
//! | `{{EDIT_COMMAND}}`          | prefix + edit keyword                   |
//! | `{{CANCEL_COMMAND}}`        | prefix + cancel keyword                 |
//! | `{{ATTACHMENTS_REMAINING}}` | attachments the report can still take   |
//! | `{{MAX_ATTACHMENTS}}`       | attachment cap                          |
//! | `{{COOLDOWN_MINUTES}}`      | post-submit cooldown in minutes         |
//! | `{{QUESTION_COUNT}}`        | number of questions                     |
//! | `{{ACCEPTED_ANSWERS}}`      | comma-separated fixed answers           |

use handlebars::Handlebars;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::config::{Config, MessagesConfig};
use crate::error::{Error, Result};

/// Placeholder names.
pub mod placeholders {
    pub const REPORT_TIMEOUT: &str = "REPORT_TIMEOUT";
    pub const USER_TAG: &str = "USER_TAG";
    pub const SUBMIT_COMMAND: &str = "SUBMIT_COMMAND";
    pub const EDIT_COMMAND: &str = "EDIT_COMMAND";
    pub const CANCEL_COMMAND: &str = "CANCEL_COMMAND";
    pub const ATTACHMENTS_REMAINING: &str = "ATTACHMENTS_REMAINING";
    pub const MAX_ATTACHMENTS: &str = "MAX_ATTACHMENTS";
    pub const COOLDOWN_MINUTES: &str = "COOLDOWN_MINUTES";
    pub const QUESTION_COUNT: &str = "QUESTION_COUNT";
    pub const ACCEPTED_ANSWERS: &str = "ACCEPTED_ANSWERS";
}

/// Every message the bot can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Welcome,
    UnableToDm,
    InteractionNotAllowed,
    ButtonContent,
    ButtonLabel,
    AlreadyInReport,
    ReportOnCooldown,
    InvalidFixedAnswer,
    InvalidEditNumber,
    MaxAttachments,
    AttachmentsAdded,
    ReviewHeader,
    ReviewFooter,
    ReportHeader,
    SubmittedBy,
    ReportSubmitted,
    SubmitFailed,
    ReportCancelled,
    InactiveReport,
}

impl MessageKind {
    pub const ALL: [Self; 19] = [
        Self::Welcome,
        Self::UnableToDm,
        Self::InteractionNotAllowed,
        Self::ButtonContent,
        Self::ButtonLabel,
        Self::AlreadyInReport,
        Self::ReportOnCooldown,
        Self::InvalidFixedAnswer,
        Self::InvalidEditNumber,
        Self::MaxAttachments,
        Self::AttachmentsAdded,
        Self::ReviewHeader,
        Self::ReviewFooter,
        Self::ReportHeader,
        Self::SubmittedBy,
        Self::ReportSubmitted,
        Self::SubmitFailed,
        Self::ReportCancelled,
        Self::InactiveReport,
    ];

    /// Config field name, also used as the template name.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Welcome => "welcome_message",
            Self::UnableToDm => "unable_to_dm_person",
            Self::InteractionNotAllowed => "interaction_not_allowed",
            Self::ButtonContent => "interaction_button_content",
            Self::ButtonLabel => "interaction_button_label",
            Self::AlreadyInReport => "already_in_report",
            Self::ReportOnCooldown => "report_on_cooldown",
            Self::InvalidFixedAnswer => "invalid_fixed_answer",
            Self::InvalidEditNumber => "invalid_edit_number",
            Self::MaxAttachments => "max_attachments",
            Self::AttachmentsAdded => "attachments_added",
            Self::ReviewHeader => "review_header",
            Self::ReviewFooter => "review_footer",
            Self::ReportHeader => "report_header",
            Self::SubmittedBy => "submitted_by",
            Self::ReportSubmitted => "report_submitted",
            Self::SubmitFailed => "submit_failed",
            Self::ReportCancelled => "report_cancelled",
            Self::InactiveReport => "inactive_report",
        }
    }

    fn source(self, messages: &MessagesConfig) -> &str {
        match self {
            Self::Welcome => &messages.welcome_message,
            Self::UnableToDm => &messages.unable_to_dm_person,
            Self::InteractionNotAllowed => &messages.interaction_not_allowed,
            Self::ButtonContent => &messages.interaction_button_content,
            Self::ButtonLabel => &messages.interaction_button_label,
            Self::AlreadyInReport => &messages.already_in_report,
            Self::ReportOnCooldown => &messages.report_on_cooldown,
            Self::InvalidFixedAnswer => &messages.invalid_fixed_answer,
            Self::InvalidEditNumber => &messages.invalid_edit_number,
            Self::MaxAttachments => &messages.max_attachments,
            Self::AttachmentsAdded => &messages.attachments_added,
            Self::ReviewHeader => &messages.review_header,
            Self::ReviewFooter => &messages.review_footer,
            Self::ReportHeader => &messages.report_header,
            Self::SubmittedBy => &messages.submitted_by,
            Self::ReportSubmitted => &messages.report_submitted,
            Self::SubmitFailed => &messages.submit_failed,
            Self::ReportCancelled => &messages.report_cancelled,
            Self::InactiveReport => &messages.inactive_report,
        }
    }
}

/// Compiled message templates plus the placeholder values fixed at load time.
pub struct MessageTemplates {
    registry: Handlebars<'static>,
    sources: HashMap<MessageKind, String>,
    base: Map<String, Value>,
}

impl MessageTemplates {
    /// Compile every template in the config.
    pub fn compile(config: &Config) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        let mut sources = HashMap::with_capacity(MessageKind::ALL.len());
        for kind in MessageKind::ALL {
            let source = kind.source(&config.messages);
            registry
                .register_template_string(kind.key(), source)
                .map_err(|e| Error::Template {
                    name: kind.key().to_string(),
                    reason: e.to_string(),
                })?;
            sources.insert(kind, source.to_string());
        }

        Ok(Self {
            registry,
            sources,
            base: base_values(config),
        })
    }

    /// Render a template with only the load-time placeholders.
    pub fn render(&self, kind: MessageKind) -> String {
        self.render_with(kind, &[])
    }

    /// Render a template with extra per-send placeholders.
    ///
    /// A render failure falls back to the raw template text.
    pub fn render_with(&self, kind: MessageKind, extra: &[(&str, String)]) -> String {
        let mut values = self.base.clone();
        for (key, value) in extra {
            values.insert((*key).to_string(), Value::String(value.clone()));
        }

        match self.registry.render(kind.key(), &Value::Object(values)) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(template = kind.key(), error = %e, "Template render failed");
                self.sources.get(&kind).cloned().unwrap_or_default()
            }
        }
    }
}

fn base_values(config: &Config) -> Map<String, Value> {
    use placeholders::*;

    let limits = &config.limits;
    let pairs = [
        (REPORT_TIMEOUT, limits.report_timeout_minutes.to_string()),
        (COOLDOWN_MINUTES, limits.report_cooldown_minutes.to_string()),
        (MAX_ATTACHMENTS, limits.max_attachments.to_string()),
        (QUESTION_COUNT, config.questions.len().to_string()),
        (SUBMIT_COMMAND, config.commands.submit_command()),
        (EDIT_COMMAND, config.commands.edit_command()),
        (CANCEL_COMMAND, config.commands.cancel_command()),
    ];

    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v)))
        .collect()
}

/// Discord mention markup for a user.
pub fn user_tag(user_id: &str) -> String {
    format!("<@{user_id}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandsConfig, QuestionConfig};

    fn config() -> Config {
        let mut config = Config {
            questions: vec![
                QuestionConfig {
                    question: "q1".into(),
                    pretty_format: "Q1".into(),
                    fixed_answers: vec![],
                },
                QuestionConfig {
                    question: "q2".into(),
                    pretty_format: "Q2".into(),
                    fixed_answers: vec![],
                },
            ],
            commands: CommandsConfig {
                prefix: "!".into(),
                ..CommandsConfig::default()
            },
            ..Config::default()
        };
        config.limits.report_timeout_minutes = 20;
        config
    }

    #[test]
    fn test_default_templates_compile() {
        assert!(MessageTemplates::compile(&Config::default()).is_ok());
    }

    #[test]
    fn test_base_placeholders_substituted() {
        let templates = MessageTemplates::compile(&config()).unwrap();

        let welcome = templates.render(MessageKind::Welcome);
        assert!(welcome.contains("20 minutes"));
        assert!(welcome.contains("`!cancel`"));

        let edit = templates.render(MessageKind::InvalidEditNumber);
        assert!(edit.contains("between 1 and 2"));
        assert!(edit.contains("`!edit 1`"));
    }

    #[test]
    fn test_mentions_are_not_escaped() {
        let templates = MessageTemplates::compile(&config()).unwrap();
        let text = templates.render_with(
            MessageKind::UnableToDm,
            &[(placeholders::USER_TAG, user_tag("42"))],
        );
        assert!(text.starts_with("<@42>"));
    }

    #[test]
    fn test_broken_template_is_rejected() {
        let mut config = config();
        config.messages.report_submitted = "Thanks {{#if}}".into();

        let err = MessageTemplates::compile(&config).err().unwrap();
        assert!(matches!(err, Error::Template { ref name, .. } if name == "report_submitted"));
    }

    #[test]
    fn test_every_kind_has_unique_key() {
        let mut keys: Vec<_> = MessageKind::ALL.iter().map(|k| k.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), MessageKind::ALL.len());
    }
}
