//! Configuration management for the intake bot.
//!
//! The bot reads a single JSON file once at startup. Nothing in it can change
//! while the process runs.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (`INTAKE_*` prefix) for secrets and log settings
//! 2. Explicit config file values
//! 3. Default values
//!
//! # File Lookup
//!
//! - `INTAKE_BOT_CONFIG` → explicit path
//! - `./config/config.json`
//! - `<user config dir>/intake-bot/config.json`
//!
//! # Environment Variable Mapping
//!
//! - `INTAKE_BOT_TOKEN` → bot_token
//! - `INTAKE_LOG_LEVEL` → observability.log_level
//! - `INTAKE_LOG_FORMAT` → observability.log_format

use crate::error::{Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default slash command that posts the "start report" button.
pub const DEFAULT_SLASH_COMMAND: &str = "bugreportbutton";

/// Get the per-user configuration directory.
pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "intake-bot").map_or_else(
        || PathBuf::from(".intake-bot"),
        |dirs| dirs.config_dir().to_path_buf(),
    )
}

/// Resolve the configuration file path.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("INTAKE_BOT_CONFIG") {
        return PathBuf::from(path);
    }

    let local = PathBuf::from("config").join("config.json");
    if local.exists() {
        return local;
    }

    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token
    #[serde(default)]
    pub bot_token: String,

    /// Discord application ID (needed for slash command registration)
    #[serde(default)]
    pub application_id: String,

    /// Guild the slash command is registered in
    #[serde(default)]
    pub guild_id: String,

    /// Channel compiled reports are posted to
    #[serde(default)]
    pub report_channel_id: String,

    /// Channel where the slash command may post the start button
    #[serde(default)]
    pub submit_channel_id: String,

    /// Name of the slash command that posts the start button
    #[serde(default = "default_slash_command")]
    pub slash_command_name: String,

    /// DM command keywords
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Ordered question catalog
    #[serde(default)]
    pub questions: Vec<QuestionConfig>,

    /// Numeric tunables
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Message templates
    #[serde(default, alias = "messages_data")]
    pub messages: MessagesConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_slash_command() -> String {
    DEFAULT_SLASH_COMMAND.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            application_id: String::new(),
            guild_id: String::new(),
            report_channel_id: String::new(),
            submit_channel_id: String::new(),
            slash_command_name: default_slash_command(),
            commands: CommandsConfig::default(),
            questions: Vec::new(),
            limits: LimitsConfig::default(),
            messages: MessagesConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the resolved default path.
    ///
    /// A missing file is an error: the bot has no usable defaults for its
    /// token, channels, or questions.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration, apply environment overrides, and validate.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("INTAKE_BOT_TOKEN") {
            self.bot_token = token;
        }

        if let Ok(level) = std::env::var("INTAKE_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(format) = std::env::var("INTAKE_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Keywords recognised in DMs. Matching is case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Optional prefix every keyword must carry (e.g. "!")
    pub prefix: String,
    pub submit: String,
    pub edit: String,
    pub cancel: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            submit: "submit".into(),
            edit: "edit".into(),
            cancel: "cancel".into(),
        }
    }
}

impl CommandsConfig {
    /// Full submit command as the user types it.
    pub fn submit_command(&self) -> String {
        format!("{}{}", self.prefix, self.submit)
    }

    /// Full edit command as the user types it.
    pub fn edit_command(&self) -> String {
        format!("{}{}", self.prefix, self.edit)
    }

    /// Full cancel command as the user types it.
    pub fn cancel_command(&self) -> String {
        format!("{}{}", self.prefix, self.cancel)
    }
}

// ============================================================================
// Questions
// ============================================================================

/// One question as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionConfig {
    /// Prompt sent to the user
    pub question: String,

    /// Short label used in previews and the posted report
    #[serde(default)]
    pub pretty_format: String,

    /// If non-empty, the answer must be one of these (case-insensitive)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_answers: Vec<String>,
}

// ============================================================================
// Limits
// ============================================================================

/// Numeric tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Minutes without activity before a report is discarded
    pub report_timeout_minutes: u64,
    /// Attachments accepted per report
    pub max_attachments: usize,
    /// Window in which repeated button clicks are ignored
    pub button_cooldown_seconds: u64,
    /// Window in which repeated "already active"/"cooldown" notices are suppressed
    pub message_cooldown_seconds: u64,
    /// Minutes a user must wait after submitting before starting another report
    pub report_cooldown_minutes: u64,
    /// Delay before channel notices are deleted
    pub ephemeral_delete_seconds: u64,
    /// How often the cleanup sweep runs
    pub sweep_interval_seconds: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            report_timeout_minutes: 30,
            max_attachments: 5,
            button_cooldown_seconds: 5,
            message_cooldown_seconds: 30,
            report_cooldown_minutes: 60,
            ephemeral_delete_seconds: 10,
            sweep_interval_seconds: 10,
        }
    }
}

impl LimitsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_minutes.saturating_mul(60))
    }

    pub fn button_cooldown(&self) -> Duration {
        Duration::from_secs(self.button_cooldown_seconds)
    }

    pub fn message_cooldown(&self) -> Duration {
        Duration::from_secs(self.message_cooldown_seconds)
    }

    pub fn report_cooldown(&self) -> Duration {
        Duration::from_secs(self.report_cooldown_minutes.saturating_mul(60))
    }

    pub fn ephemeral_delete_delay(&self) -> Duration {
        Duration::from_secs(self.ephemeral_delete_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

// ============================================================================
// Messages
// ============================================================================

/// User-facing message templates.
///
/// Placeholders such as `{{USER_TAG}}` are filled in at send time; see
/// [`crate::templates`] for the full list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub welcome_message: String,
    pub unable_to_dm_person: String,
    pub interaction_not_allowed: String,
    pub interaction_button_content: String,
    pub interaction_button_label: String,
    pub already_in_report: String,
    pub report_on_cooldown: String,
    pub invalid_fixed_answer: String,
    pub invalid_edit_number: String,
    pub max_attachments: String,
    pub attachments_added: String,
    pub review_header: String,
    pub review_footer: String,
    pub report_header: String,
    pub submitted_by: String,
    pub report_submitted: String,
    pub submit_failed: String,
    pub report_cancelled: String,
    pub inactive_report: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome_message: "Hi! Let's put your report together. Answer each question in its own message, \
                or type `{{CANCEL_COMMAND}}` to stop. Reports are discarded after {{REPORT_TIMEOUT}} minutes of inactivity."
                .into(),
            unable_to_dm_person: "{{USER_TAG}} I couldn't send you a direct message. \
                Please allow DMs from server members and try again."
                .into(),
            interaction_not_allowed: "This command can't be used in this channel.".into(),
            interaction_button_content: "Click the button below to start a report.".into(),
            interaction_button_label: "Start report".into(),
            already_in_report: "You already have a report in progress. Answer the last question, \
                or type `{{CANCEL_COMMAND}}` to discard it."
                .into(),
            report_on_cooldown: "You submitted a report recently. \
                Please wait {{COOLDOWN_MINUTES}} minutes before starting a new one."
                .into(),
            invalid_fixed_answer: "That isn't a valid answer. Please reply with one of: {{ACCEPTED_ANSWERS}}"
                .into(),
            invalid_edit_number: "Please give a valid question number between 1 and {{QUESTION_COUNT}}, \
                for example `{{EDIT_COMMAND}} 1`."
                .into(),
            max_attachments: "A report can't have more than {{MAX_ATTACHMENTS}} attachments.".into(),
            attachments_added: "Attachment saved. You can add {{ATTACHMENTS_REMAINING}} more.".into(),
            review_header: "Here is your report so far:".into(),
            review_footer: "Type `{{SUBMIT_COMMAND}}` to send it, `{{EDIT_COMMAND}} <number>` to change an answer, \
                or `{{CANCEL_COMMAND}}` to discard it."
                .into(),
            report_header: "**New report**".into(),
            submitted_by: "Submitted by {{USER_TAG}}".into(),
            report_submitted: "Thanks! Your report has been submitted.".into(),
            submit_failed: "Your report couldn't be delivered right now. \
                Please type `{{SUBMIT_COMMAND}}` again in a moment."
                .into(),
            report_cancelled: "Your report has been cancelled.".into(),
            inactive_report: "Your report was discarded after {{REPORT_TIMEOUT}} minutes of inactivity."
                .into(),
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
