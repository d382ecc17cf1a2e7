//! Configuration validation.
//!
//! Everything here runs once at startup. A configuration that fails
//! validation never reaches the point of accepting events.

use thiserror::Error;

use crate::config::{CommandsConfig, Config, LimitsConfig, QuestionConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("bot_token", &self.bot_token),
            ("report_channel_id", &self.report_channel_id),
            ("slash_command_name", &self.slash_command_name),
        ] {
            if let Err(e) = require_non_empty(field, value) {
                errors.push(e);
            }
        }

        if let Err(e) = validate_questions(&self.questions) {
            errors.push(e);
        }

        if let Err(e) = self.commands.validate() {
            errors.push(e);
        }

        if let Err(e) = self.limits.validate() {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// The catalog must be non-empty and every entry must carry a prompt.
fn validate_questions(questions: &[QuestionConfig]) -> ValidationResult<()> {
    if questions.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "questions".into(),
            reason: "at least one question is required".into(),
        });
    }

    for (index, question) in questions.iter().enumerate() {
        if question.question.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: format!("questions[{index}].question"),
            });
        }

        if question.fixed_answers.iter().any(|a| a.trim().is_empty()) {
            return Err(ValidationError::InvalidValue {
                field: format!("questions[{index}].fixed_answers"),
                reason: "fixed answers cannot be blank".into(),
            });
        }
    }

    Ok(())
}

impl Validate for CommandsConfig {
    fn validate(&self) -> ValidationResult<()> {
        let keywords = [
            ("commands.submit", &self.submit),
            ("commands.edit", &self.edit),
            ("commands.cancel", &self.cancel),
        ];

        for (field, keyword) in keywords {
            require_non_empty(field, keyword)?;
            if keyword.chars().any(char::is_whitespace) {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: "keywords cannot contain whitespace".into(),
                });
            }
        }

        for i in 0..keywords.len() {
            for j in (i + 1)..keywords.len() {
                if keywords[i].1.eq_ignore_ascii_case(keywords[j].1) {
                    return Err(ValidationError::Conflict {
                        reason: format!(
                            "{} and {} share the keyword '{}'",
                            keywords[i].0, keywords[j].0, keywords[i].1
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Longest report timeout or post-submit cooldown, in minutes (one week).
pub const MAX_LIMIT_MINUTES: u64 = 7 * 24 * 60;

/// Longest second-granularity window (one day).
pub const MAX_LIMIT_SECONDS: u64 = 24 * 60 * 60;

/// Most attachments a single report may carry.
pub const MAX_ATTACHMENTS: usize = 100;

impl Validate for LimitsConfig {
    fn validate(&self) -> ValidationResult<()> {
        let bounded = [
            ("limits.report_timeout_minutes", self.report_timeout_minutes, 1, MAX_LIMIT_MINUTES),
            ("limits.report_cooldown_minutes", self.report_cooldown_minutes, 0, MAX_LIMIT_MINUTES),
            ("limits.button_cooldown_seconds", self.button_cooldown_seconds, 0, MAX_LIMIT_SECONDS),
            ("limits.message_cooldown_seconds", self.message_cooldown_seconds, 0, MAX_LIMIT_SECONDS),
            ("limits.ephemeral_delete_seconds", self.ephemeral_delete_seconds, 0, MAX_LIMIT_SECONDS),
            ("limits.sweep_interval_seconds", self.sweep_interval_seconds, 1, MAX_LIMIT_SECONDS),
            ("limits.max_attachments", self.max_attachments as u64, 0, MAX_ATTACHMENTS as u64),
        ];

        for (field, value, min, max) in bounded {
            if !(min..=max).contains(&value) {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("must be between {min} and {max}, got {value}"),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn valid_config() -> Config {
        Config {
            bot_token: "token".into(),
            report_channel_id: "reports".into(),
            questions: vec![QuestionConfig {
                question: "What happened?".into(),
                pretty_format: "Summary".into(),
                fixed_answers: vec![],
            }],
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let config = Config {
            questions: vec![],
            ..valid_config()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "questions"));
    }

    #[test]
    fn test_blank_question_rejected() {
        let mut config = valid_config();
        config.questions[0].question = "   ".into();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("questions[0].question"));
    }

    #[test]
    fn test_duplicate_keywords_conflict() {
        let mut config = valid_config();
        config.commands.cancel = "SUBMIT".into();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ValidationError::Conflict { .. }));
    }

    #[test_case(|l| l.report_timeout_minutes = 0, "report_timeout_minutes" ; "zero timeout")]
    #[test_case(|l| l.report_timeout_minutes = u64::MAX, "report_timeout_minutes" ; "huge timeout")]
    #[test_case(|l| l.report_cooldown_minutes = MAX_LIMIT_MINUTES + 1, "report_cooldown_minutes" ; "cooldown past a week")]
    #[test_case(|l| l.button_cooldown_seconds = u64::MAX, "button_cooldown_seconds" ; "huge button cooldown")]
    #[test_case(|l| l.message_cooldown_seconds = MAX_LIMIT_SECONDS + 1, "message_cooldown_seconds" ; "message cooldown past a day")]
    #[test_case(|l| l.ephemeral_delete_seconds = u64::MAX, "ephemeral_delete_seconds" ; "huge delete delay")]
    #[test_case(|l| l.sweep_interval_seconds = 0, "sweep_interval_seconds" ; "zero sweep interval")]
    #[test_case(|l| l.max_attachments = usize::MAX, "max_attachments" ; "huge attachment cap")]
    fn test_out_of_range_limit_rejected(tweak: fn(&mut LimitsConfig), field: &str) {
        let mut config = valid_config();
        tweak(&mut config.limits);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains(field), "{err}");
        assert!(err.to_string().contains("must be between"), "{err}");
    }

    #[test]
    fn test_limits_at_upper_bounds_accepted() {
        let mut config = valid_config();
        config.limits.report_timeout_minutes = MAX_LIMIT_MINUTES;
        config.limits.report_cooldown_minutes = MAX_LIMIT_MINUTES;
        config.limits.button_cooldown_seconds = MAX_LIMIT_SECONDS;
        config.limits.message_cooldown_seconds = 0;
        config.limits.max_attachments = MAX_ATTACHMENTS;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let config = Config {
            bot_token: String::new(),
            report_channel_id: String::new(),
            ..valid_config()
        };

        match config.validate().unwrap_err() {
            ValidationError::Multiple(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test_case("", "Missing required field: commands.submit" ; "empty")]
    #[test_case("   ", "Missing required field: commands.submit" ; "blank")]
    #[test_case("send it", "cannot contain whitespace" ; "inner space")]
    #[test_case("Edit", "share the keyword" ; "same as edit")]
    fn test_bad_submit_keyword(keyword: &str, expected: &str) {
        let commands = CommandsConfig {
            submit: keyword.into(),
            ..CommandsConfig::default()
        };

        let err = commands.validate().unwrap_err();
        assert!(err.to_string().contains(expected), "{err}");
    }
}
