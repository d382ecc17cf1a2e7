//! Intake Common - shared configuration, templates, errors, and logging for the intake bot.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Message template compilation and rendering
//! - Error types
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod templates;
pub mod validation;

pub use config::{
    CommandsConfig, Config, LimitsConfig, MessagesConfig, ObservabilityConfig, QuestionConfig,
};
pub use error::{Error, Result};
pub use templates::{MessageKind, MessageTemplates};
pub use validation::{Validate, ValidationError, ValidationResult};
