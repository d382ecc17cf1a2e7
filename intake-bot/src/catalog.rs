//! Question catalog.
//!
//! The catalog is built once from the configuration and shared read-only by
//! every session. Fixed answers are normalised to lowercase up front so that
//! matching an answer is a plain comparison.

use intake_common::QuestionConfig;
use std::sync::Arc;

/// Catalog construction error.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("the question catalog is empty")]
    Empty,

    #[error("question {index} has no prompt text")]
    MissingPrompt { index: usize },
}

/// One question of the intake form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Prompt sent to the user
    pub prompt: String,
    /// Label used in previews and transcripts
    pub label: String,
    /// Accepted answers as written in the config; empty means free text
    pub fixed_answers: Vec<String>,
}

impl Question {
    pub fn is_fixed(&self) -> bool {
        !self.fixed_answers.is_empty()
    }
}

impl From<&QuestionConfig> for Question {
    fn from(config: &QuestionConfig) -> Self {
        let label = if config.pretty_format.trim().is_empty() {
            config.question.clone()
        } else {
            config.pretty_format.clone()
        };

        Self {
            prompt: config.question.clone(),
            label,
            fixed_answers: config.fixed_answers.clone(),
        }
    }
}

/// Ordered, non-empty list of questions.
#[derive(Debug)]
pub struct Catalog {
    questions: Vec<Question>,
    /// Lowercased fixed answers, one list per question
    normalized: Vec<Vec<String>>,
}

impl Catalog {
    /// Build a catalog. Fails if there are no questions.
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::Empty);
        }

        if let Some(index) = questions.iter().position(|q| q.prompt.trim().is_empty()) {
            return Err(CatalogError::MissingPrompt { index });
        }

        let normalized = questions
            .iter()
            .map(|q| q.fixed_answers.iter().map(|a| a.to_lowercase()).collect())
            .collect();

        Ok(Self {
            questions,
            normalized,
        })
    }

    /// Build a shared catalog from config entries.
    pub fn from_config(questions: &[QuestionConfig]) -> Result<Arc<Self>, CatalogError> {
        Self::new(questions.iter().map(Question::from).collect()).map(Arc::new)
    }

    /// Number of questions. Always at least one.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn last_index(&self) -> usize {
        self.questions.len() - 1
    }

    /// Check an answer for the question at `index`.
    ///
    /// Free-text questions accept anything. Fixed-answer questions require an
    /// exact match after lowercasing both sides.
    pub fn accepts(&self, index: usize, answer: &str) -> bool {
        match self.normalized.get(index) {
            Some(accepted) if !accepted.is_empty() => {
                let answer = answer.to_lowercase();
                accepted.iter().any(|a| *a == answer)
            }
            _ => true,
        }
    }
}
