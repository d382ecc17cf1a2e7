//! Per-user report session.
//!
//! A [`Session`] is a pure state machine: it decides what a message means and
//! returns a [`Step`] describing what should be sent. It never talks to the
//! platform itself; the service performs the sends.
//!
//! ```text
//!  Collecting(0) ──answer──▶ Collecting(1) ── … ──▶ SubmitMenu
//!                                                    │   ▲
//!                                          edit <n>  ▼   │ answer
//!                                                  Editing(n-1)
//! ```
//!
//! `reached_end` latches the first time the submit menu is entered. After
//! that, any accepted answer goes back to the submit menu rather than to the
//! next question, and submitting becomes possible.

pub mod registry;
pub mod report;

use crate::catalog::Catalog;
use crate::commands::{parse_question_number, Command, CommandKeywords};
use crate::message::Attachment;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub use registry::{AlreadyActive, SessionHandle, SessionRegistry};

/// Where the session is in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Answering questions in order
    Collecting,
    /// Re-answering one question picked from the submit menu
    Editing,
    /// Reviewing the whole report
    SubmitMenu,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::Editing => "editing",
            Self::SubmitMenu => "submit_menu",
        }
    }
}

/// What the service should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Send the question at this index
    Ask(usize),
    /// Re-prompt the question at this index with its accepted answers
    InvalidAnswer(usize),
    /// Edit argument was not a question number
    InvalidEditNumber,
    /// Send the review preview
    Review,
    /// Deliver the transcript
    Submit,
    /// Session was cancelled and closed
    Cancelled,
    /// Session is already closed; do nothing
    Ignored,
}

/// Result of adding attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentOutcome {
    /// None fit under the cap
    Full,
    Added {
        added: usize,
        remaining: usize,
        /// The session is in the submit menu and the preview should be resent
        review: bool,
    },
    /// Session is already closed
    Ignored,
}

/// Replace every `@` so stored answers can't ping anyone when posted.
pub fn sanitize_answer(text: &str) -> String {
    text.replace('@', "at")
}

/// In-progress report for one user.
#[derive(Debug)]
pub struct Session {
    user_id: String,
    catalog: Arc<Catalog>,
    answers: Vec<Option<String>>,
    index: usize,
    phase: Phase,
    reached_end: bool,
    closed: bool,
    attachments: Vec<Attachment>,
    started_at: Instant,
    last_interaction: Instant,
}

impl Session {
    pub fn new(user_id: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        let now = Instant::now();
        Self {
            user_id: user_id.into(),
            answers: vec![None; catalog.len()],
            catalog,
            index: 0,
            phase: Phase::Collecting,
            reached_end: false,
            closed: false,
            attachments: Vec::new(),
            started_at: now,
            last_interaction: now,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reached_end(&self) -> bool {
        self.reached_end
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn last_interaction(&self) -> Instant {
        self.last_interaction
    }

    pub fn can_edit(&self) -> bool {
        self.phase == Phase::SubmitMenu
    }

    pub fn can_submit(&self) -> bool {
        self.reached_end
    }

    fn should_record_answer(&self) -> bool {
        self.phase != Phase::SubmitMenu
    }

    /// True once `timeout` has fully elapsed since the last interaction.
    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_interaction) > timeout
    }

    /// Mark the session finished. Later messages are ignored.
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn touch(&mut self) {
        self.last_interaction = Instant::now();
    }

    /// Handle a text message.
    pub fn handle_text(&mut self, keywords: &CommandKeywords, text: &str) -> Step {
        if self.closed {
            return Step::Ignored;
        }

        match keywords.parse(text) {
            Command::Cancel => {
                self.close();
                Step::Cancelled
            }
            Command::Submit if self.can_submit() => {
                self.touch();
                Step::Submit
            }
            Command::Edit(arg) if self.can_edit() => {
                self.touch();
                match parse_question_number(arg, self.catalog.len()) {
                    Some(index) => {
                        self.index = index;
                        self.phase = Phase::Editing;
                        Step::Ask(index)
                    }
                    None => Step::InvalidEditNumber,
                }
            }
            _ => self.answer(text),
        }
    }

    fn answer(&mut self, text: &str) -> Step {
        if !self.catalog.accepts(self.index, text) {
            return Step::InvalidAnswer(self.index);
        }

        self.touch();
        if self.should_record_answer() {
            self.answers[self.index] = Some(sanitize_answer(text));
        }

        let last = self.catalog.last_index();
        if self.index == last || self.reached_end {
            self.index = last;
            self.enter_submit_menu();
            Step::Review
        } else {
            self.index += 1;
            Step::Ask(self.index)
        }
    }

    fn enter_submit_menu(&mut self) {
        self.phase = Phase::SubmitMenu;
        self.reached_end = true;
    }

    /// Append attachments up to `cap` in total.
    pub fn add_attachments(&mut self, incoming: &[Attachment], cap: usize) -> AttachmentOutcome {
        if self.closed {
            return AttachmentOutcome::Ignored;
        }

        self.touch();

        let room = cap.saturating_sub(self.attachments.len());
        if room == 0 {
            return AttachmentOutcome::Full;
        }

        let added = incoming.len().min(room);
        self.attachments.extend_from_slice(&incoming[..added]);

        let review = self.phase == Phase::SubmitMenu;
        if review {
            self.enter_submit_menu();
        }

        AttachmentOutcome::Added {
            added,
            remaining: room - added,
            review,
        }
    }
}
