//! Report text shown to the user and posted to the report channel.

use super::Session;
use crate::message::Attachment;
use chrono::{DateTime, Utc};
use intake_common::templates::{placeholders, user_tag};
use intake_common::{MessageKind, MessageTemplates};
use std::fmt::Write;

/// Numbered review of every answered question, for the submit menu.
pub fn render_preview(session: &Session, templates: &MessageTemplates) -> String {
    let mut out = templates.render(MessageKind::ReviewHeader);
    out.push_str("\n\n");

    for (i, question, answer) in answered(session) {
        let _ = writeln!(out, "{}. **{}**\n{}\n", i + 1, question, answer);
    }

    push_attachments(&mut out, session.attachments());
    out.push_str(&templates.render(MessageKind::ReviewFooter));
    out
}

/// Final transcript posted to the report channel.
pub fn render_transcript(
    session: &Session,
    templates: &MessageTemplates,
    submitted_at: DateTime<Utc>,
) -> String {
    let mut out = templates.render(MessageKind::ReportHeader);
    out.push_str("\n\n");

    for (_, question, answer) in answered(session) {
        let _ = writeln!(out, "**{question}**\n{answer}\n");
    }

    push_attachments(&mut out, session.attachments());

    let submitted_by = templates.render_with(
        MessageKind::SubmittedBy,
        &[(placeholders::USER_TAG, user_tag(session.user_id()))],
    );
    let _ = write!(
        out,
        "{} at {}",
        submitted_by,
        submitted_at.format("%Y-%m-%d %H:%M UTC")
    );
    out
}

fn answered(session: &Session) -> impl Iterator<Item = (usize, &str, &str)> {
    session
        .catalog()
        .questions()
        .iter()
        .zip(session.answers())
        .enumerate()
        .filter_map(|(i, (question, answer))| {
            answer
                .as_deref()
                .map(|answer| (i, question.label.as_str(), answer))
        })
}

fn push_attachments(out: &mut String, attachments: &[Attachment]) {
    if attachments.is_empty() {
        return;
    }

    out.push_str("**Attachments**\n");
    for attachment in attachments {
        let _ = writeln!(out, "{}: {}", attachment.filename, attachment.url);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Question};
    use crate::commands::CommandKeywords;
    use chrono::TimeZone;
    use intake_common::Config;
    use std::sync::Arc;

    fn session() -> Session {
        let catalog = Catalog::new(vec![
            Question {
                prompt: "What happened?".into(),
                label: "Summary".into(),
                fixed_answers: vec![],
            },
            Question {
                prompt: "Can you reproduce it?".into(),
                label: "Reproducible".into(),
                fixed_answers: vec!["yes".into(), "no".into()],
            },
        ])
        .unwrap();

        let keywords = CommandKeywords::default();
        let mut session = Session::new("42", Arc::new(catalog));
        session.handle_text(&keywords, "crash on start");
        session.handle_text(&keywords, "no");
        session
    }

    fn templates() -> MessageTemplates {
        MessageTemplates::compile(&Config::default()).unwrap()
    }

    #[test]
    fn test_preview_is_numbered_in_catalog_order() {
        let preview = render_preview(&session(), &templates());

        let first = preview.find("1. **Summary**\ncrash on start").unwrap();
        let second = preview.find("2. **Reproducible**\nno").unwrap();
        assert!(first < second);
        assert!(preview.starts_with("Here is your report so far:"));
        assert!(preview.contains("`submit`"));
    }

    #[test]
    fn test_preview_skips_unanswered_slots() {
        let catalog = session().catalog().questions().to_vec();
        let session = Session::new("42", Arc::new(Catalog::new(catalog).unwrap()));

        let preview = render_preview(&session, &templates());
        assert!(!preview.contains("Summary"));
    }

    #[test]
    fn test_transcript_has_no_ordinals_and_names_submitter() {
        let mut session = session();
        session.add_attachments(
            &[Attachment {
                url: "https://cdn.example/log.txt".into(),
                filename: "log.txt".into(),
                content_type: Some("text/plain".into()),
                size_bytes: Some(12),
            }],
            5,
        );
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();

        let transcript = render_transcript(&session, &templates(), at);

        assert!(transcript.starts_with("**New report**"));
        assert!(transcript.contains("**Summary**\ncrash on start"));
        assert!(!transcript.contains("1. "));
        assert!(transcript.contains("log.txt: https://cdn.example/log.txt"));
        assert!(transcript.ends_with("Submitted by <@42> at 2024-03-01 09:30 UTC"));
    }
}
