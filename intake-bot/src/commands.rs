//! DM command keywords.
//!
//! A message is a command when its first word equals prefix + keyword,
//! ignoring case. Submit and cancel must be the whole message; edit takes the
//! rest of the message as its argument. Anything else is plain content.

use intake_common::CommandsConfig;

/// What a DM asks for, before the session decides whether it is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Submit,
    Cancel,
    /// Edit with the raw (possibly empty) argument
    Edit(&'a str),
    /// Not a command
    Text,
}

/// Lowercased keywords used for matching.
#[derive(Debug, Clone)]
pub struct CommandKeywords {
    prefix: String,
    submit: String,
    edit: String,
    cancel: String,
}

impl CommandKeywords {
    pub fn from_config(config: &CommandsConfig) -> Self {
        Self {
            prefix: config.prefix.to_lowercase(),
            submit: config.submit.to_lowercase(),
            edit: config.edit.to_lowercase(),
            cancel: config.cancel.to_lowercase(),
        }
    }

    /// Classify a message.
    pub fn parse<'a>(&self, content: &'a str) -> Command<'a> {
        let trimmed = content.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };

        let head = head.to_lowercase();
        let Some(word) = head.strip_prefix(self.prefix.as_str()) else {
            return Command::Text;
        };

        if word == self.edit {
            Command::Edit(rest)
        } else if !rest.is_empty() {
            Command::Text
        } else if word == self.submit {
            Command::Submit
        } else if word == self.cancel {
            Command::Cancel
        } else {
            Command::Text
        }
    }
}

impl Default for CommandKeywords {
    fn default() -> Self {
        Self::from_config(&CommandsConfig::default())
    }
}

/// Parse a 1-based question number into a 0-based index below `count`.
pub fn parse_question_number(arg: &str, count: usize) -> Option<usize> {
    let number: usize = arg.trim().parse().ok()?;
    (1..=count).contains(&number).then(|| number - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn prefixed() -> CommandKeywords {
        CommandKeywords::from_config(&CommandsConfig {
            prefix: "!".into(),
            ..CommandsConfig::default()
        })
    }

    #[test_case("submit", Command::Submit ; "submit")]
    #[test_case("SUBMIT", Command::Submit ; "submit upper")]
    #[test_case("  Cancel \n", Command::Cancel ; "cancel padded")]
    #[test_case("edit 2", Command::Edit("2") ; "edit with number")]
    #[test_case("EDIT   3 ", Command::Edit("3") ; "edit spacing")]
    #[test_case("edit", Command::Edit("") ; "edit without number")]
    #[test_case("edit two", Command::Edit("two") ; "edit with word")]
    #[test_case("submit now", Command::Text ; "submit with trailing text")]
    #[test_case("submitted", Command::Text ; "longer word")]
    #[test_case("it crashed", Command::Text ; "plain text")]
    #[test_case("", Command::Text ; "empty")]
    fn test_parse_default_keywords(input: &str, expected: Command<'_>) {
        assert_eq!(CommandKeywords::default().parse(input), expected);
    }

    #[test]
    fn test_prefix_required() {
        let keywords = prefixed();
        assert_eq!(keywords.parse("!submit"), Command::Submit);
        assert_eq!(keywords.parse("!Edit 1"), Command::Edit("1"));
        assert_eq!(keywords.parse("submit"), Command::Text);
        assert_eq!(keywords.parse("cancel"), Command::Text);
    }

    #[test_case("1", 3, Some(0) ; "first")]
    #[test_case("3", 3, Some(2) ; "last")]
    #[test_case(" 2 ", 3, Some(1) ; "padded")]
    #[test_case("0", 3, None ; "zero")]
    #[test_case("4", 3, None ; "past end")]
    #[test_case("-1", 3, None ; "negative")]
    #[test_case("two", 3, None ; "word")]
    #[test_case("", 3, None ; "missing")]
    fn test_parse_question_number(arg: &str, count: usize, expected: Option<usize>) {
        assert_eq!(parse_question_number(arg, count), expected);
    }
}
