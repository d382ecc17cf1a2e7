//! Message splitting for Discord's length limit.
//!
//! Discord rejects messages longer than 2000 characters. Long text is split
//! at line breaks where possible, then at spaces, then anywhere on a
//! character boundary.

/// Maximum message length for Discord, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Split a message into chunks that fit Discord's character limit.
pub fn split_message(text: &str) -> Vec<String> {
    split_message_at(text, MAX_MESSAGE_LENGTH)
}

/// Split text into chunks of at most `max_chars` characters.
pub fn split_message_at(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();
        let separator = usize::from(!current.is_empty());

        if current_len + separator + line_len <= max_chars {
            if separator == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += separator + line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        let mut remaining = line;
        while remaining.chars().count() > max_chars {
            let split_point = find_split_point(remaining, max_chars);
            chunks.push(remaining[..split_point].to_string());
            remaining = &remaining[split_point..];
        }
        current = remaining.to_string();
        current_len = remaining.chars().count();
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Byte index to split at, preferring the last space within the limit.
fn find_split_point(text: &str, max_chars: usize) -> usize {
    let limit = text
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(i, _)| i);

    match text[..limit].rfind(' ') {
        Some(pos) => pos + 1,
        None => limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn split_short_message() {
        let chunks = split_message("Short message");
        assert_eq!(chunks, vec!["Short message".to_string()]);
    }

    #[test]
    fn split_prefers_line_breaks() {
        let line = "x".repeat(900);
        let text = format!("{line}\n{line}\n{line}");

        let chunks = split_message(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{line}\n{line}"));
        assert_eq!(chunks[1], line);
    }

    #[test]
    fn split_long_line_at_spaces() {
        let text = "word ".repeat(1000);
        let chunks = split_message(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= MAX_MESSAGE_LENGTH);
            assert!(!chunk.starts_with("ord"));
        }
    }

    #[test]
    fn split_multibyte_text_on_char_boundaries() {
        let text = "é".repeat(4500);
        let chunks = split_message(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.concat(), text);
    }

    proptest! {
        #[test]
        fn chunks_fit_and_keep_content(text in "[a-z \n]{0,300}", max in 5usize..60) {
            let chunks = split_message_at(&text, max);

            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= max);
            }

            let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            prop_assert_eq!(squash(&chunks.concat()), squash(&text));
        }
    }
}
