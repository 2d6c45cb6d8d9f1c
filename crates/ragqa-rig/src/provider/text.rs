//! Prompt input normalisation.

/// Truncates `text` to at most `max_characters` characters, then trims it.
pub fn process_text(text: &str, max_characters: usize) -> String {
    let end = text
        .char_indices()
        .nth(max_characters)
        .map_or(text.len(), |(i, _)| i);

    text[..end].trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_text() {
        assert_eq!(process_text("  short  ", 500), "short");
        assert_eq!(process_text("abcdef", 3), "abc");
        assert_eq!(process_text("ab   cdef", 5), "ab");
        assert_eq!(process_text("ééé", 2), "éé");
        assert_eq!(process_text("", 10), "");
    }
}
