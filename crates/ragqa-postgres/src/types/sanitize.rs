/// Removes characters PostgreSQL text columns reject or that corrupt stored text.
///
/// NUL bytes are dropped, as is every other control character except
/// newline, carriage return and tab.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("a\0b"), "ab");
        assert_eq!(sanitize_text("line\nnext\r\n\tindent"), "line\nnext\r\n\tindent");
        assert_eq!(sanitize_text("bell\u{7}esc\u{1b}"), "bellesc");
        assert_eq!(sanitize_text("é ü ✓"), "é ü ✓");
    }
}
