//! Text sanitation shared by the post and profile normalizers.

/// Strip NUL characters and their literal escaped spellings. Postgres text
/// columns reject NUL bytes, and vendor payloads occasionally carry both
/// the raw character and the escaped form as visible text.
pub fn sanitize_text(input: &str) -> String {
    input
        .replace('\u{0}', "")
        .replace("\\u0000", "")
        .replace("\\x00", "")
}

#[cfg(test)]
mod tests {
    use super::sanitize_text;

    #[test]
    fn strips_raw_nul_characters() {
        assert_eq!(sanitize_text("he\u{0}llo"), "hello");
    }

    #[test]
    fn strips_literal_escape_sequences() {
        assert_eq!(sanitize_text("a\\u0000b\\x00c"), "abc");
    }

    #[test]
    fn leaves_clean_text_alone() {
        assert_eq!(sanitize_text("launch day 🚀"), "launch day 🚀");
    }
}
