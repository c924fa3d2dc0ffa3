//! Per-word cleanup: strip illegal characters and fold case.

/// Strip every character that is not ASCII alphanumeric or a space, and
/// uppercase what remains.
///
/// Canonical text therefore never contains `*`, `_`, `<` or `>`, which is
/// what guarantees the wildcard tokens and path separators are reserved.
pub fn strip_illegal_characters(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(strip_illegal_characters("hello!"), "HELLO");
        assert_eq!(strip_illegal_characters("don't"), "DONT");
        assert_eq!(strip_illegal_characters("a.b.c"), "ABC");
    }

    #[test]
    fn test_uppercases() {
        assert_eq!(strip_illegal_characters("Hello"), "HELLO");
        assert_eq!(strip_illegal_characters("WORLD"), "WORLD");
    }

    #[test]
    fn test_strips_reserved_tokens() {
        assert_eq!(strip_illegal_characters("*"), "");
        assert_eq!(strip_illegal_characters("_"), "");
        assert_eq!(strip_illegal_characters("<that>"), "THAT");
    }

    #[test]
    fn test_digits_survive() {
        assert_eq!(strip_illegal_characters("42nd"), "42ND");
    }
}
