//! Column formatting for the message log.

const ELLIPSIS: char = '…';

/// Fit `s` into `width` characters.
///
/// Longer strings are cut and end in `…`. Shorter strings are returned as is,
/// or right-padded with spaces when `pad` is set.
pub fn ellipsize(s: &str, width: usize, pad: bool) -> String {
    let len = s.chars().count();
    if len == width {
        return s.to_string();
    }
    if len < width {
        if pad {
            return format!("{s:<width$}");
        }
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut out: String = s.chars().take(width - 1).collect();
    out.push(ELLIPSIS);
    out
}

/// Collapse line breaks so a message body fits on one log line.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_long() {
        assert_eq!(ellipsize("hallo", 2, false), "h…");
    }

    #[test]
    fn test_too_short_with_pad() {
        assert_eq!(ellipsize("hallo", 10, true), "hallo     ");
    }

    #[test]
    fn test_too_short_without_pad() {
        assert_eq!(ellipsize("hallo", 10, false), "hallo");
    }

    #[test]
    fn test_exact() {
        assert_eq!(ellipsize("hallo", 5, false), "hallo");
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        assert_eq!(ellipsize("grüße", 5, false), "grüße");
        assert_eq!(ellipsize("grüße dich", 4, false), "grü…");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("one\ntwo\n\n  three"), "one two three");
    }
}
