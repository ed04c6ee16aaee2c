use unicode_normalization::UnicodeNormalization;

/// Canonicalize raw text to the reference form all offsets are computed against.
///
/// Applies Unicode NFKC, collapses runs of spaces/tabs (but not newlines) into
/// a single space, converts CRLF/CR to LF, and trims leading/trailing
/// whitespace. Newlines are kept so page boundaries stay meaningful. Pure and
/// idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let nfkc: String = text.nfkc().collect();
    let crlf_normalized = nfkc.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = collapse_spaces_and_tabs(&crlf_normalized);
    collapsed.trim().to_string()
}

fn collapse_spaces_and_tabs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_was_space_or_tab = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !prev_was_space_or_tab {
                out.push(' ');
            }
            prev_was_space_or_tab = true;
        } else {
            out.push(c);
            prev_was_space_or_tab = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent() {
        let text = "  Hello\t\t World  \r\n\r\nFoo  ";
        let once = normalize(text);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn collapses_spaces_and_tabs_but_not_newlines() {
        let normalized = normalize("a  b\t\tc\n\nd");
        assert_eq!(normalized, "a b c\n\nd");
    }

    #[test]
    fn normalizes_crlf_and_lone_cr() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn trims_leading_and_trailing_whitespace() {
        assert_eq!(normalize("  hello  "), "hello");
    }

    #[test]
    fn nfkc_folds_compatibility_forms() {
        // Fullwidth digit folds to ASCII under NFKC.
        assert_eq!(normalize("\u{FF11}"), "1");
    }
}
