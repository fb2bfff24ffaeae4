use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::list::Alignment;

/// Ellipsis appended to truncated cells (1 column wide).
const ELLIPSIS: char = '…';

/// Number of terminal columns `s` occupies.
///
/// CJK characters and most emoji count as 2 columns, combining marks as 0.
///
/// ```
/// use infinilist::util::display_width;
///
/// assert_eq!(display_width("Oslo"), 4);
/// assert_eq!(display_width("東京"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` so it fits in `max_width` columns, ending with `…` when anything
/// was dropped.
///
/// Returns `Cow::Borrowed` when the string already fits. A wide character is
/// never split; the result may then be one column narrower than requested.
///
/// ```
/// use infinilist::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Lisbon", 10), "Lisbon");
/// assert_eq!(truncate_to_width("Vienna Airport", 8), "Vienna …");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    let budget = max_width - 1;
    let mut used = 0;
    let mut cut = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        cut = idx + c.len_utf8();
    }

    let mut out = String::with_capacity(cut + ELLIPSIS.len_utf8());
    out.push_str(&s[..cut]);
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Pad `s` with spaces to exactly `width` columns.
///
/// Strings that are already wider are returned unchanged; use
/// [`fit_cell`] to truncate as well.
pub fn pad_to_width(s: &str, width: usize, align: Alignment) -> String {
    let gap = width.saturating_sub(display_width(s));
    let (left, right) = match align {
        Alignment::Left => (0, gap),
        Alignment::Right => (gap, 0),
        Alignment::Center => (gap / 2, gap - gap / 2),
    };

    let mut out = String::with_capacity(s.len() + gap);
    out.extend(std::iter::repeat(' ').take(left));
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(right));
    out
}

/// Sanitize, truncate and align `s` into a cell exactly `width` columns wide.
pub fn fit_cell(s: &str, width: usize, align: Alignment) -> String {
    let clean = sanitize_cell(s);
    let fitted = truncate_to_width(&clean, width);
    pad_to_width(&fitted, width, align)
}

/// Make record text safe to draw on one terminal line.
///
/// ANSI escape sequences and control characters are removed; tabs and line
/// breaks become single spaces. Clean input is returned borrowed.
pub fn sanitize_cell(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                // CSI: parameters until a final byte in @..~
                Some('[') => {
                    chars.next();
                    for next in chars.by_ref() {
                        if ('@'..='~').contains(&next) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(next) = chars.next() {
                        if next == '\x07' {
                            break;
                        }
                        if next == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            '\t' | '\n' | '\r' => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello W…");
        assert_eq!(truncate_to_width("Short", 10), "Short");
        assert_eq!(truncate_to_width("12345", 5), "12345");
    }

    #[test]
    fn test_truncate_returns_borrowed_when_fits() {
        assert!(matches!(truncate_to_width("Oslo", 4), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_never_splits_wide_chars() {
        // 4 columns of budget minus 1 for the ellipsis leaves 3; only one
        // 2-column character fits.
        assert_eq!(truncate_to_width("東京都庁", 4), "東…");
        assert!(display_width(&truncate_to_width("東京都庁", 4)) <= 4);
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 1), "…");
        assert_eq!(truncate_to_width("Test", 2), "T…");
    }

    #[test]
    fn test_pad_alignments() {
        assert_eq!(pad_to_width("ab", 6, Alignment::Left), "ab    ");
        assert_eq!(pad_to_width("ab", 6, Alignment::Right), "    ab");
        assert_eq!(pad_to_width("ab", 5, Alignment::Center), " ab  ");
        assert_eq!(pad_to_width("toolong", 3, Alignment::Left), "toolong");
    }

    #[test]
    fn test_fit_cell_exact_width() {
        for (input, width) in [("Gustav Fischer", 8), ("Ada", 8), ("東京", 3), ("", 4)] {
            let cell = fit_cell(input, width, Alignment::Right);
            assert_eq!(display_width(&cell), width, "cell {cell:?}");
        }
    }

    #[test]
    fn test_sanitize_clean_text_borrowed() {
        assert!(matches!(sanitize_cell("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitize_strips_escape_sequences() {
        assert_eq!(sanitize_cell("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(sanitize_cell("\x1b]0;title\x07safe"), "safe");
        assert_eq!(sanitize_cell("\x1b]0;title\x1b\\safe"), "safe");
        assert_eq!(sanitize_cell("nul\x00del\x7f"), "nuldel");
    }

    #[test]
    fn test_sanitize_flattens_line_breaks() {
        assert_eq!(sanitize_cell("two\r\nlines\tand tab"), "two lines and tab");
    }
}
