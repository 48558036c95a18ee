//! HTML output escaping for user-supplied text.

use std::borrow::Cow;

/// Escape `& < > " '` for use in HTML text and quoted attributes.
///
/// Borrows the input when nothing needs escaping.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    let needs_escape = |c: char| matches!(c, '&' | '<' | '>' | '"' | '\'');
    let Some(first) = input.find(needs_escape) else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(input.len() + 16);
    out.push_str(&input[..first]);
    for c in input[first..].chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
