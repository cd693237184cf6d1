//! Structural scanning helpers for untrusted script text
//!
//! The player script is minified and its incidental formatting changes
//! between versions. Rather than matching whole declarations with regular
//! expressions, the cipher core locates balanced-brace regions and splits
//! statement lists at the top nesting level, skipping over string literals.
//! All indices are byte offsets; every delimiter inspected is ASCII, so
//! slicing at them never lands inside a multi-byte character.

/// Returns the region of text spanned by the balanced `{...}` block starting
/// at `open`, including both braces. `open` must point at a `{` byte.
pub(crate) fn balanced_region(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=i]);
                }
            }
            b'"' | b'\'' => i = skip_string(bytes, i)?,
            _ => {}
        }
        i += 1;
    }
    None
}

/// Like [`balanced_region`] but exclusive of the braces.
pub(crate) fn balanced_block(text: &str, open: usize) -> Option<&str> {
    let region = balanced_region(text, open)?;
    Some(&region[1..region.len() - 1])
}

/// Advances past the string literal whose opening quote is at `start`,
/// returning the index of the closing quote.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 1;
        } else if bytes[i] == quote {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Splits `body` on `delim` at the top nesting level. Delimiters inside
/// parentheses, brackets, braces or string literals do not count.
pub(crate) fn split_top_level(body: &str, delim: u8) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'"' | b'\'' => {
                if let Some(end) = skip_string(bytes, i) {
                    i = end;
                }
            }
            b if b == delim && depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < body.len() {
        parts.push(&body[start..]);
    }
    parts
}

/// Length of the identifier prefix of `bytes` (`[A-Za-z0-9$_]*`).
pub(crate) fn ident_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'$' || **b == b'_')
        .count()
}

/// Index of the first non-whitespace byte at or after `i`.
pub(crate) fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_region_handles_nesting() {
        let text = "var x={a:{b:1},c:2};rest";
        assert_eq!(balanced_region(text, 6).unwrap(), "{a:{b:1},c:2}");
        assert_eq!(balanced_block(text, 6).unwrap(), "a:{b:1},c:2");
    }

    #[test]
    fn balanced_region_skips_braces_in_strings() {
        let text = r#"{a:"}}",b:'{'}"#;
        assert_eq!(balanced_block(text, 0).unwrap(), r#"a:"}}",b:'{'"#);
    }

    #[test]
    fn unterminated_block_is_none() {
        assert!(balanced_region("{a:{b:1}", 0).is_none());
        assert!(balanced_region("no brace", 0).is_none());
    }

    #[test]
    fn split_respects_nesting_and_strings() {
        let body = r#"a=a.split("");Xy.Ab(a,2);b="x;y";c(d;e)"#;
        let parts = split_top_level(body, b';');
        assert_eq!(
            parts,
            vec![r#"a=a.split("")"#, "Xy.Ab(a,2)", r#"b="x;y""#, "c(d;e)"]
        );
    }

    #[test]
    fn split_entries_on_commas() {
        let body = "Ab:function(a){a.reverse()},\nCd:function(a,b){return a.slice(b)}";
        let parts = split_top_level(body, b',');
        assert_eq!(parts.len(), 2);
        assert!(parts[1].trim().starts_with("Cd:"));
    }

    #[test]
    fn ident_and_ws_helpers() {
        assert_eq!(ident_len(b"Ab$_1("), 5);
        assert_eq!(ident_len(b"(a)"), 0);
        assert_eq!(skip_ws(b"  \n\tx", 0), 4);
    }
}
