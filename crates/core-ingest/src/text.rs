//! Character-level helpers: whitespace collapsing and lenient entity decoding.

use quick_xml::escape::resolve_html5_entity;
use std::borrow::Cow;

/// Replace each run of ASCII whitespace with one space. NBSP is kept.
pub(crate) fn collapse_html_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for ch in s.chars() {
        if ch.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Whitespace / NBSP only.
pub(crate) fn is_placeholder(s: &str) -> bool {
    s.chars().all(|c| c.is_whitespace() || c == '\u{a0}')
}

/// Longest HTML5 entity name plus the leading `&`.
const MAX_REFERENCE_LEN: usize = 33;

fn resolve(name: &str) -> Option<Cow<'static, str>> {
    if let Some(num) = name.strip_prefix('#') {
        let (digits, radix) = match num.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16),
            None => (num, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        let code = u32::from_str_radix(digits, radix).ok()?;
        return char::from_u32(code).map(|ch| Cow::Owned(ch.to_string()));
    }
    resolve_html5_entity(name).map(Cow::Borrowed)
}

/// Decode numeric and HTML5 named references. Unknown or malformed references
/// are kept verbatim.
pub(crate) fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi > 1 && semi <= MAX_REFERENCE_LEN)
            .and_then(|semi| resolve(&tail[1..semi]).map(|s| (s, semi)));
        match decoded {
            Some((resolved, semi)) => {
                out.push_str(&resolved);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
