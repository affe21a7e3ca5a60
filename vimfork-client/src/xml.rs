//! Minimal XML helpers for the SOAP wire format.
//!
//! Responses are scanned for a handful of well-known tags rather than
//! parsed: the shapes we consume are flat and the tag names unambiguous,
//! which keeps the wire layer small.

/// Escape a value for embedding in element content or an attribute.
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode the five predefined entities. Unknown entities pass through
/// untouched.
#[must_use]
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let replaced = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match replaced {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Locate the next `<tag ...>` opening. Returns (start of `<`, offset just
/// past `>`, whether the element is self-closing).
fn find_open(xml: &str, tag: &str, from: usize) -> Option<(usize, usize, bool)> {
    let pat = format!("<{tag}");
    let mut at = from;
    while let Some(rel) = xml[at..].find(&pat) {
        let start = at + rel;
        let after = start + pat.len();
        match xml.as_bytes().get(after).copied() {
            Some(b'>') => return Some((start, after + 1, false)),
            Some(b' ' | b'\t' | b'\r' | b'\n' | b'/') => {
                let close = xml[after..].find('>')? + after;
                let self_closing = xml.as_bytes()[close.saturating_sub(1)] == b'/';
                return Some((start, close + 1, self_closing));
            }
            // A longer tag name sharing this prefix, e.g. <valid> vs <val>.
            _ => at = after,
        }
    }
    None
}

/// Content of the first `<tag ...>...</tag>` element, if present.
///
/// Self-closing elements yield `None`, the same as an absent element.
#[must_use]
pub fn tag_content<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let (_, body_start, self_closing) = find_open(xml, tag, 0)?;
    if self_closing {
        return None;
    }
    let close = format!("</{tag}>");
    let end = xml[body_start..].find(&close)? + body_start;
    Some(&xml[body_start..end])
}

/// Contents of every `<tag ...>...</tag>` element, in document order.
#[must_use]
pub fn tag_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let close = format!("</{tag}>");
    let mut out = Vec::new();
    let mut at = 0;
    while let Some((_, body_start, self_closing)) = find_open(xml, tag, at) {
        if self_closing {
            at = body_start;
            continue;
        }
        let Some(rel) = xml[body_start..].find(&close) else {
            break;
        };
        let end = body_start + rel;
        out.push(&xml[body_start..end]);
        at = end + close.len();
    }
    out
}
