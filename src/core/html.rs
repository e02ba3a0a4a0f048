// src/core/html.rs
//
// Tolerant, allocation-light HTML scanning for saved page snapshots.
// Case-insensitive tag matching, depth-aware element blocks, attribute
// lookup on opening tags. No DOM is built.

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// True when `b` ends a tag name (`<tr>`, `<tr class`, `<br/`).
fn is_name_boundary(b: Option<u8>) -> bool {
    matches!(b, None | Some(b'>') | Some(b'/') | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n'))
}

/// Byte offset of the next `<tag` opening (with a real name boundary) at or after `from`.
fn find_open(lc: &str, tag: &str, from: usize) -> Option<usize> {
    let pat = join!("<", tag);
    let mut pos = from;
    while let Some(rel) = lc.get(pos..)?.find(&pat) {
        let at = pos + rel;
        if is_name_boundary(lc.as_bytes().get(at + pat.len()).copied()) {
            return Some(at);
        }
        pos = at + pat.len();
    }
    None
}

/// Next `<tag …>…</tag>` element at or after `from`, as byte offsets
/// `(start, end)` covering the whole element. Nested elements of the same
/// tag are balanced. Tag names are given without brackets, lower case.
pub fn next_element_ci(s: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let lc = to_lower(s);
    next_element_in_lower(s, &lc, tag, from)
}

fn next_element_in_lower(s: &str, lc: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let start = find_open(lc, tag, from)?;
    let open_end = s[start..].find('>')? + start + 1;
    if s[..open_end].ends_with("/>") {
        return Some((start, open_end));
    }

    let close = join!("</", tag, ">");
    let mut depth = 1usize;
    let mut pos = open_end;
    loop {
        let next_close = lc.get(pos..)?.find(&close).map(|r| pos + r)?;
        match find_open(lc, tag, pos) {
            Some(o) if o < next_close => {
                depth += 1;
                pos = o + tag.len() + 1;
            }
            _ => {
                depth -= 1;
                pos = next_close + close.len();
                if depth == 0 {
                    return Some((start, pos));
                }
            }
        }
    }
}

/// All `<tag>` elements inside `s`, in document order, not descending into matches.
pub fn elements_ci<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lower(s);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some((a, b)) = next_element_in_lower(s, &lc, tag, pos) {
        out.push(&s[a..b]);
        pos = b;
    }
    out
}

/// First `<tag>` element inside `s`.
pub fn first_element_ci<'a>(s: &'a str, tag: &str) -> Option<&'a str> {
    next_element_ci(s, tag, 0).map(|(a, b)| &s[a..b])
}

/// Every opening `<tag …>` (void elements like `<input>` included).
pub fn open_tags_ci<'a>(s: &'a str, tag: &str) -> Vec<&'a str> {
    let lc = to_lower(s);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(start) = find_open(&lc, tag, pos) {
        let Some(end) = s[start..].find('>').map(|e| start + e + 1) else { break };
        out.push(&s[start..end]);
        pos = end;
    }
    out
}

/// Opening tag of an element block (`<td class="x">`).
pub fn open_tag(block: &str) -> &str {
    match block.find('>') {
        Some(e) => &block[..=e],
        None => block,
    }
}

/// Contents between the opening tag and the final closing tag.
pub fn inner_after_open_tag(block: &str) -> &str {
    if let Some(oe) = block.find('>') {
        if let Some(cs) = block.rfind('<') {
            if cs > oe {
                return &block[oe + 1..cs];
            }
        }
    }
    ""
}

/// Attribute value from an opening tag; quoted or bare. Name is case-insensitive.
pub fn attr_value(open: &str, name: &str) -> Option<String> {
    let lc = to_lower(open);
    let name = to_lower(name);
    let bytes = lc.as_bytes();
    let mut pos = 0usize;

    while let Some(rel) = lc[pos..].find(&name) {
        let at = pos + rel;
        pos = at + name.len();

        // must be preceded by whitespace and followed by '=' (spaces allowed)
        let before_ok = at > 0 && bytes[at - 1].is_ascii_whitespace();
        let rest = lc[pos..].trim_start();
        if !before_ok || !rest.starts_with('=') {
            continue;
        }
        let value_at = open.len() - rest.len() + 1;
        let raw = open[value_at..].trim_start();
        return Some(match raw.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let body = &raw[1..];
                body[..body.find(q).unwrap_or(body.len())].to_string()
            }
            _ => raw
                .split(|c: char| c.is_whitespace() || c == '>')
                .next()
                .unwrap_or("")
                .trim_end_matches('/')
                .to_string(),
        });
    }
    None
}

/// Boolean attribute present (`checked`, `checked="checked"`, `aria-checked="true"` is separate).
pub fn has_attr(open: &str, name: &str) -> bool {
    let lc = to_lower(open);
    let name = to_lower(name);
    let bytes = lc.as_bytes();
    let mut pos = 0usize;
    while let Some(rel) = lc[pos..].find(&name) {
        let at = pos + rel;
        let end = at + name.len();
        let before_ok = at > 0 && bytes[at - 1].is_ascii_whitespace();
        let after_ok = matches!(bytes.get(end), None | Some(b'=') | Some(b'>') | Some(b'/'))
            || bytes.get(end).is_some_and(|b| b.is_ascii_whitespace());
        if before_ok && after_ok {
            return true;
        }
        pos = end;
    }
    false
}

/// Whitespace-separated class names of an opening tag.
pub fn class_list(open: &str) -> Vec<String> {
    attr_value(open, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Visible text of a fragment: tags dropped, entities decoded, whitespace collapsed.
pub fn strip_tags<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();

    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                if in_tag { out.push(' '); }
                in_tag = false;
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    super::sanitize::normalize_ws(&super::sanitize::normalize_entities(&out))
}

/// Text of the first `<tag>` anywhere in `doc`.
pub fn text_of_first(doc: &str, tag: &str) -> Option<String> {
    first_element_ci(doc, tag)
        .map(|b| strip_tags(inner_after_open_tag(b)))
        .filter(|t| !t.is_empty())
}
