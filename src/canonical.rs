use crate::error::Result;
use crate::token::{tokenize, Kind};

/// Folds SQL bytes into a canonical fingerprint (`spec.md` §4.5):
/// literals become `?`, runs of whitespace collapse to one space, and
/// two post-passes normalize route comments and lightly collapse
/// placeholder lists. The result is stable across literal values, route
/// hostnames, and inter-token whitespace (invariant 2, §8).
pub fn canonicalize(bytes: &[u8]) -> Result<String> {
    let tokens = tokenize(bytes)?;
    let mut out = String::with_capacity(bytes.len());
    let mut offset = 0;
    for (len, kind) in tokens {
        let slice = &bytes[offset..offset + len];
        match kind {
            Kind::Word | Kind::Other => out.push_str(&String::from_utf8_lossy(slice)),
            Kind::Number | Kind::Quote => out.push('?'),
            Kind::Whitespace => out.push(' '),
        }
        offset += len;
    }
    let out = normalize_route_comment(&out);
    let out = collapse_placeholders(&out);
    Ok(out)
}

/// If `verb /* host:route */ rest` (parts[1] == `/*`, parts[3] == `*/`,
/// and parts[2] contains `:`), strips everything before the first `:` of
/// parts[2], keeping `verb /* route */ rest` (`spec.md` §4.5 step 1).
fn normalize_route_comment(text: &str) -> String {
    let parts: Vec<&str> = text.splitn(5, ' ').collect();
    if parts.len() >= 4 && parts[1] == "/*" && parts[3] == "*/" && parts[2].contains(':') {
        let route = parts[2].splitn(2, ':').nth(1).unwrap_or(parts[2]);
        let mut rebuilt = format!("{} /* {} */", parts[0], route);
        if let Some(rest) = parts.get(4) {
            rebuilt.push(' ');
            rebuilt.push_str(rest);
        }
        rebuilt
    } else {
        text.to_string()
    }
}

/// Replaces every occurrence of the literal substring `"?, "` with the
/// empty string (`spec.md` §4.5 step 2). A light, known-incomplete
/// collapse of `IN (?, ?, ?)`-shaped lists.
fn collapse_placeholders(text: &str) -> String {
    text.replace("?, ", "")
}

/// Parses a raw `COM_QUERY` body as `verb /* host:route */ rest` and
/// returns the route portion after the colon, if the comment is present
/// (used by the Format Renderer's `#r` specifier, §4.6).
pub fn extract_route(text: &str) -> Option<String> {
    let parts: Vec<&str> = text.splitn(5, ' ').collect();
    if parts.len() >= 4 && parts[1] == "/*" && parts[3] == "*/" && parts[2].contains(':') {
        parts[2].splitn(2, ':').nth(1).map(ToString::to_string)
    } else {
        None
    }
}
