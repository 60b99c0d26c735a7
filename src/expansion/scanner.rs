//! Byte-level helpers for walking SQL text while stepping over regions that cannot contain
//! placeholders.

/// If a quoted literal, quoted identifier, comment or dollar-quoted block opens at `idx`,
/// return the index just past its end. Unterminated regions run to the end of input.
pub(super) fn skip_opaque(bytes: &[u8], idx: usize) -> Option<usize> {
    match (bytes.get(idx)?, bytes.get(idx + 1)) {
        (b'\'', _) => Some(quoted_end(bytes, idx, b'\'')),
        (b'"', _) => Some(quoted_end(bytes, idx, b'"')),
        (b'-', Some(b'-')) => Some(line_end(bytes, idx + 2)),
        (b'/', Some(b'*')) => Some(block_comment_end(bytes, idx + 2)),
        (b'$', _) => dollar_quote_end(bytes, idx),
        _ => None,
    }
}

/// Doubled quote characters are escapes, not terminators.
fn quoted_end(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut idx = open + 1;
    while idx < bytes.len() {
        if bytes[idx] == quote {
            if bytes.get(idx + 1) != Some(&quote) {
                return idx + 1;
            }
            idx += 1;
        }
        idx += 1;
    }
    bytes.len()
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| from + offset + 1)
}

/// Block comments nest.
fn block_comment_end(bytes: &[u8], from: usize) -> usize {
    let mut depth = 1u32;
    let mut idx = from;
    while idx + 1 < bytes.len() {
        match (bytes[idx], bytes[idx + 1]) {
            (b'/', b'*') => {
                depth += 1;
                idx += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                idx += 2;
                if depth == 0 {
                    return idx;
                }
            }
            _ => idx += 1,
        }
    }
    bytes.len()
}

/// `$tag$ ... $tag$`, where the tag is empty or an identifier. `$1` is a placeholder, not a
/// quote.
fn dollar_quote_end(bytes: &[u8], open: usize) -> Option<usize> {
    let tag_len = bytes[open + 1..].iter().position(|&b| b == b'$')?;
    let delimiter = &bytes[open..open + tag_len + 2];
    let tag = &delimiter[1..=tag_len];
    let valid_tag = tag.first().is_none_or(|b| !b.is_ascii_digit())
        && tag.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_');
    if !valid_tag {
        return None;
    }

    let body = open + delimiter.len();
    Some(
        bytes[body..]
            .windows(delimiter.len())
            .position(|window| window == delimiter)
            .map_or(bytes.len(), |offset| body + offset + delimiter.len()),
    )
}

/// Scan a parameter name (`[A-Za-z_][A-Za-z0-9_]*`) starting at `start`.
pub(super) fn scan_name(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    scan_run(
        bytes,
        start,
        |b| b.is_ascii_alphabetic() || b == b'_',
        |b| b.is_ascii_alphanumeric() || b == b'_',
    )
}

/// Scan the digits of a numbered placeholder (`?3`) starting at `start`.
pub(super) fn scan_position(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    scan_run(bytes, start, |b| b.is_ascii_digit(), |b| b.is_ascii_digit())
}

fn scan_run(
    bytes: &[u8],
    start: usize,
    first: impl Fn(u8) -> bool,
    rest: impl Fn(u8) -> bool,
) -> Option<(usize, &str)> {
    if !first(*bytes.get(start)?) {
        return None;
    }
    let end = start + 1 + bytes[start + 1..].iter().take_while(|&&b| rest(b)).count();
    std::str::from_utf8(&bytes[start..end])
        .ok()
        .map(|token| (end, token))
}
