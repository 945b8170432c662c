//! Fast URL helpers for the hot path
//!
//! These functions avoid allocations and work directly on string slices.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    // Find ':'
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    // Check for "://"
    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    // Data URLs use ":" not "://"
    if colon_pos >= 4 && bytes[..colon_pos].eq_ignore_ascii_case(b"data") {
        return Some(colon_pos + 1);
    }

    None
}

// =============================================================================
// Host
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
///
/// URLs without a scheme (`example.org/path`) are treated as starting with
/// the host.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url).unwrap_or(0);
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' || b == b'?' || b == b'#' {
            break;
        }
    }

    // Bracketed IPv6 literal
    if bytes.get(host_start) == Some(&b'[') {
        let close = url[host_start..].find(']')?;
        return Some((host_start, host_start + close + 1));
    }

    // Find host end
    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    if host_end == host_start {
        return None;
    }
    Some((host_start, host_end))
}

/// Fast host extraction without allocations.
/// Returns a slice into the original URL.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

// =============================================================================
// Path
// =============================================================================

/// Extract the path and query of a URL (everything after the host, up to
/// the fragment). Returns `/` when the URL has no path.
#[inline]
pub fn extract_relative_path(url: &str) -> &str {
    let host_end = match get_host_position(url) {
        Some((_, end)) => end,
        None => return "/",
    };

    let bytes = url.as_bytes();

    // Skip an explicit port
    let mut path_start = host_end;
    while path_start < bytes.len() && !matches!(bytes[path_start], b'/' | b'?' | b'#') {
        path_start += 1;
    }

    let path_end = url[path_start..]
        .find('#')
        .map_or(bytes.len(), |idx| path_start + idx);

    let relative = &url[path_start..path_end];
    if relative.is_empty() {
        "/"
    } else {
        relative
    }
}

/// Truncate `s` to at most `max` bytes on a char boundary.
pub fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
