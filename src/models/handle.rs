//! Social handle normalization.
//!
//! Handles reach the service as bare names, `@name`, or full profile URLs
//! depending on which ingestion path produced them. Every comparison goes
//! through [`normalize_handle`] on both sides.

const PROFILE_HOSTS: [&str; 2] = ["x.com/", "twitter.com/"];

/// Reduce any handle representation to a lowercase bare handle.
///
/// Strips scheme, `www.`, the x.com/twitter.com host, any query string,
/// a trailing slash and a leading `@`, repeating until nothing changes so
/// the result is a fixed point. Input that matches none of these passes
/// through lowercased.
pub fn normalize_handle(input: &str) -> String {
    let mut current = strip_once(input);
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(input: &str) -> String {
    let mut handle = input.trim();

    for scheme in ["https://", "http://"] {
        if handle.len() >= scheme.len()
            && handle.is_char_boundary(scheme.len())
            && handle[..scheme.len()].eq_ignore_ascii_case(scheme)
        {
            handle = &handle[scheme.len()..];
            break;
        }
    }

    let lower = handle.to_ascii_lowercase();
    let without_www = lower.strip_prefix("www.").unwrap_or(&lower);
    for host in PROFILE_HOSTS {
        if let Some(rest) = without_www.strip_prefix(host) {
            // ASCII lowercasing preserves byte offsets
            handle = &handle[handle.len() - rest.len()..];
            break;
        }
    }

    if let Some(idx) = handle.find('?') {
        handle = &handle[..idx];
    }
    let handle = handle.strip_suffix('/').unwrap_or(handle);
    let handle = handle.strip_prefix('@').unwrap_or(handle);

    handle.to_lowercase()
}

/// Prepare a user-typed search term: normalized handle rules, then trimmed.
pub fn normalize_search_term(input: &str) -> String {
    normalize_handle(input).trim().to_string()
}

/// Avatar image URL derived from a handle.
pub fn avatar_url(handle: &str) -> String {
    format!("https://unavatar.io/twitter/{}", normalize_handle(handle))
}
