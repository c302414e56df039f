//! Masking and sanitization helpers for log output and completion variables
//!
//! All functions are pure: they take a string and return a new one, with no
//! coupling to the logging format. Lengths are counted in characters, so
//! truncation never splits a multi-byte character.

use url::Url;

/// Maximum length of a response body stored as a completion variable
pub const MAX_VARIABLE_BODY_LEN: usize = 2000;

/// Maximum length of a value written to the log or a failure report
pub const MAX_LOG_VALUE_LEN: usize = 500;

/// Mask an identifier, keeping the first and last three characters
pub fn mask_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "-".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }

    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}***{tail}")
}

/// Mask a phone number, keeping only its last four digits
pub fn mask_phone(value: &str) -> String {
    if value.trim().is_empty() {
        return "-".to_string();
    }

    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return "***".to_string();
    }

    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("***{tail}")
}

/// Reduce a URL to `scheme://host[:port]path` for logging
///
/// User info, query and fragment are dropped.
pub fn sanitize_url(raw_url: &str) -> String {
    if raw_url.trim().is_empty() {
        return "-".to_string();
    }

    match Url::parse(raw_url.trim()) {
        Ok(url) => {
            let mut out = format!("{}://", url.scheme());
            if let Some(host) = url.host_str() {
                out.push_str(host);
            }
            if let Some(port) = url.port() {
                out.push(':');
                out.push_str(&port.to_string());
            }
            out.push_str(url.path());
            out
        }
        Err(_) => "<invalid-url>".to_string(),
    }
}

/// Remove embedded credentials from a URL, leaving everything else intact
///
/// Input that does not parse as a URL is returned unchanged.
pub fn strip_user_info(raw_url: &str) -> String {
    if raw_url.trim().is_empty() {
        return raw_url.to_string();
    }

    match Url::parse(raw_url.trim()) {
        Ok(mut url) => {
            if url.set_username("").is_err() || url.set_password(None).is_err() {
                return raw_url.to_string();
            }
            url.to_string()
        }
        Err(_) => raw_url.to_string(),
    }
}

/// Collapse line breaks and tabs, trim, and cap the length for log output
pub fn truncate_for_log(value: &str) -> String {
    let mut collapsed = String::with_capacity(value.len());
    let mut in_break = false;

    for ch in value.chars() {
        if matches!(ch, '\r' | '\n' | '\t') {
            if !in_break {
                collapsed.push(' ');
                in_break = true;
            }
        } else {
            collapsed.push(ch);
            in_break = false;
        }
    }

    collapsed.trim().chars().take(MAX_LOG_VALUE_LEN).collect()
}

/// Strip control characters (except CR, LF and TAB) and cap the length
pub fn sanitize_body_for_variable(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_ascii_control() || matches!(c, '\r' | '\n' | '\t'))
        .take(MAX_VARIABLE_BODY_LEN)
        .collect()
}

/// Render an optional value for log output, using `-` for absent or blank
pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "-",
    }
}
