//! Wire encoding of module paths and versions.
//!
//! Module paths are case-sensitive but many file systems and urls are not,
//! so on the wire every upper-case letter is written as `!` followed by
//! its lower-case form: `github.com/Azure` becomes `github.com/!azure`.

use crate::*;

/// Escape a module path or version for use in a url.
pub fn escape(s: &str) -> ProxyResult<String> {
    if s.is_empty() {
        return Err(ProxyError::bad_request("empty module path or version"));
    }
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '!' {
            return Err(ProxyError::bad_request(format!(
                "invalid character '!' in {s:?}"
            )));
        }
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Reverse [escape].
pub fn unescape(s: &str) -> ProxyResult<String> {
    if s.is_empty() {
        return Err(ProxyError::bad_request("empty module path or version"));
    }
    let mut out = String::with_capacity(s.len());
    let mut bang = false;
    for c in s.chars() {
        if bang {
            if !c.is_ascii_lowercase() {
                return Err(ProxyError::bad_request(format!(
                    "invalid escape sequence in {s:?}"
                )));
            }
            out.push(c.to_ascii_uppercase());
            bang = false;
            continue;
        }
        match c {
            '!' => bang = true,
            c if c.is_ascii_uppercase() => {
                return Err(ProxyError::bad_request(format!(
                    "unescaped upper-case character in {s:?}"
                )));
            }
            c => out.push(c),
        }
    }
    if bang {
        return Err(ProxyError::bad_request(format!(
            "trailing '!' in {s:?}"
        )));
    }
    Ok(out)
}
