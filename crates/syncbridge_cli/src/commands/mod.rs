//! CLI command implementations.

pub mod assertion;
pub mod cache_key;
pub mod heartbeat;
pub mod ids;

/// Strips an optional `BrowserID ` scheme from a command-line assertion.
pub fn bare_assertion(input: &str) -> &str {
    let trimmed = input.trim();
    match trimmed.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("browserid") => rest.trim(),
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_optional() {
        assert_eq!(bare_assertion("BrowserID abc.def"), "abc.def");
        assert_eq!(bare_assertion("browserid  abc.def "), "abc.def");
        assert_eq!(bare_assertion("abc.def"), "abc.def");
    }
}
