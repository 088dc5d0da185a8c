//! Escaping utilities for values spliced into SData addresses.
//!
//! ## Selectors
//!
//! Keys placed in a selector MUST be quoted with [`selector::format_constant`]
//! so that a quote inside the key cannot end the literal early:
//!
//! ```rust
//! use sdata_client::security::selector;
//!
//! // CORRECT
//! let sel = selector::format_constant("O'Brien");
//! assert_eq!(sel, "'O''Brien'");
//!
//! // WRONG - NEVER do this with user input
//! // let sel = format!("'{}'", key);
//! ```
//!
//! ## Path segments
//!
//! User-provided values placed in a path segment MUST be encoded:
//!
//! ```rust
//! use sdata_client::security::url;
//!
//! let segment = url::encode_segment("A/B");
//! assert_eq!(segment, "A%2FB");
//! ```

/// Selector literals and query property lists.
pub mod selector {
    /// Quote a string as an SData selector constant.
    ///
    /// The value is wrapped in single quotes and embedded single quotes are
    /// doubled, so `A'B` becomes `'A''B'`.
    #[must_use]
    pub fn format_constant(value: &str) -> String {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('\'');
        for ch in value.chars() {
            if ch == '\'' {
                quoted.push('\'');
            }
            quoted.push(ch);
        }
        quoted.push('\'');
        quoted
    }

    /// Validate a property path used in `include` or `select`.
    ///
    /// Paths are dot-separated identifiers, optionally `*`.
    ///
    /// ```rust
    /// use sdata_client::security::selector;
    ///
    /// assert!(selector::is_safe_property_path("Address.City"));
    /// assert!(selector::is_safe_property_path("*"));
    /// assert!(!selector::is_safe_property_path("Name&where=1"));
    /// ```
    #[must_use]
    pub fn is_safe_property_path(path: &str) -> bool {
        if path == "*" {
            return true;
        }
        !path.is_empty()
            && path.split('.').all(|part| {
                let mut chars = part.chars();
                matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
                    && chars.all(|c| c.is_alphanumeric() || c == '_')
            })
    }

    /// Join the safe entries of a property list with commas.
    ///
    /// Returns `None` if no safe entries remain.
    #[must_use]
    pub fn build_property_list<S: AsRef<str>>(paths: &[S]) -> Option<String> {
        let safe: Vec<&str> = paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| is_safe_property_path(p))
            .collect();
        if safe.is_empty() {
            None
        } else {
            Some(safe.join(","))
        }
    }
}

/// Address building.
pub mod url {
    /// Percent-encode a value for use as one path segment.
    #[must_use]
    pub fn encode_segment(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }

    /// Append a relative path to a base address with exactly one `/` between.
    #[must_use]
    pub fn join_path(base: &str, path: &str) -> String {
        let base = base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_constant() {
        assert_eq!(selector::format_constant("A1"), "'A1'");
        assert_eq!(selector::format_constant("A'B"), "'A''B'");
        assert_eq!(selector::format_constant("''"), "''''''");
        assert_eq!(selector::format_constant(""), "''");
    }

    #[test]
    fn test_property_lists() {
        assert_eq!(
            selector::build_property_list(&["Name", "Address.City", "bad name", "$key"]),
            Some("Name,Address.City,$key".to_string())
        );
        assert_eq!(selector::build_property_list(&["a,b"]), None);
        assert!(!selector::is_safe_property_path(""));
        assert!(!selector::is_safe_property_path("Address..City"));
        assert!(!selector::is_safe_property_path("1st"));
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(url::encode_segment("abc"), "abc");
        assert_eq!(url::encode_segment("001/../../secret"), "001%2F..%2F..%2Fsecret");
        assert_eq!(url::encode_segment("a b"), "a%20b");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(
            url::join_path("http://h/sdata/app/-/", "/accounts"),
            "http://h/sdata/app/-/accounts"
        );
        assert_eq!(url::join_path("http://h/sdata", "accounts"), "http://h/sdata/accounts");
        assert_eq!(url::join_path("http://h/sdata/", ""), "http://h/sdata");
    }
}
