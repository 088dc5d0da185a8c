//! Naming schemes mapping Rust member names to wire-visible names.

use std::fmt::Debug;
use std::sync::Arc;

use heck::{ToLowerCamelCase, ToUpperCamelCase};

/// Maps a member name (after any serde rename) to the name used on the wire.
///
/// Names starting with `$` are reserved and never passed through a scheme.
pub trait NamingScheme: Debug + Send + Sync {
    fn member_name(&self, name: &str) -> String;
}

/// Leaves member names as serde reports them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNaming;

impl NamingScheme for DefaultNaming {
    fn member_name(&self, name: &str) -> String {
        name.to_string()
    }
}

/// `lowerCamelCase`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamelCase;

impl NamingScheme for CamelCase {
    fn member_name(&self, name: &str) -> String {
        name.to_lower_camel_case()
    }
}

/// `UpperCamelCase`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalCase;

impl NamingScheme for PascalCase {
    fn member_name(&self, name: &str) -> String {
        name.to_upper_camel_case()
    }
}

/// Lowercases the whole name, keeping word boundaries out.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCase;

impl NamingScheme for LowerCase {
    fn member_name(&self, name: &str) -> String {
        name.to_upper_camel_case().to_lowercase()
    }
}

/// The scheme used when none is configured.
pub fn default_scheme() -> Arc<dyn NamingScheme> {
    Arc::new(DefaultNaming)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemes() {
        assert_eq!(DefaultNaming.member_name("first_name"), "first_name");
        assert_eq!(CamelCase.member_name("first_name"), "firstName");
        assert_eq!(CamelCase.member_name("FirstName"), "firstName");
        assert_eq!(PascalCase.member_name("first_name"), "FirstName");
        assert_eq!(LowerCase.member_name("first_name"), "firstname");
        assert_eq!(LowerCase.member_name("FirstName"), "firstname");
    }
}
