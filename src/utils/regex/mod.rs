use regex::Regex;
use std::sync::LazyLock;

/// Compiled regex patterns that are reused across the codebase
pub struct RegexPatterns;

impl RegexPatterns {
    /// Regex for `@name` mention tokens (`@` followed by one or more word chars)
    pub fn mention() -> &'static Regex {
        static RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"@(\w+)").expect("Failed to compile mention regex"));
        &RE
    }
}
