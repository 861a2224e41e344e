//! Version tokens embedded in artifact file names.
//!
//! A version is the first `v1.2` / `V2.10.3` style token in a name: an
//! optional `v` followed by at least two dot-separated digit groups. A bare
//! integer (`App-5.dmg`) is deliberately not a version, so build numbers and
//! resolutions are never mistaken for one.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[vV]?([0-9]+(?:\.[0-9]+)+)").expect("version pattern is valid")
    })
}

/// Parsed version: non-negative integer components, most significant first.
///
/// Ordering pads the shorter side with zeros, so `1.2` and `1.2.0` are equal.
#[derive(Debug, Clone)]
pub struct Version(Vec<u64>);

impl Version {
    pub fn new(parts: Vec<u64>) -> Self {
        Version(parts)
    }

    pub fn parts(&self) -> &[u64] {
        &self.0
    }
}

impl From<Vec<u64>> for Version {
    fn from(parts: Vec<u64>) -> Self {
        Version(parts)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
            first = false;
        }
        Ok(())
    }
}

/// Compare two component sequences, padding the shorter with trailing zeros.
pub fn compare(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// Parse the first version token out of `name`.
///
/// Returns `None` when there is no token, or when a component does not fit in
/// a `u64` (such a name is treated as unversioned, never as a deletion candidate).
pub fn parse_version(name: &str) -> Option<Version> {
    let captures = version_pattern().captures(name)?;
    let token = captures.get(1)?.as_str();
    let parts = token
        .split('.')
        .map(|group| group.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;
    Some(Version(parts))
}
