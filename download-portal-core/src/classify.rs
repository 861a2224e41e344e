//! Best-effort platform and CPU labels for download listings, plus human
//! readable sizes. File names are not a reliable source of truth, so every
//! classifier has an explicit "don't know" answer.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Target platform of a downloadable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Windows,
    Android,
    Unknown,
}

impl Platform {
    pub fn label(&self) -> &'static str {
        match self {
            Platform::MacOs => "macOS",
            Platform::Windows => "Windows",
            Platform::Android => "Android",
            Platform::Unknown => "Other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// CPU family of a macOS build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MacArch {
    AppleSilicon,
    Intel,
}

impl MacArch {
    pub fn label(&self) -> &'static str {
        match self {
            MacArch::AppleSilicon => "Apple M CPU",
            MacArch::Intel => "Intel CPU",
        }
    }
}

impl fmt::Display for MacArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify by directory name first (`macos/…`), then by extension.
pub fn categorize_platform(name_or_path: &str) -> Platform {
    let lowered = name_or_path.to_lowercase();

    for segment in lowered.split('/') {
        match segment {
            "macos" => return Platform::MacOs,
            "windows" => return Platform::Windows,
            "android" => return Platform::Android,
            _ => {}
        }
    }

    let extension = if lowered.ends_with(".tar.gz") {
        "tar.gz"
    } else {
        lowered.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
    };

    match extension {
        "dmg" | "pkg" | "app" | "tar.gz" => Platform::MacOs,
        "exe" | "msi" => Platform::Windows,
        "apk" | "aab" => Platform::Android,
        _ => Platform::Unknown,
    }
}

fn apple_silicon_hint() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"arm64|aarch64|apple|silicon|m1|m2|m3").expect("arch pattern is valid")
    })
}

fn intel_hint() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"x64|x86_64|amd64|intel").expect("arch pattern is valid"))
}

/// Guess the CPU family from hints in the name. Apple Silicon hints win when
/// both kinds appear.
pub fn mac_arch(name_or_path: &str) -> Option<MacArch> {
    let lowered = name_or_path.to_lowercase();
    if apple_silicon_hint().is_match(&lowered) {
        Some(MacArch::AppleSilicon)
    } else if intel_hint().is_match(&lowered) {
        Some(MacArch::Intel)
    } else {
        None
    }
}

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// `1536` → `"1.5 KB"`. Two decimals at most, trailing zeros dropped.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, SIZE_UNITS[unit])
}
