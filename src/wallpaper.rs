//! Background wallpapers for the portal page, from the Bing image archive.
//!
//! Purely decorative: every failure degrades to fewer (or zero) URLs, never
//! to an error.

use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::WallpaperConfig;

pub const DEFAULT_COUNT: i64 = 20;
pub const MAX_COUNT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    images: Vec<ArchiveImage>,
}

#[derive(Debug, Deserialize)]
struct ArchiveImage {
    #[serde(default)]
    url: Option<String>,
}

/// Body of `/api/bing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperList {
    pub urls: Vec<String>,
}

/// Requested image count from its leading integer (`"7abc"` is 7). No digits
/// or zero means the default; the result is clamped to `1..=MAX_COUNT`.
pub fn parse_count(raw: Option<&str>) -> usize {
    let requested = raw
        .and_then(leading_integer)
        .filter(|n| *n != 0)
        .unwrap_or(DEFAULT_COUNT);
    requested.clamp(1, MAX_COUNT) as usize
}

/// Optional sign followed by at least one digit, after leading whitespace.
/// Saturates instead of overflowing.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit);
    let mut value: i64 = 0;
    let mut seen = false;
    for digit in digits {
        seen = true;
        value = value.saturating_mul(10).saturating_add(i64::from(digit - b'0'));
    }
    seen.then_some(if negative { -value } else { value })
}

#[derive(Clone)]
pub struct WallpaperClient {
    http: Client,
    base_url: String,
    market: String,
}

impl WallpaperClient {
    pub fn new(config: &WallpaperConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            market: config.market.clone(),
        }
    }

    /// Fetch `count` archive entries concurrently, in archive order.
    pub async fn fetch(&self, count: usize, market: Option<&str>) -> WallpaperList {
        let market = market.filter(|m| !m.is_empty()).unwrap_or(self.market.as_str());
        info!(count, market = %market, "Fetching wallpaper archive");

        let requests = (0..count).map(|idx| self.fetch_one(idx, market));
        let urls: Vec<String> = join_all(requests).await.into_iter().flatten().collect();

        debug!(urls = urls.len(), "Wallpaper archive fetched");
        WallpaperList { urls }
    }

    async fn fetch_one(&self, idx: usize, market: &str) -> Vec<String> {
        let endpoint = format!("{}/HPImageArchive.aspx", self.base_url);
        let response = self
            .http
            .get(&endpoint)
            .query(&[
                ("format", "js".to_string()),
                ("idx", idx.to_string()),
                ("n", "1".to_string()),
                ("mkt", market.to_string()),
            ])
            .send()
            .await;

        let archive = match response {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<ArchiveResponse>().await.unwrap_or_default()
            }
            Ok(resp) => {
                debug!(idx, status = %resp.status(), "Wallpaper archive returned error");
                ArchiveResponse::default()
            }
            Err(e) => {
                debug!(idx, error = %e, "Wallpaper archive request failed");
                ArchiveResponse::default()
            }
        };

        archive
            .images
            .into_iter()
            .filter_map(|image| image.url)
            .map(|path| format!("{}{}", self.base_url, path))
            .collect()
    }
}
