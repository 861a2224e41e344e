use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use download_portal_core::contract::{ObjectBody, ObjectReader};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const FALLBACK_FILENAME: &str = "download";

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub key: Option<String>,
}

/// `GET /api/download?key=...`
pub async fn download_handler(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let Some(key) = query.key.filter(|k| !k.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing key").into_response();
    };
    let Some(storage) = &state.storage else {
        warn!(key = %key, "Download requested but no storage is bound");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Storage not bound").into_response();
    };

    match storage.get(&key).await {
        Ok(Some(body)) => {
            info!(key = %key, size = ?body.size, "Serving download");
            attachment(&key, body)
        }
        Ok(None) => {
            debug!(key = %key, "Download key not found");
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
        Err(e) => {
            error!(key = %key, error = %e, "Download failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Last path segment of `key`, or `download` when that segment is empty.
pub fn attachment_filename(key: &str) -> &str {
    key.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(FALLBACK_FILENAME)
}

fn content_disposition(key: &str) -> HeaderValue {
    // Quotes and backslashes would break out of the quoted-string.
    let filename: String = attachment_filename(key)
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    HeaderValue::from_bytes(format!("attachment; filename=\"{filename}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"download\""))
}

fn attachment(key: &str, body: ObjectBody) -> Response {
    let content_type = body
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, content_type);
    if let Some(size) = body.size {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
    }
    headers.insert(CONTENT_DISPOSITION, content_disposition(key));

    (StatusCode::OK, headers, Body::from_stream(body.stream)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_segment() {
        assert_eq!(attachment_filename("macos/arm64/App-1.2.dmg"), "App-1.2.dmg");
        assert_eq!(attachment_filename("README.pdf"), "README.pdf");
        assert_eq!(attachment_filename("macos/"), "download");
    }

    #[test]
    fn disposition_escapes_quotes() {
        let value = content_disposition("dir/we\"ird.zip");
        assert_eq!(value.to_str().unwrap(), "attachment; filename=\"we_ird.zip\"");
    }

    #[test]
    fn disposition_keeps_non_ascii_names() {
        let value = content_disposition("windows/安装包.exe");
        assert_eq!(
            value.as_bytes(),
            "attachment; filename=\"安装包.exe\"".as_bytes()
        );
    }
}
