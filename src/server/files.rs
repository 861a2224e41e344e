//! `GET /api/files`: plain listing, or a retention pass when `prune` is set.
//!
//! This endpoint never fails a well-formed request. Missing storage or a
//! listing error yields an empty, success-shaped body; individual delete
//! failures are reported inside the prune report.

use std::num::NonZeroUsize;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use download_portal_core::contract::{FileItem, ObjectLister};
use download_portal_core::prune::{prune, PruneReport, PruneRequest};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::AppState;

/// Raw query parameters. Values stay strings so that bad input is coerced
/// rather than rejected.
#[derive(Debug, Default, Deserialize)]
pub struct FilesQuery {
    pub prefix: Option<String>,
    pub retain: Option<String>,
    pub dry: Option<String>,
    pub prune: Option<String>,
}

/// `1`, `true`, `yes`, `on` (any case) are true; everything else is false.
pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Retain count; missing, unparsable or non-positive values become 1.
pub fn parse_retain(raw: Option<&str>) -> NonZeroUsize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .and_then(NonZeroUsize::new)
        .unwrap_or(NonZeroUsize::MIN)
}

pub async fn files_handler(
    State(state): State<AppState>,
    Query(query): Query<FilesQuery>,
) -> Response {
    let prefix = query.prefix.filter(|p| !p.is_empty());

    if !parse_flag(query.prune.as_deref()) {
        return Json(list_files(&state, prefix).await).into_response();
    }

    let request = PruneRequest {
        prefix,
        retain: parse_retain(query.retain.as_deref()),
        dry: parse_flag(query.dry.as_deref()),
    };

    let Some(storage) = &state.storage else {
        warn!("Prune requested but no storage is bound");
        return Json(PruneReport::empty(request.dry)).into_response();
    };

    match prune(storage.as_ref(), storage.as_ref(), &request).await {
        Ok(report) => {
            info!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                dry = report.dry,
                "Prune request completed"
            );
            Json(report).into_response()
        }
        Err(e) => {
            error!(error = %e, "Prune request failed, returning empty report");
            Json(PruneReport::empty(request.dry)).into_response()
        }
    }
}

async fn list_files(state: &AppState, prefix: Option<String>) -> Vec<FileItem> {
    let Some(storage) = &state.storage else {
        warn!("Listing requested but no storage is bound");
        return Vec::new();
    };

    match storage.list(prefix).await {
        Ok(objects) => {
            let now = Utc::now();
            info!(count = objects.len(), "Listed files");
            objects
                .iter()
                .map(|object| FileItem::from_object(object, now))
                .collect()
        }
        Err(e) => {
            error!(error = %e, "Listing failed, returning empty listing");
            Vec::new()
        }
    }
}
