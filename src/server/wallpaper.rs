use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use super::AppState;
use crate::wallpaper::{parse_count, WallpaperList};

#[derive(Debug, Default, Deserialize)]
pub struct WallpaperQuery {
    pub count: Option<String>,
    pub mkt: Option<String>,
}

/// `GET /api/bing?count=&mkt=`; always answers 200, possibly with no URLs.
pub async fn wallpaper_handler(
    State(state): State<AppState>,
    Query(query): Query<WallpaperQuery>,
) -> Json<WallpaperList> {
    let count = parse_count(query.count.as_deref());
    Json(state.wallpaper.fetch(count, query.mkt.as_deref()).await)
}
