//! Route table for `/api/v1`.

mod catalog;
mod users;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::api::{ApiResult, LocalPageBody};
use crate::app::AppState;
use crate::library::ItemRatings;
use crate::models::{Genre, MediaType, Movie, Pagination, Rating, TvShow};
use crate::store::Database;
use crate::tmdb::GenreProvider;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/genres/:media_type", get(genres))
        .merge(catalog::routes::<Movie>("/movies"))
        .merge(catalog::routes::<TvShow>("/tv"))
        .merge(users::routes())
}

async fn health(State(db): State<Database>) -> impl IntoResponse {
    let (status, label, database) = match db.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "connected"),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
        }
    };
    let body = json!({
        "status": label,
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    });
    (status, Json(body))
}

async fn genres(
    State(provider): State<Arc<dyn GenreProvider>>,
    Path(media_type): Path<String>,
) -> ApiResult<Json<Vec<Genre>>> {
    let media_type: MediaType = media_type.parse()?;
    Ok(Json(provider.list_genres(media_type).await?))
}

/// An item's ratings page plus the aggregate over all of its ratings.
#[derive(Debug, Serialize)]
pub(crate) struct ItemRatingsBody {
    #[serde(flatten)]
    page: LocalPageBody<Rating>,
    average: Option<f64>,
}

impl ItemRatingsBody {
    pub(crate) fn new(summary: ItemRatings, page: Pagination) -> Self {
        Self {
            page: LocalPageBody::new((summary.ratings, summary.count), page),
            average: summary.average,
        }
    }
}
