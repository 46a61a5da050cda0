use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::api::{parse_numeric_id, parse_uuid, ApiQuery, ApiResult, ListParams, LocalPageBody, RemotePageBody};
use crate::app::AppState;
use crate::catalog::CatalogService;
use crate::library::LibraryService;
use crate::models::{CatalogItem, Category, MediaRef};
use crate::routes::ItemRatingsBody;

/// The full route set for one kind of catalog item, mounted under `base`
/// (`/movies` or `/tv`).
pub fn routes<M>(base: &str) -> Router<AppState>
where
    M: CatalogItem,
    Arc<CatalogService<M>>: FromRef<AppState>,
{
    Router::new()
        .route(base, get(list::<M>))
        .route(&format!("{base}/search"), get(search::<M>))
        .route(&format!("{base}/popular"), get(popular::<M>))
        .route(&format!("{base}/top-rated"), get(top_rated::<M>))
        .route(&format!("{base}/genre/:genre_id"), get(by_genre::<M>))
        .route(&format!("{base}/tmdb/:tmdb_id"), get(by_tmdb_id::<M>))
        .route(&format!("{base}/library/search"), get(search_local::<M>))
        .route(&format!("{base}/library/popular"), get(popular_local::<M>))
        .route(&format!("{base}/library/genre/:genre_id"), get(by_genre_local::<M>))
        .route(&format!("{base}/:id"), get(get_one::<M>).delete(delete_one::<M>))
        .route(&format!("{base}/:id/refresh"), post(refresh::<M>))
        .route(&format!("{base}/:id/ratings"), get(item_ratings::<M>))
}

async fn list<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<LocalPageBody<M>>> {
    let page = params.pagination();
    let found = svc.list(page).await?;
    Ok(Json(LocalPageBody::new(found, page)))
}

async fn search<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<RemotePageBody<M>>> {
    let page = svc.search(params.query(), params.page()).await?;
    Ok(Json(page.into()))
}

async fn popular<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<RemotePageBody<M>>> {
    let page = svc.by_category(Category::Popular, params.page()).await?;
    Ok(Json(page.into()))
}

async fn top_rated<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<RemotePageBody<M>>> {
    let page = svc.by_category(Category::TopRated, params.page()).await?;
    Ok(Json(page.into()))
}

async fn by_genre<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    Path(genre_id): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<RemotePageBody<M>>> {
    let genre_id = parse_numeric_id(&genre_id)?;
    let page = svc.by_genre(genre_id, params.page()).await?;
    Ok(Json(page.into()))
}

async fn by_tmdb_id<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    Path(tmdb_id): Path<String>,
) -> ApiResult<Json<M>> {
    let tmdb_id = parse_numeric_id(&tmdb_id)?;
    Ok(Json(svc.get_by_tmdb_id(tmdb_id).await?))
}

async fn search_local<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<LocalPageBody<M>>> {
    let page = params.pagination();
    let found = svc.search_local(params.query(), page).await?;
    Ok(Json(LocalPageBody::new(found, page)))
}

async fn popular_local<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<LocalPageBody<M>>> {
    let page = params.pagination();
    let found = svc.popular_local(page).await?;
    Ok(Json(LocalPageBody::new(found, page)))
}

async fn by_genre_local<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    Path(genre_id): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<LocalPageBody<M>>> {
    let genre_id = parse_numeric_id(&genre_id)?;
    let page = params.pagination();
    let found = svc.by_genre_local(genre_id, page).await?;
    Ok(Json(LocalPageBody::new(found, page)))
}

async fn get_one<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<M>> {
    let id = parse_uuid(&id, M::MEDIA_TYPE.as_str())?;
    Ok(Json(svc.get_by_id(id).await?))
}

async fn refresh<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    Path(id): Path<String>,
) -> ApiResult<Json<M>> {
    let id = parse_uuid(&id, M::MEDIA_TYPE.as_str())?;
    Ok(Json(svc.refresh(id).await?))
}

async fn delete_one<M: CatalogItem>(
    State(svc): State<Arc<CatalogService<M>>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_uuid(&id, M::MEDIA_TYPE.as_str())?;
    svc.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn item_ratings<M: CatalogItem>(
    State(library): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<ItemRatingsBody>> {
    let id = parse_uuid(&id, M::MEDIA_TYPE.as_str())?;
    let page = params.pagination();
    let summary = library
        .ratings_for_item(MediaRef::new(M::MEDIA_TYPE, id), page)
        .await?;
    Ok(Json(ItemRatingsBody::new(summary, page)))
}
