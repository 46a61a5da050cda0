use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use std::sync::Arc;

use crate::accounts::{NewUser, UserService, UserUpdate};
use crate::api::{parse_uuid, ApiJson, ApiQuery, ApiResult, ListParams, LocalPageBody};
use crate::app::AppState;
use crate::library::{ItemRequest, LibraryService, RateOutcome, RateRequest};
use crate::models::{MediaRef, Rating, User, WatchlistEntry};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/watchlist", get(watchlist).post(add_to_watchlist))
        .route(
            "/users/:id/watchlist/:item_type/:item_id",
            delete(remove_from_watchlist),
        )
        .route("/users/:id/ratings", get(user_ratings).put(rate))
        .route("/ratings/:id", delete(delete_rating))
}

async fn list_users(
    State(users): State<Arc<UserService>>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<LocalPageBody<User>>> {
    let page = params.pagination();
    let found = users.list(page).await?;
    Ok(Json(LocalPageBody::new(found, page)))
}

async fn create_user(
    State(users): State<Arc<UserService>>,
    ApiJson(input): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = users.create(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(users): State<Arc<UserService>>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let id = parse_uuid(&id, "user")?;
    Ok(Json(users.get(id).await?))
}

async fn update_user(
    State(users): State<Arc<UserService>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    let id = parse_uuid(&id, "user")?;
    Ok(Json(users.update(id, patch).await?))
}

async fn delete_user(
    State(users): State<Arc<UserService>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_uuid(&id, "user")?;
    users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn watchlist(
    State(library): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<LocalPageBody<WatchlistEntry>>> {
    let user_id = parse_uuid(&id, "user")?;
    let page = params.pagination();
    let found = library.watchlist(user_id, page).await?;
    Ok(Json(LocalPageBody::new(found, page)))
}

async fn add_to_watchlist(
    State(library): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ItemRequest>,
) -> ApiResult<(StatusCode, Json<WatchlistEntry>)> {
    let user_id = parse_uuid(&id, "user")?;
    let entry = library.add_to_watchlist(user_id, body.media_ref()?).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn remove_from_watchlist(
    State(library): State<Arc<LibraryService>>,
    Path((id, item_type, item_id)): Path<(String, String, String)>,
) -> ApiResult<StatusCode> {
    let user_id = parse_uuid(&id, "user")?;
    let item = MediaRef::parse(&item_type, &item_id)?;
    library.remove_from_watchlist(user_id, item).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn user_ratings(
    State(library): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<Json<LocalPageBody<Rating>>> {
    let user_id = parse_uuid(&id, "user")?;
    let page = params.pagination();
    let found = library.ratings_by_user(user_id, page).await?;
    Ok(Json(LocalPageBody::new(found, page)))
}

async fn rate(
    State(library): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RateRequest>,
) -> ApiResult<(StatusCode, Json<Rating>)> {
    let user_id = parse_uuid(&id, "user")?;
    let item = MediaRef::parse(&body.item_type, &body.item_id)?;
    let (rating, outcome) = library.rate(user_id, item, body.rating, body.review).await?;
    let status = match outcome {
        RateOutcome::Created => StatusCode::CREATED,
        RateOutcome::Updated => StatusCode::OK,
    };
    Ok((status, Json(rating)))
}

async fn delete_rating(
    State(library): State<Arc<LibraryService>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_uuid(&id, "rating")?;
    library.delete_rating(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
