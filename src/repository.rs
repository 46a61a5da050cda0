//! Persistence contracts used by the services.
//!
//! Lookups return `Ok(None)` for absent rows; an `Err` always means the store
//! itself failed. Each trait has one document-store implementation in
//! [`crate::store`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CatalogItem, MediaRef, Pagination, Rating, User, WatchlistEntry};

#[async_trait]
pub trait MediaRepository<M: CatalogItem>: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<M>>;
    async fn get_by_tmdb_id(&self, tmdb_id: i64) -> Result<Option<M>>;
    /// Assigns the internal id and both timestamps.
    async fn create(&self, item: M) -> Result<M>;
    /// Refreshes `updatedAt` only. Fails with `NotFound` for an unknown id.
    async fn update(&self, item: M) -> Result<M>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list(&self, page: Pagination) -> Result<(Vec<M>, u64)>;
    /// Case-insensitive substring match over title/name and overview.
    async fn search(&self, query: &str, page: Pagination) -> Result<(Vec<M>, u64)>;
    async fn get_by_genre(&self, genre_id: i64, page: Pagination) -> Result<(Vec<M>, u64)>;
    /// Vote average descending, ties broken by vote count descending.
    async fn get_popular(&self, page: Pagination) -> Result<(Vec<M>, u64)>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// Whether another user (other than `except`) already uses `email`.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool>;
    async fn create(&self, user: User) -> Result<User>;
    async fn update(&self, user: User) -> Result<User>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn list(&self, page: Pagination) -> Result<(Vec<User>, u64)>;
}

#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    async fn list_by_user(&self, user_id: Uuid, page: Pagination) -> Result<(Vec<WatchlistEntry>, u64)>;
    async fn add(&self, entry: WatchlistEntry) -> Result<WatchlistEntry>;
    async fn remove(&self, user_id: Uuid, item: MediaRef) -> Result<bool>;
    async fn contains(&self, user_id: Uuid, item: MediaRef) -> Result<bool>;
}

#[async_trait]
pub trait RatingRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Rating>>;
    async fn get_by_user_and_item(&self, user_id: Uuid, item: MediaRef) -> Result<Option<Rating>>;
    async fn list_by_item(&self, item: MediaRef, page: Pagination) -> Result<(Vec<Rating>, u64)>;
    async fn list_by_user(&self, user_id: Uuid, page: Pagination) -> Result<(Vec<Rating>, u64)>;
    async fn create(&self, rating: Rating) -> Result<Rating>;
    async fn update(&self, rating: Rating) -> Result<Rating>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    /// Mean rating and number of ratings for the item; the mean is `None` when unrated.
    async fn average(&self, item: MediaRef) -> Result<(Option<f64>, u64)>;
}
