use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{MediaRef, Movie, Pagination, Rating, Record, TvShow, WatchlistEntry};
use crate::repository::{MediaRepository, RatingRepository, UserRepository, WatchlistRepository};

const RATING_MIN: f64 = 0.0;
const RATING_MAX: f64 = 10.0;

/// Body of a watchlist add: `{ "itemId": "...", "itemType": "movie" | "tv" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub item_id: String,
    pub item_type: String,
}

impl ItemRequest {
    pub fn media_ref(&self) -> Result<MediaRef> {
        MediaRef::parse(&self.item_type, &self.item_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub item_id: String,
    pub item_type: String,
    pub rating: f64,
    #[serde(default)]
    pub review: Option<String>,
}

/// One page of an item's ratings with the aggregate over all of them.
#[derive(Debug, Clone)]
pub struct ItemRatings {
    pub ratings: Vec<Rating>,
    pub average: Option<f64>,
    pub count: u64,
}

/// Whether a rate call created a new rating or replaced the user's previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOutcome {
    Created,
    Updated,
}

pub struct LibraryService {
    users: Arc<dyn UserRepository>,
    movies: Arc<dyn MediaRepository<Movie>>,
    tv: Arc<dyn MediaRepository<TvShow>>,
    watchlist: Arc<dyn WatchlistRepository>,
    ratings: Arc<dyn RatingRepository>,
}

impl LibraryService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        movies: Arc<dyn MediaRepository<Movie>>,
        tv: Arc<dyn MediaRepository<TvShow>>,
        watchlist: Arc<dyn WatchlistRepository>,
        ratings: Arc<dyn RatingRepository>,
    ) -> Self {
        Self {
            users,
            movies,
            tv,
            watchlist,
            ratings,
        }
    }

    async fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        match self.users.get_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("user {user_id}"))),
        }
    }

    async fn ensure_item(&self, item: MediaRef) -> Result<()> {
        let exists = match item {
            MediaRef::Movie(id) => self.movies.get_by_id(id).await?.is_some(),
            MediaRef::Tv(id) => self.tv.get_by_id(id).await?.is_some(),
        };
        if exists {
            Ok(())
        } else {
            Err(Error::not_found(format!("{} {}", item.media_type(), item.id())))
        }
    }

    pub async fn add_to_watchlist(&self, user_id: Uuid, item: MediaRef) -> Result<WatchlistEntry> {
        self.ensure_user(user_id).await?;
        self.ensure_item(item).await?;
        if self.watchlist.contains(user_id, item).await? {
            return Err(Error::conflict(format!(
                "watchlist entry for {} {}",
                item.media_type(),
                item.id()
            )));
        }
        let entry = self
            .watchlist
            .add(WatchlistEntry {
                record: Record::default(),
                user_id,
                item,
            })
            .await?;
        info!("User {} added {} {} to watchlist", user_id, item.media_type(), item.id());
        Ok(entry)
    }

    pub async fn remove_from_watchlist(&self, user_id: Uuid, item: MediaRef) -> Result<()> {
        if self.watchlist.remove(user_id, item).await? {
            Ok(())
        } else {
            Err(Error::not_found(format!(
                "watchlist entry for {} {}",
                item.media_type(),
                item.id()
            )))
        }
    }

    pub async fn watchlist(&self, user_id: Uuid, page: Pagination) -> Result<(Vec<WatchlistEntry>, u64)> {
        self.ensure_user(user_id).await?;
        self.watchlist.list_by_user(user_id, page).await
    }

    /// Records `value` for the item, replacing the user's earlier rating if any.
    pub async fn rate(
        &self,
        user_id: Uuid,
        item: MediaRef,
        value: f64,
        review: Option<String>,
    ) -> Result<(Rating, RateOutcome)> {
        if !(RATING_MIN..=RATING_MAX).contains(&value) {
            return Err(Error::invalid_input(format!(
                "rating must be between {RATING_MIN} and {RATING_MAX}"
            )));
        }
        let review = review.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.ensure_user(user_id).await?;
        self.ensure_item(item).await?;

        if let Some(mut existing) = self.ratings.get_by_user_and_item(user_id, item).await? {
            existing.rating = value;
            existing.review = review;
            let updated = self.ratings.update(existing).await?;
            return Ok((updated, RateOutcome::Updated));
        }

        let created = self
            .ratings
            .create(Rating {
                record: Record::default(),
                user_id,
                item,
                rating: value,
                review,
            })
            .await?;
        Ok((created, RateOutcome::Created))
    }

    pub async fn ratings_by_user(&self, user_id: Uuid, page: Pagination) -> Result<(Vec<Rating>, u64)> {
        self.ensure_user(user_id).await?;
        self.ratings.list_by_user(user_id, page).await
    }

    pub async fn ratings_for_item(&self, item: MediaRef, page: Pagination) -> Result<ItemRatings> {
        self.ensure_item(item).await?;
        let (ratings, _) = self.ratings.list_by_item(item, page).await?;
        let (average, count) = self.ratings.average(item).await?;
        Ok(ItemRatings {
            ratings,
            average,
            count,
        })
    }

    pub async fn delete_rating(&self, id: Uuid) -> Result<()> {
        let rating = self
            .ratings
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("rating {id}")))?;
        if !self.ratings.delete(id).await? {
            return Err(Error::not_found(format!("rating {id}")));
        }
        info!(
            "User {} removed rating of {} {}",
            rating.user_id,
            rating.item.media_type(),
            rating.item.id()
        );
        Ok(())
    }
}
