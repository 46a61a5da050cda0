use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Header carried by every stored document. Empty until the store creates the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Anything that can live in a document collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn record(&self) -> &Record;
    fn record_mut(&mut self) -> &mut Record;

    fn id(&self) -> Option<Uuid> {
        self.record().id
    }
}

macro_rules! impl_document {
    ($($ty:ty),+ $(,)?) => {
        $(impl Document for $ty {
            fn record(&self) -> &Record {
                &self.record
            }
            fn record_mut(&mut self) -> &mut Record {
                &mut self.record
            }
        })+
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[serde(flatten)]
    pub record: Record,
    pub tmdb_id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: String,
    #[serde(default)]
    pub backdrop_path: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub runtime: i64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub budget: i64,
    #[serde(default)]
    pub revenue: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tagline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TvShow {
    #[serde(flatten)]
    pub record: Record,
    pub tmdb_id: i64,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: String,
    #[serde(default)]
    pub backdrop_path: String,
    #[serde(default)]
    pub first_air_date: String,
    #[serde(default)]
    pub last_air_date: String,
    #[serde(default)]
    pub number_of_seasons: i64,
    #[serde(default)]
    pub number_of_episodes: i64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: i64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub show_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub record: Record,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    pub is_active: bool,
}

/// A user's saved item. `record.created_at` is the time it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    #[serde(flatten)]
    pub record: Record,
    pub user_id: Uuid,
    pub item: MediaRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    #[serde(flatten)]
    pub record: Record,
    pub user_id: Uuid,
    pub item: MediaRef,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

impl_document!(Movie, TvShow, User, WatchlistEntry, Rating);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(Error::invalid_input(format!(
                "media type must be 'movie' or 'tv', got '{other}'"
            ))),
        }
    }
}

/// Reference from a watchlist entry or rating to exactly one stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum MediaRef {
    Movie(Uuid),
    Tv(Uuid),
}

impl MediaRef {
    /// Builds a reference from the raw `itemType` / `itemId` pair sent by clients.
    pub fn parse(item_type: &str, item_id: &str) -> Result<Self, Error> {
        let media_type: MediaType = item_type.parse()?;
        let id = Uuid::parse_str(item_id.trim())
            .map_err(|_| Error::not_found(format!("{media_type} '{item_id}'")))?;
        Ok(Self::new(media_type, id))
    }

    pub fn new(media_type: MediaType, id: Uuid) -> Self {
        match media_type {
            MediaType::Movie => MediaRef::Movie(id),
            MediaType::Tv => MediaRef::Tv(id),
        }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            MediaRef::Movie(_) => MediaType::Movie,
            MediaRef::Tv(_) => MediaType::Tv,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            MediaRef::Movie(id) | MediaRef::Tv(id) => *id,
        }
    }
}

/// Movies and TV shows: provider-backed entities that go through the read-through cache.
pub trait CatalogItem: Document {
    const MEDIA_TYPE: MediaType;
    /// JSON path of the display title inside a stored document.
    const TITLE_PATH: &'static str;

    fn tmdb_id(&self) -> i64;
    fn title(&self) -> &str;
}

impl CatalogItem for Movie {
    const MEDIA_TYPE: MediaType = MediaType::Movie;
    const TITLE_PATH: &'static str = "$.title";

    fn tmdb_id(&self) -> i64 {
        self.tmdb_id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl CatalogItem for TvShow {
    const MEDIA_TYPE: MediaType = MediaType::Tv;
    const TITLE_PATH: &'static str = "$.name";

    fn tmdb_id(&self) -> i64 {
        self.tmdb_id
    }

    fn title(&self) -> &str {
        &self.name
    }
}

/// One page of provider results.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
}

/// Provider list endpoints that are not keyed by a query or genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Popular,
    TopRated,
}

impl Category {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::TopRated => "top_rated",
        }
    }
}

/// Effective limit/offset for store listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Parses raw query values. Anything outside `[1, 100]` for the limit, or a
    /// negative offset, falls back to the defaults rather than failing.
    pub fn from_raw(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| (1..=Self::MAX_LIMIT as i64).contains(v))
            .map(|v| v as u32)
            .unwrap_or(Self::DEFAULT_LIMIT);
        let offset = offset
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .map(|v| v.min(u32::MAX as i64) as u32)
            .unwrap_or(0);
        Self { limit, offset }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// Provider page number; values below 1 or unparsable input become 1.
pub fn normalize_page(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .map(|v| v.min(u32::MAX as i64) as u32)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pagination_defaults_out_of_range_values() {
        for raw in ["0", "101", "-5", "abc", "", "9999999999999999999999"] {
            assert_eq!(Pagination::from_raw(Some(raw), None).limit, 10, "{raw}");
        }
        assert_eq!(Pagination::from_raw(None, None), Pagination::default());
        assert_eq!(Pagination::from_raw(Some("1"), None).limit, 1);
        assert_eq!(Pagination::from_raw(Some("100"), None).limit, 100);
        assert_eq!(Pagination::from_raw(Some(" 25 "), None).limit, 25);
    }

    #[test]
    fn pagination_offset_falls_back_to_zero() {
        assert_eq!(Pagination::from_raw(None, Some("-1")).offset, 0);
        assert_eq!(Pagination::from_raw(None, Some("x")).offset, 0);
        assert_eq!(Pagination::from_raw(None, Some("40")).offset, 40);
    }

    #[test]
    fn page_is_normalized_to_one() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some("0")), 1);
        assert_eq!(normalize_page(Some("-3")), 1);
        assert_eq!(normalize_page(Some("two")), 1);
        assert_eq!(normalize_page(Some("7")), 7);
    }

    #[test]
    fn media_ref_is_tagged_by_type() {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(MediaRef::Tv(id)).unwrap();
        assert_eq!(value, json!({ "type": "tv", "id": id.to_string() }));

        let parsed = MediaRef::parse("movie", &id.to_string()).unwrap();
        assert_eq!(parsed, MediaRef::Movie(id));
        assert!(matches!(
            MediaRef::parse("book", &id.to_string()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            MediaRef::parse("movie", "not-a-uuid"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn unsaved_movie_omits_record_fields() {
        let movie = Movie {
            tmdb_id: 27205,
            title: "Inception".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&movie).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["tmdbId"], 27205);

        let back: Movie = serde_json::from_value(value).unwrap();
        assert_eq!(back, movie);
    }
}
