use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{CatalogItem, Category, Genre, MediaType, Movie, RemotePage, TvShow};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// Read side of the metadata provider for one kind of catalog item.
#[async_trait]
pub trait MetadataProvider<M>: Send + Sync {
    /// `NotFound` when the provider has no such id.
    async fn fetch_item(&self, tmdb_id: i64) -> Result<M>;
    async fn search(&self, query: &str, page: u32) -> Result<RemotePage<M>>;
    async fn list_by_category(&self, category: Category, page: u32) -> Result<RemotePage<M>>;
    async fn list_by_genre(&self, genre_id: i64, page: u32) -> Result<RemotePage<M>>;
}

#[async_trait]
pub trait GenreProvider: Send + Sync {
    async fn list_genres(&self, media_type: MediaType) -> Result<Vec<Genre>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let user_agent = format!("cinevault/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::provider(None, format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}{path}?api_key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, params);
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), path, body = %body, "TMDB request failed");
            if status == StatusCode::NOT_FOUND {
                return Err(Error::not_found(format!("TMDB resource {path}")));
            }
            return Err(Error::provider(
                Some(status.as_u16()),
                format!("TMDB API error on {path}"),
            ));
        }
        let text = res.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::provider(Some(status.as_u16()), format!("invalid TMDB JSON for {path}: {e}")))
    }

    async fn get_page<M: TmdbMapped>(&self, path: &str, params: &[(&str, String)]) -> Result<RemotePage<M>> {
        let raw: PageResponse = self.get_json(path, params).await?;
        let mut items = Vec::with_capacity(raw.results.len());
        for entry in raw.results {
            match serde_json::from_value::<M::Wire>(entry) {
                Ok(wire) => items.push(M::from_wire(wire)),
                Err(e) => debug!(path, "Skipping malformed TMDB list entry: {}", e),
            }
        }
        Ok(RemotePage {
            items,
            page: raw.page,
            total_pages: raw.total_pages,
            total_results: raw.total_results,
        })
    }
}

/// Wire-to-entity mapping for the provider's movie and TV payloads.
pub trait TmdbMapped: CatalogItem {
    type Wire: DeserializeOwned + Send;

    fn from_wire(wire: Self::Wire) -> Self;
}

#[async_trait]
impl<M: TmdbMapped> MetadataProvider<M> for TmdbClient {
    async fn fetch_item(&self, tmdb_id: i64) -> Result<M> {
        let path = format!("/{}/{tmdb_id}", M::MEDIA_TYPE.as_str());
        let wire: M::Wire = self.get_json(&path, &[]).await?;
        Ok(M::from_wire(wire))
    }

    async fn search(&self, query: &str, page: u32) -> Result<RemotePage<M>> {
        let path = format!("/search/{}", M::MEDIA_TYPE.as_str());
        self.get_page(
            &path,
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn list_by_category(&self, category: Category, page: u32) -> Result<RemotePage<M>> {
        let path = format!("/{}/{}", M::MEDIA_TYPE.as_str(), category.path_segment());
        self.get_page(&path, &[("page", page.to_string())]).await
    }

    async fn list_by_genre(&self, genre_id: i64, page: u32) -> Result<RemotePage<M>> {
        let path = format!("/discover/{}", M::MEDIA_TYPE.as_str());
        self.get_page(
            &path,
            &[("with_genres", genre_id.to_string()), ("page", page.to_string())],
        )
        .await
    }
}

#[async_trait]
impl GenreProvider for TmdbClient {
    async fn list_genres(&self, media_type: MediaType) -> Result<Vec<Genre>> {
        let path = format!("/genre/{}/list", media_type.as_str());
        let data: GenresResponse = self.get_json(&path, &[]).await?;
        Ok(data
            .genres
            .into_iter()
            .map(|g| Genre {
                id: g.id,
                name: g.name.unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u64,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct GenresResponse {
    #[serde(default)]
    genres: Vec<WireGenre>,
}

#[derive(Debug, Deserialize)]
pub struct WireGenre {
    id: i64,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MovieWire {
    id: i64,
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    runtime: Option<i64>,
    vote_average: Option<f64>,
    vote_count: Option<i64>,
    #[serde(default)]
    adult: bool,
    budget: Option<i64>,
    revenue: Option<i64>,
    status: Option<String>,
    tagline: Option<String>,
    genres: Option<Vec<WireGenre>>,
    genre_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct TvShowWire {
    id: i64,
    name: String,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    first_air_date: Option<String>,
    last_air_date: Option<String>,
    number_of_seasons: Option<i64>,
    number_of_episodes: Option<i64>,
    vote_average: Option<f64>,
    vote_count: Option<i64>,
    status: Option<String>,
    #[serde(rename = "type")]
    show_type: Option<String>,
    genres: Option<Vec<WireGenre>>,
    genre_ids: Option<Vec<i64>>,
}

impl TmdbMapped for Movie {
    type Wire = MovieWire;

    fn from_wire(w: MovieWire) -> Self {
        Movie {
            record: Default::default(),
            tmdb_id: w.id,
            title: w.title,
            overview: w.overview.unwrap_or_default(),
            poster_path: w.poster_path.unwrap_or_default(),
            backdrop_path: w.backdrop_path.unwrap_or_default(),
            release_date: w.release_date.unwrap_or_default(),
            runtime: w.runtime.unwrap_or_default(),
            vote_average: w.vote_average.unwrap_or_default(),
            vote_count: w.vote_count.unwrap_or_default(),
            genres: genres(w.genres, w.genre_ids, MediaType::Movie),
            adult: w.adult,
            budget: w.budget.unwrap_or_default(),
            revenue: w.revenue.unwrap_or_default(),
            status: w.status.unwrap_or_default(),
            tagline: w.tagline.unwrap_or_default(),
        }
    }
}

impl TmdbMapped for TvShow {
    type Wire = TvShowWire;

    fn from_wire(w: TvShowWire) -> Self {
        TvShow {
            record: Default::default(),
            tmdb_id: w.id,
            name: w.name,
            overview: w.overview.unwrap_or_default(),
            poster_path: w.poster_path.unwrap_or_default(),
            backdrop_path: w.backdrop_path.unwrap_or_default(),
            first_air_date: w.first_air_date.unwrap_or_default(),
            last_air_date: w.last_air_date.unwrap_or_default(),
            number_of_seasons: w.number_of_seasons.unwrap_or_default(),
            number_of_episodes: w.number_of_episodes.unwrap_or_default(),
            vote_average: w.vote_average.unwrap_or_default(),
            vote_count: w.vote_count.unwrap_or_default(),
            genres: genres(w.genres, w.genre_ids, MediaType::Tv),
            status: w.status.unwrap_or_default(),
            show_type: w.show_type.unwrap_or_default(),
        }
    }
}

/// Detail payloads carry full genre objects; list payloads only carry ids,
/// whose names come from the provider's fixed genre table.
fn genres(full: Option<Vec<WireGenre>>, ids: Option<Vec<i64>>, media: MediaType) -> Vec<Genre> {
    let pairs: Vec<(i64, String)> = match full {
        Some(list) if !list.is_empty() => list
            .into_iter()
            .map(|g| {
                let name = g
                    .name
                    .unwrap_or_else(|| genre_name(g.id, media).unwrap_or_default().to_string());
                (g.id, name)
            })
            .collect(),
        _ => ids
            .unwrap_or_default()
            .into_iter()
            .map(|id| (id, genre_name(id, media).unwrap_or_default().to_string()))
            .collect(),
    };
    let mut seen = HashSet::new();
    pairs
        .into_iter()
        .filter(|(id, _)| seen.insert(*id))
        .map(|(id, name)| Genre { id, name })
        .collect()
}

fn genre_name(id: i64, media: MediaType) -> Option<&'static str> {
    let name = match (media, id) {
        (_, 16) => "Animation",
        (_, 35) => "Comedy",
        (_, 80) => "Crime",
        (_, 99) => "Documentary",
        (_, 18) => "Drama",
        (_, 10751) => "Family",
        (_, 9648) => "Mystery",
        (_, 37) => "Western",
        (MediaType::Movie, 28) => "Action",
        (MediaType::Movie, 12) => "Adventure",
        (MediaType::Movie, 14) => "Fantasy",
        (MediaType::Movie, 36) => "History",
        (MediaType::Movie, 27) => "Horror",
        (MediaType::Movie, 10402) => "Music",
        (MediaType::Movie, 10749) => "Romance",
        (MediaType::Movie, 878) => "Science Fiction",
        (MediaType::Movie, 10770) => "TV Movie",
        (MediaType::Movie, 53) => "Thriller",
        (MediaType::Movie, 10752) => "War",
        (MediaType::Tv, 10759) => "Action & Adventure",
        (MediaType::Tv, 10762) => "Kids",
        (MediaType::Tv, 10763) => "News",
        (MediaType::Tv, 10764) => "Reality",
        (MediaType::Tv, 10765) => "Sci-Fi & Fantasy",
        (MediaType::Tv, 10766) => "Soap",
        (MediaType::Tv, 10767) => "Talk",
        (MediaType::Tv, 10768) => "War & Politics",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_movie_detail_with_nulls() {
        let wire: MovieWire = serde_json::from_value(json!({
            "id": 27205,
            "title": "Inception",
            "overview": "Dreams within dreams",
            "poster_path": null,
            "release_date": "2010-07-15",
            "runtime": 148,
            "vote_average": 8.4,
            "vote_count": 35000,
            "budget": 160000000,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}, {"id": 28, "name": "Action"}]
        }))
        .unwrap();
        let movie = Movie::from_wire(wire);
        assert_eq!(movie.tmdb_id, 27205);
        assert_eq!(movie.poster_path, "");
        assert_eq!(movie.runtime, 148);
        assert_eq!(movie.revenue, 0);
        assert!(movie.record.id.is_none());
        let ids: Vec<_> = movie.genres.iter().map(|g| g.id).collect();
        assert_eq!(ids, [28, 878]);
    }

    #[test]
    fn list_entries_resolve_genre_names_from_ids() {
        let wire: TvShowWire = serde_json::from_value(json!({
            "id": 1399,
            "name": "Game of Thrones",
            "genre_ids": [10765, 18, 424242]
        }))
        .unwrap();
        let show = TvShow::from_wire(wire);
        let names: Vec<_> = show.genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Sci-Fi & Fantasy", "Drama", ""]);
    }

    #[test]
    fn url_encodes_parameters() {
        let client = TmdbClient::new("http://localhost/3/", "k", Duration::from_secs(1)).unwrap();
        let url = client.url("/search/movie", &[("query", "star wars & co".into())]);
        assert_eq!(
            url,
            "http://localhost/3/search/movie?api_key=k&query=star%20wars%20%26%20co"
        );
    }
}
