use async_trait::async_trait;
use uuid::Uuid;

use super::{Collection, Database, Filter, Order};
use crate::error::{Error, Result};
use crate::models::{CatalogItem, Pagination};
use crate::repository::MediaRepository;

const POPULARITY: &[(&str, Order)] = &[("$.voteAverage", Order::Desc), ("$.voteCount", Order::Desc)];

/// Movies or TV shows kept in one collection.
#[derive(Debug)]
pub struct MediaStore<M> {
    docs: Collection<M>,
}

impl<M: CatalogItem> MediaStore<M> {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            docs: db.collection(collection),
        }
    }
}

#[async_trait]
impl<M: CatalogItem> MediaRepository<M> for MediaStore<M> {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<M>> {
        self.docs.get(id).await
    }

    async fn get_by_tmdb_id(&self, tmdb_id: i64) -> Result<Option<M>> {
        self.docs.find_one(Filter::all().eq("$.tmdbId", tmdb_id)).await
    }

    async fn create(&self, item: M) -> Result<M> {
        self.docs.insert(item).await
    }

    async fn update(&self, item: M) -> Result<M> {
        let label = format!("{} {:?}", M::MEDIA_TYPE, item.id());
        self.docs
            .replace(item)
            .await?
            .ok_or_else(|| Error::not_found(label))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.docs.delete(id).await
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<M>, u64)> {
        self.docs.find_page(Filter::all(), &[], page).await
    }

    async fn search(&self, query: &str, page: Pagination) -> Result<(Vec<M>, u64)> {
        let filter = Filter::all().contains_text(&[M::TITLE_PATH, "$.overview"], query);
        self.docs.find_page(filter, &[], page).await
    }

    async fn get_by_genre(&self, genre_id: i64, page: Pagination) -> Result<(Vec<M>, u64)> {
        let filter = Filter::all().array_has("$.genres", "$.id", genre_id);
        self.docs.find_page(filter, &[], page).await
    }

    async fn get_popular(&self, page: Pagination) -> Result<(Vec<M>, u64)> {
        self.docs.find_page(Filter::all(), POPULARITY, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genre, Movie, TvShow};

    fn store() -> MediaStore<Movie> {
        let db = Database::in_memory().unwrap();
        MediaStore::new(&db, "movies")
    }

    fn movie(tmdb_id: i64, title: &str, overview: &str, genres: &[i64]) -> Movie {
        Movie {
            tmdb_id,
            title: title.into(),
            overview: overview.into(),
            genres: genres
                .iter()
                .map(|id| Genre {
                    id: *id,
                    name: String::new(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn lookup_by_tmdb_id_returns_none_when_absent() {
        let store = store();
        assert!(store.get_by_tmdb_id(12345).await.unwrap().is_none());

        store.create(movie(12345, "Inception", "", &[])).await.unwrap();
        let found = store.get_by_tmdb_id(12345).await.unwrap().unwrap();
        assert_eq!(found.title, "Inception");
    }

    #[tokio::test]
    async fn search_matches_title_or_overview_ignoring_case() {
        let store = store();
        store
            .create(movie(1, "The Matrix", "A hacker learns the truth", &[]))
            .await
            .unwrap();
        store
            .create(movie(2, "Hackers", "Teenagers and a virus", &[]))
            .await
            .unwrap();
        store
            .create(movie(3, "Amélie", "A shy waitress", &[]))
            .await
            .unwrap();

        let (hits, total) = store.search("HACK", Pagination::default()).await.unwrap();
        assert_eq!(total, 2);
        let ids: Vec<_> = hits.iter().map(|m| m.tmdb_id).collect();
        assert_eq!(ids, [1, 2]);

        let (page, total) = store
            .search("hack", Pagination { limit: 1, offset: 1 })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].tmdb_id, 2);
    }

    #[tokio::test]
    async fn genre_filter_counts_only_matches() {
        let store = store();
        store.create(movie(1, "A", "", &[28, 12])).await.unwrap();
        store.create(movie(2, "B", "", &[18])).await.unwrap();
        store.create(movie(3, "C", "", &[28])).await.unwrap();

        let (items, total) = store.get_by_genre(28, Pagination::default()).await.unwrap();
        assert_eq!(total, 2);
        assert!(items.iter().all(|m| m.genres.iter().any(|g| g.id == 28)));
    }

    #[tokio::test]
    async fn popular_orders_by_average_then_count() {
        let store = store();
        for (id, avg, count) in [(1, 7.0, 500), (2, 9.0, 10), (3, 9.0, 900), (4, 5.0, 2000)] {
            let mut m = movie(id, "x", "", &[]);
            m.vote_average = avg;
            m.vote_count = count;
            store.create(m).await.unwrap();
        }
        let (items, total) = store.get_popular(Pagination::default()).await.unwrap();
        assert_eq!(total, 4);
        let ids: Vec<_> = items.iter().map(|m| m.tmdb_id).collect();
        assert_eq!(ids, [3, 2, 1, 4]);
    }

    #[tokio::test]
    async fn update_unknown_item_is_not_found() {
        let store = store();
        let mut ghost = movie(9, "Ghost", "", &[]);
        ghost.record.id = Some(Uuid::new_v4());
        assert!(matches!(store.update(ghost).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn tv_search_uses_name() {
        let db = Database::in_memory().unwrap();
        let store: MediaStore<TvShow> = MediaStore::new(&db, "tv_shows");
        store
            .create(TvShow {
                tmdb_id: 1399,
                name: "Game of Thrones".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let (items, total) = store.search("thrones", Pagination::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].tmdb_id, 1399);
    }
}
