use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{CatalogItem, Category, Pagination, RemotePage};
use crate::repository::MediaRepository;
use crate::tmdb::MetadataProvider;

/// Read-through access to one kind of catalog item: the local store first,
/// the metadata provider on a miss, with provider results written back.
pub struct CatalogService<M: CatalogItem> {
    repo: Arc<dyn MediaRepository<M>>,
    remote: Arc<dyn MetadataProvider<M>>,
}

impl<M: CatalogItem> CatalogService<M> {
    pub fn new(repo: Arc<dyn MediaRepository<M>>, remote: Arc<dyn MetadataProvider<M>>) -> Self {
        Self { repo, remote }
    }

    pub async fn get_by_tmdb_id(&self, tmdb_id: i64) -> Result<M> {
        if let Some(stored) = self.repo.get_by_tmdb_id(tmdb_id).await? {
            debug!("{} {} served from store", M::MEDIA_TYPE, tmdb_id);
            return Ok(stored);
        }

        let fetched = match self.remote.fetch_item(tmdb_id).await {
            Ok(item) => item,
            Err(e) => {
                warn!("TMDB lookup for {} {} failed: {}", M::MEDIA_TYPE, tmdb_id, e);
                return Err(Error::not_found(format!("{} with TMDB id {tmdb_id}", M::MEDIA_TYPE)));
            }
        };

        match self.repo.create(fetched.clone()).await {
            Ok(created) => {
                info!("Cached {} '{}' (TMDB {})", M::MEDIA_TYPE, created.title(), tmdb_id);
                Ok(created)
            }
            Err(e) => {
                warn!("Failed to cache {} {}: {}", M::MEDIA_TYPE, tmdb_id, e);
                Ok(fetched)
            }
        }
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<RemotePage<M>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::invalid_input("search query must not be empty"));
        }
        let remote = self.remote.search(query, page).await?;
        Ok(self.persist_missing(remote).await)
    }

    pub async fn by_category(&self, category: Category, page: u32) -> Result<RemotePage<M>> {
        let remote = self.remote.list_by_category(category, page).await?;
        Ok(self.persist_missing(remote).await)
    }

    pub async fn by_genre(&self, genre_id: i64, page: u32) -> Result<RemotePage<M>> {
        let remote = self.remote.list_by_genre(genre_id, page).await?;
        Ok(self.persist_missing(remote).await)
    }

    /// Stores every item of the page that is not cached yet. Store failures
    /// are logged and never shrink the page.
    async fn persist_missing(&self, page: RemotePage<M>) -> RemotePage<M> {
        let RemotePage {
            items,
            page,
            total_pages,
            total_results,
        } = page;
        let mut out = Vec::with_capacity(items.len());
        let mut created = 0usize;

        for item in items {
            let tmdb_id = item.tmdb_id();
            match self.repo.get_by_tmdb_id(tmdb_id).await {
                Ok(Some(stored)) => {
                    let mut item = item;
                    *item.record_mut() = stored.record().clone();
                    out.push(item);
                }
                Ok(None) => match self.repo.create(item.clone()).await {
                    Ok(saved) => {
                        created += 1;
                        out.push(saved);
                    }
                    Err(e) => {
                        warn!("Failed to cache {} {}: {}", M::MEDIA_TYPE, tmdb_id, e);
                        out.push(item);
                    }
                },
                Err(e) => {
                    warn!("Store lookup for {} {} failed: {}", M::MEDIA_TYPE, tmdb_id, e);
                    out.push(item);
                }
            }
        }

        if created > 0 {
            debug!("Cached {} new {} item(s) from page {}", created, M::MEDIA_TYPE, page);
        }
        RemotePage {
            items: out,
            page,
            total_pages,
            total_results,
        }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<M> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("{} {id}", M::MEDIA_TYPE)))
    }

    /// Re-fetches a stored item from the provider and overwrites the stored copy.
    pub async fn refresh(&self, id: Uuid) -> Result<M> {
        let stored = self.get_by_id(id).await?;
        let mut fresh = self.remote.fetch_item(stored.tmdb_id()).await?;
        *fresh.record_mut() = stored.record().clone();
        let updated = self.repo.update(fresh).await?;
        info!("Refreshed {} '{}' from TMDB", M::MEDIA_TYPE, updated.title());
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if self.repo.delete(id).await? {
            info!("Deleted {} {}", M::MEDIA_TYPE, id);
            Ok(())
        } else {
            Err(Error::not_found(format!("{} {id}", M::MEDIA_TYPE)))
        }
    }

    pub async fn list(&self, page: Pagination) -> Result<(Vec<M>, u64)> {
        self.repo.list(page).await
    }

    pub async fn search_local(&self, query: &str, page: Pagination) -> Result<(Vec<M>, u64)> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::invalid_input("search query must not be empty"));
        }
        self.repo.search(query, page).await
    }

    pub async fn by_genre_local(&self, genre_id: i64, page: Pagination) -> Result<(Vec<M>, u64)> {
        self.repo.get_by_genre(genre_id, page).await
    }

    pub async fn popular_local(&self, page: Pagination) -> Result<(Vec<M>, u64)> {
        self.repo.get_popular(page).await
    }
}
