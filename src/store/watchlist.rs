use async_trait::async_trait;
use uuid::Uuid;

use super::{Collection, Database, Filter};
use crate::error::Result;
use crate::models::{MediaRef, Pagination, WatchlistEntry};
use crate::repository::WatchlistRepository;

#[derive(Debug)]
pub struct WatchlistStore {
    docs: Collection<WatchlistEntry>,
}

impl WatchlistStore {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            docs: db.collection(collection),
        }
    }
}

pub(super) fn user_item_filter(user_id: Uuid, item: MediaRef) -> Filter {
    Filter::all()
        .eq("$.userId", user_id.to_string())
        .eq("$.item.type", item.media_type().as_str().to_string())
        .eq("$.item.id", item.id().to_string())
}

#[async_trait]
impl WatchlistRepository for WatchlistStore {
    async fn list_by_user(
        &self,
        user_id: Uuid,
        page: Pagination,
    ) -> Result<(Vec<WatchlistEntry>, u64)> {
        let filter = Filter::all().eq("$.userId", user_id.to_string());
        self.docs.find_page(filter, &[], page).await
    }

    async fn add(&self, entry: WatchlistEntry) -> Result<WatchlistEntry> {
        self.docs.insert(entry).await
    }

    async fn remove(&self, user_id: Uuid, item: MediaRef) -> Result<bool> {
        let Some(entry) = self.docs.find_one(user_item_filter(user_id, item)).await? else {
            return Ok(false);
        };
        match entry.record.id {
            Some(id) => self.docs.delete(id).await,
            None => Ok(false),
        }
    }

    async fn contains(&self, user_id: Uuid, item: MediaRef) -> Result<bool> {
        Ok(self.docs.count(user_item_filter(user_id, item)).await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    #[tokio::test]
    async fn entries_are_scoped_by_user_and_item_kind() {
        let db = Database::in_memory().unwrap();
        let store = WatchlistStore::new(&db, "watchlist");
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let item = Uuid::new_v4();

        store
            .add(WatchlistEntry {
                record: Record::default(),
                user_id: user,
                item: MediaRef::Movie(item),
            })
            .await
            .unwrap();

        assert!(store.contains(user, MediaRef::Movie(item)).await.unwrap());
        assert!(!store.contains(user, MediaRef::Tv(item)).await.unwrap());
        assert!(!store.contains(other, MediaRef::Movie(item)).await.unwrap());

        let (entries, total) = store.list_by_user(user, Pagination::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].item, MediaRef::Movie(item));

        assert!(store.remove(user, MediaRef::Movie(item)).await.unwrap());
        assert!(!store.remove(user, MediaRef::Movie(item)).await.unwrap());
    }
}
