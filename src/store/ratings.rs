use async_trait::async_trait;
use uuid::Uuid;

use super::watchlist::user_item_filter;
use super::{Collection, Database, Filter};
use crate::error::{Error, Result};
use crate::models::{MediaRef, Pagination, Rating};
use crate::repository::RatingRepository;

#[derive(Debug)]
pub struct RatingStore {
    docs: Collection<Rating>,
}

impl RatingStore {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            docs: db.collection(collection),
        }
    }
}

fn item_filter(item: MediaRef) -> Filter {
    Filter::all()
        .eq("$.item.type", item.media_type().as_str().to_string())
        .eq("$.item.id", item.id().to_string())
}

#[async_trait]
impl RatingRepository for RatingStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Rating>> {
        self.docs.get(id).await
    }

    async fn get_by_user_and_item(&self, user_id: Uuid, item: MediaRef) -> Result<Option<Rating>> {
        self.docs.find_one(user_item_filter(user_id, item)).await
    }

    async fn list_by_item(&self, item: MediaRef, page: Pagination) -> Result<(Vec<Rating>, u64)> {
        self.docs.find_page(item_filter(item), &[], page).await
    }

    async fn list_by_user(&self, user_id: Uuid, page: Pagination) -> Result<(Vec<Rating>, u64)> {
        let filter = Filter::all().eq("$.userId", user_id.to_string());
        self.docs.find_page(filter, &[], page).await
    }

    async fn create(&self, rating: Rating) -> Result<Rating> {
        self.docs.insert(rating).await
    }

    async fn update(&self, rating: Rating) -> Result<Rating> {
        let label = format!("rating {:?}", rating.record.id);
        self.docs
            .replace(rating)
            .await?
            .ok_or_else(|| Error::not_found(label))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.docs.delete(id).await
    }

    async fn average(&self, item: MediaRef) -> Result<(Option<f64>, u64)> {
        self.docs.average("$.rating", item_filter(item)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn rating(user_id: Uuid, item: MediaRef, value: f64) -> Rating {
        Rating {
            record: Record::default(),
            user_id,
            item,
            rating: value,
            review: None,
        }
    }

    #[tokio::test]
    async fn average_is_per_item() {
        let db = Database::in_memory().unwrap();
        let store = RatingStore::new(&db, "ratings");
        let movie = MediaRef::Movie(Uuid::new_v4());
        let show = MediaRef::Tv(Uuid::new_v4());

        store.create(rating(Uuid::new_v4(), movie, 8.0)).await.unwrap();
        store.create(rating(Uuid::new_v4(), movie, 6.0)).await.unwrap();
        store.create(rating(Uuid::new_v4(), show, 2.0)).await.unwrap();

        let (avg, count) = store.average(movie).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(avg, Some(7.0));

        let (avg, count) = store.average(MediaRef::Movie(Uuid::new_v4())).await.unwrap();
        assert_eq!((avg, count), (None, 0));
    }

    #[tokio::test]
    async fn finds_rating_by_user_and_item() {
        let db = Database::in_memory().unwrap();
        let store = RatingStore::new(&db, "ratings");
        let user = Uuid::new_v4();
        let movie = MediaRef::Movie(Uuid::new_v4());
        let created = store.create(rating(user, movie, 9.5)).await.unwrap();

        let found = store.get_by_user_and_item(user, movie).await.unwrap().unwrap();
        assert_eq!(found.record.id, created.record.id);
        assert!(store
            .get_by_user_and_item(Uuid::new_v4(), movie)
            .await
            .unwrap()
            .is_none());
    }
}
