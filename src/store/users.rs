use async_trait::async_trait;
use uuid::Uuid;

use super::{Collection, Database, Filter};
use crate::error::{Error, Result};
use crate::models::{Pagination, User};
use crate::repository::UserRepository;

#[derive(Debug)]
pub struct UserStore {
    docs: Collection<User>,
}

impl UserStore {
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            docs: db.collection(collection),
        }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.docs.get(id).await
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool> {
        let mut filter = Filter::all().eq("$.email", email.to_string());
        if let Some(id) = except {
            filter = filter.ne("$.id", id.to_string());
        }
        Ok(self.docs.count(filter).await? > 0)
    }

    async fn create(&self, user: User) -> Result<User> {
        self.docs.insert(user).await
    }

    async fn update(&self, user: User) -> Result<User> {
        let label = format!("user {:?}", user.record.id);
        self.docs
            .replace(user)
            .await?
            .ok_or_else(|| Error::not_found(label))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.docs.delete(id).await
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<User>, u64)> {
        self.docs.find_page(Filter::all(), &[], page).await
    }
}
