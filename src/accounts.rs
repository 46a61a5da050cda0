use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Pagination, Record, User};
use crate::repository::UserRepository;

const NAME_MAX_CHARS: usize = 50;
const AGE_MAX: i64 = 150;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub age: Option<i64>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub is_active: Option<bool>,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: NewUser) -> Result<User> {
        let email = validate_email(&input.email)?;
        let first_name = validate_name("firstName", &input.first_name)?;
        let last_name = validate_name("lastName", &input.last_name)?;
        let age = input.age.map(validate_age).transpose()?;

        // Racy by nature: there is no unique index behind this check.
        if self.repo.email_taken(&email, None).await? {
            return Err(Error::conflict(format!("user with email {email}")));
        }

        let user = self
            .repo
            .create(User {
                record: Record::default(),
                email,
                first_name,
                last_name,
                age,
                is_active: true,
            })
            .await?;
        info!("Created user {:?}", user.record.id);
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("user {id}")))
    }

    pub async fn update(&self, id: Uuid, patch: UserUpdate) -> Result<User> {
        let mut user = self.get(id).await?;

        if let Some(email) = patch.email {
            let email = validate_email(&email)?;
            if email != user.email && self.repo.email_taken(&email, Some(id)).await? {
                return Err(Error::conflict(format!("user with email {email}")));
            }
            user.email = email;
        }
        if let Some(name) = patch.first_name {
            user.first_name = validate_name("firstName", &name)?;
        }
        if let Some(name) = patch.last_name {
            user.last_name = validate_name("lastName", &name)?;
        }
        if let Some(age) = patch.age {
            user.age = Some(validate_age(age)?);
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }

        self.repo.update(user).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.repo.delete(id).await? {
            return Err(Error::not_found(format!("user {id}")));
        }
        info!("Deleted user {}", id);
        Ok(())
    }

    pub async fn list(&self, page: Pagination) -> Result<(Vec<User>, u64)> {
        self.repo.list(page).await
    }
}

fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
        }
        None => false,
    };
    if valid {
        Ok(email.to_string())
    } else {
        Err(Error::invalid_input(format!("'{raw}' is not a valid email address")))
    }
}

fn validate_name(field: &str, raw: &str) -> Result<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(Error::invalid_input(format!(
            "{field} must be between 1 and {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_age(age: i64) -> Result<u8> {
    if (0..=AGE_MAX).contains(&age) {
        Ok(age as u8)
    } else {
        Err(Error::invalid_input(format!("age must be between 0 and {AGE_MAX}")))
    }
}
