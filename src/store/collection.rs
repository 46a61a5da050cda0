use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension};
use std::marker::PhantomData;
use uuid::Uuid;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{Document, Pagination};

/// Conjunction of conditions over a document's JSON body.
///
/// Paths are JSON paths (`$.field`, `$.nested.field`) and are always bound as
/// parameters, never spliced into the statement.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.clauses.push("json_extract(body, ?) = ?".to_string());
        self.params.push(Value::Text(path.to_string()));
        self.params.push(value.into());
        self
    }

    pub fn ne(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.clauses
            .push("json_extract(body, ?) IS NOT ?".to_string());
        self.params.push(Value::Text(path.to_string()));
        self.params.push(value.into());
        self
    }

    /// Case-insensitive substring match against any of `paths`.
    pub fn contains_text(mut self, paths: &[&str], needle: &str) -> Self {
        if paths.is_empty() {
            return self;
        }
        let alternatives = paths
            .iter()
            .map(|_| "instr(lower(coalesce(json_extract(body, ?), '')), lower(?)) > 0")
            .collect::<Vec<_>>()
            .join(" OR ");
        self.clauses.push(format!("({alternatives})"));
        for path in paths {
            self.params.push(Value::Text(path.to_string()));
            self.params.push(Value::Text(needle.to_string()));
        }
        self
    }

    /// Matches documents whose array at `array_path` holds an object with `key == value`.
    pub fn array_has(mut self, array_path: &str, key: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(
            "EXISTS (SELECT 1 FROM json_each(documents.body, ?) AS elem \
             WHERE json_extract(elem.value, ?) = ?)"
                .to_string(),
        );
        self.params.push(Value::Text(array_path.to_string()));
        self.params.push(Value::Text(key.to_string()));
        self.params.push(value.into());
        self
    }

    fn where_sql(&self) -> String {
        let mut sql = String::from("collection = ?");
        for clause in &self.clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        sql
    }

    fn bind(&self, collection: &str) -> Vec<Value> {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(Value::Text(collection.to_string()));
        params.extend(self.params.iter().cloned());
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// Typed view over one named collection.
#[derive(Debug)]
pub struct Collection<T> {
    db: Database,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T> {
    pub(crate) fn new(db: Database, name: String) -> Self {
        Self {
            db,
            name,
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    /// Assigns a fresh id and both timestamps, then inserts.
    pub async fn insert(&self, mut doc: T) -> Result<T> {
        let now = Utc::now();
        let record = doc.record_mut();
        record.id = Some(Uuid::new_v4());
        record.created_at = Some(now);
        record.updated_at = Some(now);

        let id = record.id.map(|id| id.to_string()).unwrap_or_default();
        let body = encode(&doc)?;
        let name = self.name.clone();
        self.db
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
                    (name, id, body),
                )
            })
            .await?;
        Ok(doc)
    }

    /// Overwrites an existing document, refreshing `updated_at` and keeping the
    /// stored `created_at`. Returns `None` when no document has that id.
    pub async fn replace(&self, mut doc: T) -> Result<Option<T>> {
        let id = doc
            .id()
            .ok_or_else(|| Error::invalid_input("document has no id"))?;
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        let record = doc.record_mut();
        record.created_at = existing.record().created_at;
        record.updated_at = Some(Utc::now());

        let body = encode(&doc)?;
        let name = self.name.clone();
        let changed = self
            .db
            .run(move |conn| {
                conn.execute(
                    "UPDATE documents SET body = ?3 WHERE collection = ?1 AND id = ?2",
                    (name, id.to_string(), body),
                )
            })
            .await?;
        Ok((changed > 0).then_some(doc))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let name = self.name.clone();
        let removed = self
            .db
            .run(move |conn| {
                conn.execute(
                    "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                    (name, id.to_string()),
                )
            })
            .await?;
        Ok(removed > 0)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<T>> {
        let name = self.name.clone();
        let body = self
            .db
            .run(move |conn| {
                conn.query_row(
                    "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                    (name, id.to_string()),
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await?;
        body.map(|b| decode(&b)).transpose()
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<T>> {
        Ok(self
            .find(filter, &[], Pagination { limit: 1, offset: 0 })
            .await?
            .into_iter()
            .next())
    }

    /// Documents matching `filter`, ordered by `sort` then insertion order.
    pub async fn find(
        &self,
        filter: Filter,
        sort: &[(&'static str, Order)],
        page: Pagination,
    ) -> Result<Vec<T>> {
        let mut order_by: Vec<String> = sort
            .iter()
            .map(|(path, order)| {
                let dir = match order {
                    Order::Asc => "ASC",
                    Order::Desc => "DESC",
                };
                format!("json_extract(body, '{}') {dir}", path.replace('\'', "''"))
            })
            .collect();
        order_by.push("rowid ASC".to_string());

        let sql = format!(
            "SELECT body FROM documents WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            filter.where_sql(),
            order_by.join(", ")
        );
        let mut params = filter.bind(&self.name);
        params.push(Value::Integer(page.limit as i64));
        params.push(Value::Integer(page.offset as i64));

        let bodies = self
            .db
            .run(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(params), |row| row.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<Vec<String>>>()
            })
            .await?;
        bodies.iter().map(|b| decode(b)).collect()
    }

    pub async fn count(&self, filter: Filter) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", filter.where_sql());
        let params = filter.bind(&self.name);
        let count = self
            .db
            .run(move |conn| {
                conn.query_row(&sql, params_from_iter(params), |row| row.get::<_, i64>(0))
            })
            .await?;
        Ok(count.max(0) as u64)
    }

    /// One page of matches plus the total number of matches.
    pub async fn find_page(
        &self,
        filter: Filter,
        sort: &[(&'static str, Order)],
        page: Pagination,
    ) -> Result<(Vec<T>, u64)> {
        let items = self.find(filter.clone(), sort, page).await?;
        let total = self.count(filter).await?;
        Ok((items, total))
    }

    /// Average of the numeric field at `path` over matching documents, with the match count.
    pub async fn average(&self, path: &str, filter: Filter) -> Result<(Option<f64>, u64)> {
        let sql = format!(
            "SELECT AVG(json_extract(body, ?)), COUNT(*) FROM documents WHERE {}",
            filter.where_sql()
        );
        let mut params = vec![Value::Text(path.to_string())];
        params.extend(filter.bind(&self.name));
        let (avg, count) = self
            .db
            .run(move |conn| {
                conn.query_row(&sql, params_from_iter(params), |row| {
                    Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, i64>(1)?))
                })
            })
            .await?;
        Ok((avg, count.max(0) as u64))
    }
}

fn encode<T: Document>(doc: &T) -> Result<String> {
    serde_json::to_string(doc).map_err(|e| Error::store(format!("encoding document: {e}")))
}

fn decode<T: Document>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::store(format!("decoding document: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genre, Movie, Record};

    fn movie(tmdb_id: i64, title: &str, vote_average: f64, vote_count: i64) -> Movie {
        Movie {
            tmdb_id,
            title: title.to_string(),
            vote_average,
            vote_count,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let db = Database::in_memory().unwrap();
        let movies: Collection<Movie> = db.collection("movies");

        let stored = movies.insert(movie(1, "Alien", 8.1, 100)).await.unwrap();
        let id = stored.record.id.expect("id assigned");
        assert!(stored.record.created_at.is_some());
        assert_eq!(stored.record.created_at, stored.record.updated_at);

        let fetched = movies.get(id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let db = Database::in_memory().unwrap();
        let a: Collection<Movie> = db.collection("a");
        let b: Collection<Movie> = db.collection("b");
        a.insert(movie(1, "Alien", 8.1, 100)).await.unwrap();

        assert_eq!(a.count(Filter::all()).await.unwrap(), 1);
        assert_eq!(b.count(Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_keeps_created_at() {
        let db = Database::in_memory().unwrap();
        let movies: Collection<Movie> = db.collection("movies");
        let stored = movies.insert(movie(1, "Alien", 8.1, 100)).await.unwrap();

        let mut edited = stored.clone();
        edited.title = "Aliens".into();
        edited.record.created_at = None;
        let replaced = movies.replace(edited).await.unwrap().unwrap();

        assert_eq!(replaced.title, "Aliens");
        assert_eq!(replaced.record.created_at, stored.record.created_at);
        assert!(replaced.record.updated_at >= stored.record.updated_at);

        let missing = Movie {
            record: Record {
                id: Some(Uuid::new_v4()),
                ..Default::default()
            },
            ..movie(2, "Ghost", 1.0, 1)
        };
        assert!(movies.replace(missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filters_and_sorting() {
        let db = Database::in_memory().unwrap();
        let movies: Collection<Movie> = db.collection("movies");
        let mut scifi = movie(1, "Arrival", 7.9, 50);
        scifi.genres = vec![Genre {
            id: 878,
            name: "Science Fiction".into(),
        }];
        movies.insert(scifi).await.unwrap();
        movies.insert(movie(2, "Heat", 8.3, 20)).await.unwrap();
        movies.insert(movie(3, "Ronin", 8.3, 40)).await.unwrap();

        let (top, total) = movies
            .find_page(
                Filter::all(),
                &[("$.voteAverage", Order::Desc), ("$.voteCount", Order::Desc)],
                Pagination { limit: 2, offset: 0 },
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        let titles: Vec<_> = top.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["Ronin", "Heat"]);

        let by_genre = movies
            .find(
                Filter::all().array_has("$.genres", "$.id", 878),
                &[],
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(by_genre.len(), 1);
        assert_eq!(by_genre[0].tmdb_id, 1);

        let hit = movies
            .find_one(Filter::all().contains_text(&["$.title", "$.overview"], "RON"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.title, "Ronin");

        let (avg, count) = movies
            .average("$.voteAverage", Filter::all().ne("$.tmdbId", 1))
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert!((avg.unwrap() - 8.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let db = Database::in_memory().unwrap();
        let movies: Collection<Movie> = db.collection("movies");
        let stored = movies.insert(movie(1, "Alien", 8.1, 100)).await.unwrap();
        let id = stored.record.id.unwrap();

        assert!(movies.delete(id).await.unwrap());
        assert!(!movies.delete(id).await.unwrap());
        assert!(movies.get(id).await.unwrap().is_none());
    }
}
