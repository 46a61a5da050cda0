use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::tmdb::TMDB_BASE;

/// Collection names inside the document store.
#[derive(Debug, Clone)]
pub struct Collections {
    pub movies: String,
    pub tv: String,
    pub users: String,
    pub watchlist: String,
    pub ratings: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            movies: "movies".into(),
            tv: "tv_shows".into(),
            users: "users".into(),
            watchlist: "watchlist".into(),
            ratings: "ratings".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub environment: String,
    pub collections: Collections,
    pub store_timeout: Duration,
    pub tmdb_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Config {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let tmdb_api_key = var("TMDB_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("Missing required environment variable: TMDB_API_KEY"))?;
        let defaults = Collections::default();

        Ok(Self {
            tmdb_api_key,
            tmdb_base_url: or("TMDB_BASE_URL", TMDB_BASE),
            port: parse(&var, "PORT", 8080)?,
            database_path: PathBuf::from(or("DATABASE_PATH", "data/cinevault.db")),
            environment: or("ENVIRONMENT", "development"),
            collections: Collections {
                movies: or("MOVIES_COLLECTION", &defaults.movies),
                tv: or("TV_COLLECTION", &defaults.tv),
                users: or("USERS_COLLECTION", &defaults.users),
                watchlist: or("WATCHLIST_COLLECTION", &defaults.watchlist),
                ratings: or("RATINGS_COLLECTION", &defaults.ratings),
            },
            store_timeout: Duration::from_secs(parse(&var, "STORE_TIMEOUT_SECS", 10)?),
            tmdb_timeout: Duration::from_secs(parse(&var, "TMDB_TIMEOUT_SECS", 30)?),
            shutdown_grace: Duration::from_secs(parse(&var, "SHUTDOWN_GRACE_SECS", 30)?),
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn api_key_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("TMDB_API_KEY"));
        assert!(load(&[("TMDB_API_KEY", "  ")]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[("TMDB_API_KEY", "secret")]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.tmdb_base_url, TMDB_BASE);
        assert_eq!(cfg.collections.tv, "tv_shows");
        assert_eq!(cfg.store_timeout, Duration::from_secs(10));
        assert_eq!(cfg.tmdb_timeout, Duration::from_secs(30));
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(30));
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let cfg = load(&[
            ("TMDB_API_KEY", "secret"),
            ("PORT", "9000"),
            ("MOVIES_COLLECTION", "films"),
            ("STORE_TIMEOUT_SECS", "2"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.collections.movies, "films");
        assert_eq!(cfg.store_timeout, Duration::from_secs(2));

        let err = load(&[("TMDB_API_KEY", "secret"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
