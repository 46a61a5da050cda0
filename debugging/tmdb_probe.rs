//! Fetch a movie or TV show through the catalog's TMDB client and print the
//! entity that would be stored.
//! Usage:
//!   cargo run --bin tmdb_probe -- movie <tmdb_id>
//!   cargo run --bin tmdb_probe -- tv <tmdb_id>
//!   cargo run --bin tmdb_probe -- genres <movie|tv>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cinevault::config::Config;
use cinevault::models::{MediaType, Movie, TvShow};
use cinevault::tmdb::{GenreProvider, MetadataProvider, TmdbClient};
use dotenvy::dotenv;
use serde::Serialize;
use std::env;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let mut args = env::args().skip(1);
    let kind = args.next().context("first argument must be 'movie', 'tv' or 'genres'")?;
    let target = args.next().context("missing second argument")?;

    let config = Config::from_env()?;
    let client = TmdbClient::new(&config.tmdb_base_url, &config.tmdb_api_key, config.tmdb_timeout)?;

    match kind.as_str() {
        "genres" => {
            let media_type: MediaType = target.parse()?;
            print_json(&client.list_genres(media_type).await?)
        }
        "movie" | "tv" => {
            let id: i64 = target
                .parse()
                .with_context(|| format!("tmdb id must be numeric, got '{target}'"))?;
            if kind == "movie" {
                let movie = MetadataProvider::<Movie>::fetch_item(&client, id).await?;
                print_json(&movie)
            } else {
                let show = MetadataProvider::<TvShow>::fetch_item(&client, id).await?;
                print_json(&show)
            }
        }
        other => anyhow::bail!("unknown kind '{}': expected movie, tv or genres", other),
    }
}
