pub mod accounts;
pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod repository;
pub mod routes;
pub mod store;
pub mod tmdb;

pub use error::{Error, Result};
