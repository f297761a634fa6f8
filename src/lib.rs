//! Grid-cell recommendations from spatial embeddings.
//!
//! A user's rated places are averaged per grid cell, projected onto a learned
//! embedding of the map grid, and compared by cosine similarity against the
//! cells of other cities.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
