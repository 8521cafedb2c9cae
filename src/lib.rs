pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod inference;
pub mod model;
pub mod prompt;
pub mod routes;
pub mod stats;
