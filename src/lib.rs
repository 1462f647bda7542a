//! Docs sponsors library
//!
//! Aggregates GitHub sponsors with curated Airtable metadata, keeps the
//! Airtable tier mirror in step with GitHub, and serves the docs navigation.

// Public modules
pub mod api;
pub mod config;
pub mod docs;
pub mod error;
pub mod middleware;
pub mod schemas;
pub mod server;
pub mod services;

#[cfg(test)]
mod testutils;

// Re-export commonly used types
pub use config::Settings;
pub use error::ApiError;
pub use server::App;
