pub mod config;
pub mod db;
pub mod error;

// Domain modules
pub mod auth;
pub mod github;
pub mod summarizer;

// HTTP surface
pub mod api;

// CLI
pub mod cli;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
