/// Stock catalog loading from config.toml and seeding
pub mod catalog;

/// Database configuration and connection management
pub mod database;
