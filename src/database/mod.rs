//! # Database Layer
//!
//! Connection pool management and the schema migration runner.

pub mod connection;
pub mod migrations;

pub use connection::DatabaseConnection;
pub use migrations::DatabaseMigrations;
