//! # TaskHub Shared Library
//!
//! Domain types, persistence, access control and resource services used by
//! the TaskHub API server.
//!
//! ## Module Organization
//!
//! - `models`: Plain data records for users, projects and tasks
//! - `store`: `EntityStore` repository trait with Postgres and in-memory backends
//! - `auth`: Password hashing, JWT, access control engine and middleware
//! - `services`: User, project and task operations
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the TaskHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
