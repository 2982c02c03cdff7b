//! # TaskHub API Server Library
//!
//! HTTP surface for TaskHub: accounts, projects and tasks behind JWT
//! authentication and owner-or-admin access control.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON and path extractors with JSON rejections
//! - `response`: Success envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
