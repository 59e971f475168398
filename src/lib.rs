//! Movie Review API Library
//!
//! Exposes the router, storage and auth layers for the binary and tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
