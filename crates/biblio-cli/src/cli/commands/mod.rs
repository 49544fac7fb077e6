//! CLI command handlers.

pub mod auth;
pub mod catalog;
pub mod config;
