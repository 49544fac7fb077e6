//! Core biblio library (session, navigation guard, REST pipeline, catalog, config).

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod nav;
