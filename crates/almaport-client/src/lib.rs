//! Core almaport library (session pipeline, resource API, config).

pub mod api;
pub mod config;
pub mod error;
pub mod session;
