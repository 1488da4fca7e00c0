//! HTTP backend for the campus portal: role-gated CRUD over SQLite, the
//! storage guardian routes and the AI assistant.

pub mod ai;
pub mod app_state;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dates;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod notify;
pub mod prompts;
pub mod rate_limit;
pub mod schema;
