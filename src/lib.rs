//! Snippetbox: a server-rendered snippet sharing service with session authentication.

pub mod app_state;
pub mod auth;
pub mod cleanup;
pub mod config;
pub mod csrf;
pub mod database;
pub mod forms;
pub mod logging;
pub mod models;
pub mod server;
pub mod sessions;
pub mod templates;
