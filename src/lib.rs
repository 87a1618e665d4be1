//! Task manager backend: user accounts with bearer-token auth and
//! owner-scoped task CRUD over a JSON API, plus a typed client session.

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod state;
pub mod tasks;
