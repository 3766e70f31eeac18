//! gitnaughty - a small blog server
//!
//! Session-cookie logins plus posts, embedded comments and authors over
//! SQLite or MySQL.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
