//! groovy-server: backend for a university community app
//!
//! Users and their university verification, friends, study groups with join
//! requests, group and personal chat, and notifications, exposed as a JSON
//! API over PostgreSQL.

pub mod db;
pub mod http;
pub mod models;
pub mod services;

pub use db::{create_pool, create_pool_with_options};
pub use http::{build_router, run_server, ServerConfig};
