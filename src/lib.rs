pub mod api;
pub mod billing;
pub mod core;
pub mod keys;
pub mod models;
pub mod routes;
pub mod schema;
