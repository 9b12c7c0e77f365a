pub mod app;
pub mod auth;
pub mod boundary;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod members;
pub mod middleware;
pub mod organizations;
pub mod pagination;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
