//! # Sponsorship Proposals Library
//!
//! Plan limits, host-based tenant resolution and the HTTP service built on
//! top of them.

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod domains;
pub mod error;
pub mod handlers;
pub mod hosting;
pub mod models;
pub mod plans;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
