// src/lib.rs

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod quiz;
pub mod session;

pub use api::ApiClient;
pub use config::Config;
pub use error::ClientError;
