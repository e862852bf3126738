// src/api/mod.rs

pub mod ai;
pub mod auth;
pub mod client;
pub mod modules;
pub mod quiz;
pub mod streak;
pub mod users;

pub use client::ApiClient;
