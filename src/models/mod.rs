// src/models/mod.rs

pub mod module;
pub mod question;
pub mod streak;
pub mod user;
