//! Core business logic for pollnow.

pub mod services;

pub use services::*;
