//! Veriflow Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! access policy shared across all Veriflow components. It performs no I/O;
//! stores and services live in `veriflow-db` and `veriflow-services`.

pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod token;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use policy::{AccessAction, AccessPolicy};
pub use token::generate_invitation_token;
