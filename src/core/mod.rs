//! Core infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`error`] - Error types and wire error-code mapping

pub mod config;
pub mod error;
