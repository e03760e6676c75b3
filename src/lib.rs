//! Datty - pluggable data-access layer with a MessagePack-derived record and
//! versioning codec.
//!
//! Records are addressed by set name, optional super key and major key, and
//! hold minor-key columns with binary payloads. Every write bumps a version
//! token used for optimistic concurrency. Operations, results and the value
//! trees stored in columns all travel as compact MessagePack.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Drivers (store)                         │
//! │            Driver trait │ MemoryStore │ encoded loop            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Envelopes (io)                           │
//! │    Field codec │ Version │ Record │ Operation │ Result          │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Value model (value)                       │
//! │     Boolean │ Number │ String │ Table │ Path expressions        │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Buffer primitives (codec)                    │
//! │        PackWriter │ PackReader │ typed reads │ payloads         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::error`] - Error types and wire error codes
//!
//! ## Codec
//! - [`codec::format`] - Format byte classification
//! - [`codec::writer`] - Encoders and header backpatching
//! - [`codec::reader`] - Decoders, skipping and zero-copy slicing
//! - [`codec::typed`] - Descriptor-driven typed reads
//!
//! ## Values
//! - [`value`] - Packable value trees and their codec
//! - [`value::expression`] - Path expressions
//! - [`value::json`] - JSON projection
//! - [`value::message`] - Header and payload messages
//!
//! ## Envelopes
//! - [`io::field`] - Field identifiers and tagged maps
//! - [`io::version`] - Version tokens
//! - [`io::record`] - Records and update policies
//! - [`io::operation`] - Operation envelopes
//! - [`io::result`] - Result envelopes
//!
//! ## Drivers
//! - [`store`] - Driver trait and the in-memory backend
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations

// Core infrastructure
pub mod core;

// Buffer primitives
pub mod codec;

// Value model
pub mod value;

// Envelope codecs
pub mod io;

// Drivers
pub mod store;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::error::{DattyError, DattyResult, ErrCode};
pub use self::core::{config, error};
pub use codec::{PackReader, PackWriter, Payload, ReadMode};
pub use io::{Operation, OperationResult, Record, Version};
pub use store::{Driver, MemoryStore};
pub use value::{PackableValue, PathExpression};
