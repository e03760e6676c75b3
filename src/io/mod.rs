//! Envelope codecs built on the tagged-map field encoding.
//!
//! - [`field`] - Field identifiers, [`FieldWriter`] and [`read_fields`]
//! - [`version`] - Version tokens
//! - [`record`] - Records, update policies and the versioned record lifecycle
//! - [`operation`] - Operation envelopes
//! - [`result`] - Result envelopes

pub mod field;
pub mod operation;
pub mod record;
pub mod result;
pub mod version;

pub use field::{read_fields, Field, FieldKey, FieldWriter};
pub use operation::{
    CompareAndSetOperation, FetchOperation, HeadOperation, MinorKeys, OpCode, Operation,
    PutOperation, QueryKey, RemoveOperation, SizeOperation,
};
pub use record::{Record, UpdatePolicy, VersionedRecord};
pub use result::{OperationResult, ResCode};
pub use version::{Version, VersionType};
