//! # Lodestore Protocol
//!
//! Shared data model for the lodestore repository protocol.
//!
//! This crate provides:
//! - Resource URIs with derived child and tombstone paths
//! - Attribute values and attribute maps
//! - Change sets (minimal per-predicate insertions/deletions)
//! - Resource descriptions returned by repository reads
//! - The tri-state existence probe result
//!
//! No I/O happens here; the repository client and the persistence engine
//! both build on these types.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_set;
mod description;
mod error;
mod uri;
mod value;

pub use change_set::{ChangeSet, Statement};
pub use description::{Existence, ResourceDescription};
pub use error::{ProtocolError, ProtocolResult};
pub use uri::{ResourceUri, TOMBSTONE_SEGMENT};
pub use value::{AttributeMap, Value};
