//! # Lodestore Repository
//!
//! Repository client boundary for lodestore.
//!
//! This crate provides:
//! - The synchronous [`Repository`] trait consumed by the persistence
//!   engine (probe / fetch / put / post / patch / delete)
//! - An HTTP transport generic over a pluggable [`HttpClient`]
//! - A full-semantics [`InMemoryRepository`] with tombstones,
//!   containment, server-minted identities, and an operation journal
//!   for tests
//!
//! ## Key invariants
//!
//! - Every call blocks the caller until response; no internal retry
//! - A deleted resource leaves a tombstone at its reserved child path;
//!   the identity cannot be reused until the marker is deleted
//! - Remote "not found" and "gone" signals surface as typed errors, not
//!   as transport failures

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod http;
mod memory;

pub use client::Repository;
pub use error::{RepositoryError, RepositoryResult};
pub use http::{HttpClient, HttpRepository, HttpResponse};
pub use memory::{InMemoryRepository, Operation, OperationRecord};
