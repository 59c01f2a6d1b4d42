//! # Lodestore Core
//!
//! Change-set-based persistence engine for lodestore.
//!
//! This crate synchronizes an in-memory domain object graph with a
//! remote Linked-Data-Platform-style repository. It provides:
//! - [`Resource`]: lifecycle, attribute, and baseline tracking
//! - Change-set computation restricted to locally modified keys
//! - Contained-resource declarations, materialization, and the
//!   create/update cascade
//! - Tombstone probing and eradication
//! - [`PersistenceCoordinator`]: the save/delete orchestrator
//! - The best-effort [`SearchIndex`] collaborator boundary
//!
//! ## Architecture
//!
//! A save enters the coordinator and branches on the resource's
//! lifecycle state. The create path assigns identity (pre-assigned,
//! minted, or repository-assigned), issues a full create, derives
//! contained-resource identities, and saves each child in declaration
//! order. The update path diffs current attributes against the
//! last-known-persisted baseline restricted to modified keys; an empty
//! diff short-circuits, otherwise a partial update scoped to exactly
//! the changed predicates goes out, followed by the dirty children
//! only. Both paths conclude by refreshing the baseline from the
//! repository and notifying the secondary index.
//!
//! ## Key invariants
//!
//! - The baseline is replaced only after a confirmed successful remote
//!   read or write, never speculatively
//! - Parent identity assignment strictly precedes child identity
//!   derivation, which strictly precedes child saves
//! - If the primary update fails, no child save is attempted
//! - A destroyed resource is frozen: every further mutation or save is
//!   rejected before any network call
//! - Repeated saves of an unchanged resource are idempotent and free

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod contained;
mod coordinator;
mod diff;
mod error;
mod fields;
mod index;
mod resource;
mod tombstone;

pub use config::CoordinatorConfig;
pub use contained::{
    ChildContent, ChildKind, ChildSchema, ChildSpec, ContainedResource, ContainedResources,
    CreationPolicy,
};
pub use coordinator::{DeleteOptions, IdentityMinter, PersistenceCoordinator};
pub use diff::compute_change_set;
pub use error::{CoreError, CoreResult};
pub use fields::{Cardinality, FieldMap, FieldSpec};
pub use index::{serialize_for_index, IndexEvent, NullIndex, RecordingIndex, SearchIndex};
pub use resource::{Lifecycle, Resource};
pub use tombstone::TombstoneManager;
