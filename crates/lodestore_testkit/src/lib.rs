//! # Lodestore Testkit
//!
//! Test utilities for lodestore.
//!
//! This crate provides:
//! - A pre-wired harness (in-memory repository + coordinator +
//!   recording index) for lifecycle tests
//! - Scenario helpers with ready-made schemas and persisted resources
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lodestore_testkit::with_harness;
//!
//! #[test]
//! fn saves_something() {
//!     with_harness(|h| {
//!         let mut resource = h.resource();
//!         h.coordinator.save(&mut resource).unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fixtures;
mod generators;

pub use fixtures::{scenarios, with_harness, TestHarness};
pub use generators::{
    attribute_map_strategy, modification_strategy, predicate_strategy, value_strategy,
    Modification,
};
