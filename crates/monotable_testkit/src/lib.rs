//! # Monotable Testkit
//!
//! Test utilities for Monotable.
//!
//! This crate provides:
//! - Fixtures: a representative record type, its table schema, and
//!   helpers wiring up an in-memory store
//! - Property-based test generators using proptest
//!
//! The workspace's cross-crate integration tests live in this crate's
//! `tests/` directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use monotable_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_repository() {
//!     let (repo, store) = customer_repository();
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
