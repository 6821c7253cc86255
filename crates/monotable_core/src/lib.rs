//! # Monotable Core
//!
//! Single-table NoSQL access layer.
//!
//! This crate maps application records onto one physical hash/range
//! table with a small fixed set of secondary indexes:
//! - [`schema`]: declarative, validated index configuration
//! - [`keys`]: composite-key encoding and sparse-index decoration
//! - [`plan`]: deterministic index selection for a predicate
//! - [`query`]: query compilation, opaque cursors, and pagination
//! - [`batch`]: chunked, deduplicated, retry-aware bulk get/write
//! - [`Repository`]: typed orchestration with explicit put modes,
//!   shallow merge, a read-time migration hook, and an optional
//!   request-coalescing cache
//!
//! The physical store itself is an external collaborator behind
//! [`monotable_store::StoreClient`].
//!
//! ## Example
//!
//! ```ignore
//! use monotable_core::{IndexDefinition, IndexKind, KeyField, PutMode, Repository, TableSchema};
//!
//! let schema = TableSchema::builder("app-table", "User")
//!     .primary(
//!         IndexDefinition::new("primary", IndexKind::Primary, "pk")
//!             .sort_attribute("sk")
//!             .field(KeyField::source("country"))
//!             .field(KeyField::source("state")),
//!     )
//!     .build()?;
//!
//! let repo: Repository<User, _> = Repository::new(schema, store);
//! repo.put(&user, PutMode::Create).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
mod error;
mod expr;
pub mod keys;
mod loader;
pub mod plan;
pub mod query;
mod repository;
pub mod schema;

pub use error::{CoreError, CoreResult};
pub use expr::AttributeRegistry;
pub use query::{Direction, Page, Pages, QueryClause};
pub use repository::{Migrator, PutMode, Repository};
pub use schema::{
    IndexDefinition, IndexKind, KeyField, StringifyFn, TableSchema, TableSchemaBuilder,
    WritePredicate, DEFAULT_SEPARATOR, DEFAULT_TYPE_ATTRIBUTE,
};
