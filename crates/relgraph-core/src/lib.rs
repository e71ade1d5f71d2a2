//! relgraph-core library.
//!
//! Typed, directed relationships between governance records (controls,
//! risks, regulations, scoping objects, ...) stored in SQLite, with the
//! type-pair mapping policy and a bulk neighbor cache.
//!
//! # Conventions
//!
//! - **Errors**: graph and job operations return [`error::Result`];
//!   opening the store and loading config return `anyhow::Result`.
//! - **Logging**: `tracing` macros. Data-integrity problems are `warn!`,
//!   never errors.
//! - **Actors**: every mutating call takes an explicit [`context::Actor`].

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod model;
pub mod registry;
pub mod relationship;

pub use context::Actor;
pub use error::{ErrorCode, GraphError, ValidationError};
pub use model::{Identifiable, Object, Stub};
pub use registry::{NodeType, TypeRegistry};
pub use relationship::{NewRelationship, Relatable, Relationship, RelationshipsCache};
