//! Value types shared by the graph, policy, and cache layers.

pub mod object;
pub mod stub;

pub use object::{Identifiable, Object, SNAPSHOT_TYPE};
pub use stub::{ParseStubError, Stub};
