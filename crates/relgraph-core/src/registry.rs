//! Node-type registry.
//!
//! Relationship rows name their endpoints by a type string plus an integer
//! id. The registry maps those type strings to [`NodeType`] descriptors,
//! which record whether the type may take part in relationships, whether it
//! is a scoping object, and the accessor names used to reach it from an
//! edge (`{Type}_source` / `{Type}_destination`).
//!
//! Node types register themselves explicitly at startup, either from
//! [`TypeRegistry::builtin`] or from the `[registry]` config section.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::RegistryConfig;
use crate::model::SNAPSHOT_TYPE;

/// Scoping object types known out of the box.
pub const BUILTIN_SCOPING_TYPES: &[&str] = &[
    "AccessGroup",
    "AccountBalance",
    "DataAsset",
    "Facility",
    "KeyReport",
    "Market",
    "Metric",
    "OrgGroup",
    "Process",
    "Product",
    "ProductGroup",
    "Project",
    "System",
    "TechnologyEnvironment",
    "Vendor",
];

/// Non-scoping relatable types known out of the box.
pub const BUILTIN_RELATABLE_TYPES: &[&str] = &[
    "Assessment",
    "Audit",
    "Contract",
    "Control",
    "Document",
    "Issue",
    "Objective",
    "Person",
    "Policy",
    "Program",
    "Regulation",
    "Requirement",
    "Risk",
    "Standard",
    "Threat",
    SNAPSHOT_TYPE,
];

/// Registered types that can never be relationship endpoints.
pub const BUILTIN_NON_RELATABLE_TYPES: &[&str] = &["Automapping", "ImportExport"];

/// Which end of an edge an accessor reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
    Source,
    Destination,
}

impl EdgeEnd {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
        }
    }
}

/// Accessor name for `object_type` at `end`, e.g. `Control_source`.
#[must_use]
pub fn accessor_name(object_type: &str, end: EdgeEnd) -> String {
    format!("{object_type}_{}", end.suffix())
}

/// Descriptor for one registered node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeType {
    pub name: String,
    pub relatable: bool,
    pub scoping: bool,
}

impl NodeType {
    /// A relatable, non-scoping type.
    pub fn relatable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relatable: true,
            scoping: false,
        }
    }

    /// A relatable scoping object type.
    pub fn scoping(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relatable: true,
            scoping: true,
        }
    }

    /// A registered type without the relationship capability.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relatable: false,
            scoping: false,
        }
    }

    /// Accessor names this type contributes, or none when not relatable.
    #[must_use]
    pub fn accessors(&self) -> Vec<String> {
        if !self.relatable {
            return Vec::new();
        }
        vec![
            accessor_name(&self.name, EdgeEnd::Source),
            accessor_name(&self.name, EdgeEnd::Destination),
        ]
    }
}

/// Central type-name → descriptor map.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, NodeType>,
    accessors: BTreeMap<String, String>,
}

impl TypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with the built-in GRC object types.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for name in BUILTIN_SCOPING_TYPES {
            registry.register(NodeType::scoping(*name));
        }
        for name in BUILTIN_RELATABLE_TYPES {
            registry.register(NodeType::relatable(*name));
        }
        for name in BUILTIN_NON_RELATABLE_TYPES {
            registry.register(NodeType::plain(*name));
        }
        registry
    }

    /// Built-in registry extended by the `[registry]` config section.
    ///
    /// Config entries are applied in order: relatable types, then scoping
    /// types, then non-relatable types, so a later list wins for a name that
    /// appears in several.
    #[must_use]
    pub fn from_config(config: &RegistryConfig) -> Self {
        let mut registry = Self::builtin();
        for name in &config.relatable_types {
            registry.register(NodeType::relatable(name.clone()));
        }
        for name in &config.scoping_types {
            registry.register(NodeType::scoping(name.clone()));
        }
        for name in &config.non_relatable_types {
            registry.register(NodeType::plain(name.clone()));
        }
        registry
    }

    /// Register (or replace) a node type.
    pub fn register(&mut self, node_type: NodeType) -> &mut Self {
        if let Some(previous) = self.types.get(&node_type.name) {
            for accessor in previous.accessors() {
                self.accessors.remove(&accessor);
            }
        }
        for accessor in node_type.accessors() {
            self.accessors.insert(accessor, node_type.name.clone());
        }
        tracing::trace!(
            node_type = %node_type.name,
            relatable = node_type.relatable,
            scoping = node_type.scoping,
            "registered node type"
        );
        self.types.insert(node_type.name.clone(), node_type);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    /// Whether objects of `name` can be relationship endpoints.
    #[must_use]
    pub fn is_relatable(&self, name: &str) -> bool {
        self.get(name).is_some_and(|t| t.relatable)
    }

    /// Look up the node type owning an accessor such as `Risk_destination`.
    #[must_use]
    pub fn resolve_accessor(&self, accessor: &str) -> Option<&NodeType> {
        self.accessors
            .get(accessor)
            .and_then(|name| self.types.get(name))
    }

    /// Names of all scoping object types.
    #[must_use]
    pub fn scope_type_names(&self) -> BTreeSet<&str> {
        self.types
            .values()
            .filter(|t| t.scoping)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }
}
