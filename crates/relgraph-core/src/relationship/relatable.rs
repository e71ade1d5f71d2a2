//! The relationship capability of node objects.
//!
//! Anything [`Identifiable`] can be [`Relatable`]: its edges are computed
//! from the relationships table on demand. For listings of many objects use
//! [`eager_load`], which fetches both edge collections for the whole batch
//! with one query each.

use std::collections::{BTreeSet, HashMap, HashSet};

use rusqlite::Connection;

use super::{RELATIONSHIP_COLUMNS, Relationship, endpoint_resolvable, row_to_relationship};
use crate::db::objects::get_objects;
use crate::db::{stub_set_param, stub_set_subquery};
use crate::error::Result;
use crate::model::{Identifiable, Object, Stub};
use crate::registry::TypeRegistry;

pub trait Relatable: Identifiable {
    /// Edges where this object is the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn related_sources(&self, conn: &Connection) -> Result<Vec<Relationship>> {
        edges_at(conn, "destination", &self.stub())
    }

    /// Edges where this object is the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn related_destinations(&self, conn: &Connection) -> Result<Vec<Relationship>> {
        edges_at(conn, "source", &self.stub())
    }

    /// Every object on the other end of an edge, optionally restricted to
    /// `types`. An empty type list means no restriction.
    ///
    /// Endpoints that cannot be resolved are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    fn related_objects(
        &self,
        conn: &Connection,
        registry: &TypeRegistry,
        types: Option<&[String]>,
    ) -> Result<HashSet<Object>> {
        let sources = self.related_sources(conn)?;
        let destinations = self.related_destinations(conn)?;

        let mut wanted = BTreeSet::new();
        for relationship in &sources {
            if endpoint_resolvable(registry, &relationship.source_attr()) {
                wanted.insert(relationship.source_stub());
            }
        }
        for relationship in &destinations {
            if endpoint_resolvable(registry, &relationship.destination_attr()) {
                wanted.insert(relationship.destination_stub());
            }
        }

        if let Some(types) = types.filter(|t| !t.is_empty()) {
            wanted.retain(|stub| types.contains(&stub.object_type));
        }

        let wanted: Vec<Stub> = wanted.into_iter().collect();
        let objects = get_objects(conn, &wanted)?;
        if objects.len() < wanted.len() {
            tracing::warn!(
                object = %self.stub(),
                missing = wanted.len() - objects.len(),
                "related objects point at missing rows"
            );
        }
        Ok(objects.into_iter().collect())
    }
}

impl Relatable for Object {}
impl Relatable for Stub {}

fn edges_at(conn: &Connection, end: &str, stub: &Stub) -> Result<Vec<Relationship>> {
    let sql = format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
         WHERE {end}_type = ?1 AND {end}_id = ?2 \
         ORDER BY relationship_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params![stub.object_type, stub.id], row_to_relationship)?;

    let mut relationships = Vec::new();
    for row in rows {
        relationships.push(row?);
    }
    Ok(relationships)
}

/// Options for [`eager_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EagerOptions {
    /// Fetch the edge collections. On by default.
    pub load_related: bool,
}

impl Default for EagerOptions {
    fn default() -> Self {
        Self { load_related: true }
    }
}

/// Preloaded edge collections for a batch of objects.
#[derive(Debug, Clone, Default)]
pub struct EagerRelationships {
    loaded: bool,
    sources: HashMap<Stub, Vec<Relationship>>,
    destinations: HashMap<Stub, Vec<Relationship>>,
}

impl EagerRelationships {
    /// Whether the collections were fetched at all.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Preloaded edges where `stub` is the destination.
    #[must_use]
    pub fn related_sources(&self, stub: &Stub) -> &[Relationship] {
        self.sources.get(stub).map(Vec::as_slice).unwrap_or_default()
    }

    /// Preloaded edges where `stub` is the source.
    #[must_use]
    pub fn related_destinations(&self, stub: &Stub) -> &[Relationship] {
        self.destinations.get(stub).map(Vec::as_slice).unwrap_or_default()
    }

    /// Neighbor stubs of `stub` across both collections.
    #[must_use]
    pub fn neighbors(&self, stub: &Stub) -> BTreeSet<Stub> {
        self.related_sources(stub)
            .iter()
            .map(Relationship::source_stub)
            .chain(
                self.related_destinations(stub)
                    .iter()
                    .map(Relationship::destination_stub),
            )
            .collect()
    }
}

/// Load `related_sources` and `related_destinations` for every object in
/// `objects` using one query per collection.
///
/// # Errors
///
/// Returns an error if a query fails.
pub fn eager_load<T: Identifiable>(
    conn: &Connection,
    objects: &[T],
    options: EagerOptions,
) -> Result<EagerRelationships> {
    if !options.load_related {
        return Ok(EagerRelationships::default());
    }

    let stubs: Vec<Stub> = objects.iter().map(Identifiable::stub).collect();
    let mut eager = EagerRelationships {
        loaded: true,
        ..EagerRelationships::default()
    };
    if stubs.is_empty() {
        return Ok(eager);
    }

    let param = stub_set_param(&stubs)?;
    for relationship in edges_in_set(conn, "destination", &param)? {
        eager
            .sources
            .entry(relationship.destination_stub())
            .or_default()
            .push(relationship);
    }
    for relationship in edges_in_set(conn, "source", &param)? {
        eager
            .destinations
            .entry(relationship.source_stub())
            .or_default()
            .push(relationship);
    }

    tracing::debug!(
        objects = stubs.len(),
        sources = eager.sources.values().map(Vec::len).sum::<usize>(),
        destinations = eager.destinations.values().map(Vec::len).sum::<usize>(),
        "eager-loaded relationships"
    );
    Ok(eager)
}

fn edges_in_set(conn: &Connection, end: &str, param: &str) -> Result<Vec<Relationship>> {
    let sql = format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
         WHERE ({end}_type, {end}_id) IN ({}) \
         ORDER BY relationship_id",
        stub_set_subquery(1)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([param], row_to_relationship)?;

    let mut relationships = Vec::new();
    for row in rows {
        relationships.push(row?);
    }
    Ok(relationships)
}
