//! Directed, typed edges between relatable objects.
//!
//! An edge names both endpoints by `(type, id)` only. Creation and deletion
//! go through this module so the type-pair policy, the snapshot guard, and
//! the external-delete guard always run inside the same savepoint as the
//! write itself.

pub mod automapping;
pub mod cache;
pub mod policy;
pub mod query;
pub mod relatable;

pub use cache::RelationshipsCache;
pub use policy::PolicyViolation;
pub use query::{RelatedQuery, get_related_query_by_type_id};
pub use relatable::{EagerOptions, EagerRelationships, Relatable, eager_load};

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::context::Actor;
use crate::db::objects::{get_object, object_exists};
use crate::db::{in_savepoint, is_unique_violation, now_us};
use crate::error::{GraphError, Result, ValidationError};
use crate::model::{Identifiable, Object, Stub};
use crate::registry::{EdgeEnd, TypeRegistry, accessor_name};

pub(crate) const RELATIONSHIP_COLUMNS: &str = "relationship_id, source_type, source_id, \
     destination_type, destination_id, parent_id, automapping_id, is_external, \
     modified_by_id, created_at_us, updated_at_us";

/// A persisted relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub id: i64,
    pub source_type: String,
    pub source_id: i64,
    pub destination_type: String,
    pub destination_id: i64,
    /// Edge whose automapping produced this one.
    pub parent_id: Option<i64>,
    pub automapping_id: Option<i64>,
    pub is_external: bool,
    pub modified_by_id: Option<i64>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Relationship {
    /// `Control:1 <-> Objective:3`
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{}:{} <-> {}:{}",
            self.source_type, self.source_id, self.destination_type, self.destination_id
        )
    }

    #[must_use]
    pub fn source_attr(&self) -> String {
        accessor_name(&self.source_type, EdgeEnd::Source)
    }

    #[must_use]
    pub fn destination_attr(&self) -> String {
        accessor_name(&self.destination_type, EdgeEnd::Destination)
    }

    #[must_use]
    pub fn source_stub(&self) -> Stub {
        Stub::from_source(self)
    }

    #[must_use]
    pub fn destination_stub(&self) -> Stub {
        Stub::from_destination(self)
    }

    /// Whether `stub` is either endpoint.
    #[must_use]
    pub fn touches(&self, stub: &Stub) -> bool {
        (self.source_type == stub.object_type && self.source_id == stub.id)
            || (self.destination_type == stub.object_type && self.destination_id == stub.id)
    }
}

/// Input for [`create`].
///
/// Endpoints are optional so that a missing endpoint surfaces as a
/// validation error rather than being unrepresentable at the call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewRelationship<'a> {
    pub source: Option<&'a Object>,
    pub destination: Option<&'a Object>,
    pub is_external: bool,
    pub parent_id: Option<i64>,
    pub automapping_id: Option<i64>,
}

impl<'a> NewRelationship<'a> {
    #[must_use]
    pub const fn between(source: &'a Object, destination: &'a Object) -> Self {
        Self {
            source: Some(source),
            destination: Some(destination),
            is_external: false,
            parent_id: None,
            automapping_id: None,
        }
    }

    #[must_use]
    pub const fn external(mut self, is_external: bool) -> Self {
        self.is_external = is_external;
        self
    }
}

/// Create a relationship after validating both endpoints and the type pair.
///
/// # Errors
///
/// - `Validation` for a missing endpoint, a non-relatable or unknown
///   endpoint, a disallowed type pair, or a snapshot related to its origin.
/// - `Conflict` when the ordered pair is already related.
pub fn create(
    conn: &Connection,
    registry: &TypeRegistry,
    actor: &Actor,
    new: NewRelationship<'_>,
) -> Result<Relationship> {
    in_savepoint(conn, "relationship_create", || {
        let source = validate_relatable_type(conn, registry, "source", new.source)?;
        let destination = validate_relatable_type(conn, registry, "destination", new.destination)?;

        validate_relation_by_type(
            registry,
            actor,
            &source.object_type,
            &destination.object_type,
        )?;
        check_snapshot_pair(conn, source, destination)?;

        insert_relationship(conn, actor, source, destination, &new)
    })
}

fn validate_relatable_type<'o>(
    conn: &Connection,
    registry: &TypeRegistry,
    field: &str,
    value: Option<&'o Object>,
) -> Result<&'o Object> {
    let Some(object) = value else {
        return Err(GraphError::validation(format!(
            "Relationship.{field} can't be None."
        )));
    };

    if !registry.is_relatable(&object.object_type) {
        return Err(GraphError::validation(format!(
            "You are trying to create relationship with not Relatable type: {}",
            object.object_type
        )));
    }

    if !object_exists(conn, &object.stub())? {
        return Err(GraphError::validation(format!(
            "Relationship.{field} {} does not exist.",
            object.stub()
        )));
    }

    Ok(object)
}

/// Reject an edge between a snapshot and the entity it was taken from.
fn check_snapshot_pair(conn: &Connection, source: &Object, destination: &Object) -> Result<()> {
    for (value, other) in [(source, destination), (destination, source)] {
        if !value.is_snapshot() {
            continue;
        }

        // Read from storage; the passed child is not trusted.
        let child = get_object(conn, &value.stub())?
            .and_then(|snapshot| snapshot.child)
            .ok_or_else(|| {
                GraphError::validation(format!("Snapshot {} not found.", value.stub()))
            })?;

        if child == other.stub() {
            return Err(GraphError::validation(format!(
                "Invalid source-destination types pair for Relationship: \
                 source_type='{}', destination_type='{}'",
                source.object_type, destination.object_type
            )));
        }
    }
    Ok(())
}

fn insert_relationship(
    conn: &Connection,
    actor: &Actor,
    source: &Object,
    destination: &Object,
    new: &NewRelationship<'_>,
) -> Result<Relationship> {
    let now = now_us();
    conn.execute(
        "INSERT INTO relationships (
            source_type, source_id, destination_type, destination_id,
            parent_id, automapping_id, is_external, modified_by_id,
            created_at_us, updated_at_us
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            source.object_type,
            source.id,
            destination.object_type,
            destination.id,
            new.parent_id,
            new.automapping_id,
            new.is_external,
            actor.user_id,
            now
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            GraphError::Conflict(format!(
                "{}:{} <-> {}:{}",
                source.object_type, source.id, destination.object_type, destination.id
            ))
        } else {
            GraphError::Storage(e)
        }
    })?;

    let relationship = Relationship {
        id: conn.last_insert_rowid(),
        source_type: source.object_type.clone(),
        source_id: source.id,
        destination_type: destination.object_type.clone(),
        destination_id: destination.id,
        parent_id: new.parent_id,
        automapping_id: new.automapping_id,
        is_external: new.is_external,
        modified_by_id: Some(actor.user_id),
        created_at_us: now,
        updated_at_us: now,
    };

    tracing::debug!(
        relationship_id = relationship.id,
        edge = %relationship.display_name(),
        is_external = relationship.is_external,
        "created relationship"
    );

    Ok(relationship)
}

/// Policy entry point for a `(source_type, destination_type)` pair.
///
/// # Errors
///
/// Returns `Validation` with the restriction message when the pair is not
/// mappable by `actor`.
pub fn validate_relation_by_type(
    registry: &TypeRegistry,
    actor: &Actor,
    source_type: &str,
    destination_type: &str,
) -> Result<()> {
    policy::check_mapping(
        &registry.scope_type_names(),
        actor.is_external,
        source_type,
        destination_type,
    )
    .map_err(|violation| GraphError::Validation(ValidationError::from(violation)))
}

/// Guard run before an edge is removed.
///
/// # Errors
///
/// Returns `Validation` when the recorded type pair is restricted, or when an
/// external actor tries to remove an edge it did not create externally.
pub fn validate_delete(
    registry: &TypeRegistry,
    actor: &Actor,
    relationship: &Relationship,
) -> Result<()> {
    validate_relation_by_type(
        registry,
        actor,
        &relationship.source_type,
        &relationship.destination_type,
    )?;
    if actor.is_external && !relationship.is_external {
        return Err(GraphError::validation(
            "External application can delete only external relationships.",
        ));
    }
    Ok(())
}

/// Delete a relationship by id.
///
/// # Errors
///
/// `NotFound` when no such edge exists, or any [`validate_delete`] failure.
pub fn delete(
    conn: &Connection,
    registry: &TypeRegistry,
    actor: &Actor,
    id: i64,
) -> Result<Relationship> {
    in_savepoint(conn, "relationship_delete", || {
        let relationship = get(conn, id)?.ok_or_else(|| GraphError::NotFound {
            kind: "relationship",
            key: id.to_string(),
        })?;
        validate_delete(registry, actor, &relationship)?;
        delete_row(conn, &relationship)?;
        Ok(relationship)
    })
}

fn delete_row(conn: &Connection, relationship: &Relationship) -> Result<()> {
    conn.execute(
        "DELETE FROM relationships WHERE relationship_id = ?1",
        [relationship.id],
    )?;
    tracing::debug!(
        relationship_id = relationship.id,
        edge = %relationship.display_name(),
        "deleted relationship"
    );
    Ok(())
}

/// Delete every edge touching `stub`, then the object itself.
///
/// Each edge passes through [`validate_delete`]; one refusal aborts the
/// whole cascade. Returns the removed edges.
///
/// # Errors
///
/// `NotFound` when the object does not exist, or any [`validate_delete`]
/// failure.
pub fn delete_object(
    conn: &Connection,
    registry: &TypeRegistry,
    actor: &Actor,
    stub: &Stub,
) -> Result<Vec<Relationship>> {
    in_savepoint(conn, "object_delete", || {
        if !object_exists(conn, stub)? {
            return Err(GraphError::NotFound {
                kind: "object",
                key: stub.to_string(),
            });
        }

        let mut removed = stub.related_sources(conn)?;
        removed.extend(stub.related_destinations(conn)?);
        removed.sort_by_key(|r| r.id);
        removed.dedup_by_key(|r| r.id);

        for relationship in &removed {
            validate_delete(registry, actor, relationship)?;
        }
        for relationship in &removed {
            delete_row(conn, relationship)?;
        }

        crate::db::objects::delete_object_row(conn, stub)?;
        tracing::debug!(object = %stub, edges = removed.len(), "deleted object");
        Ok(removed)
    })
}

/// Fetch one relationship by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get(conn: &Connection, id: i64) -> Result<Option<Relationship>> {
    let sql = format!("SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE relationship_id = ?1");
    let relationship = conn
        .query_row(&sql, [id], row_to_relationship)
        .optional()?;
    Ok(relationship)
}

/// First edge between `a` and `b` in either direction.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn find_related(
    conn: &Connection,
    a: &impl Identifiable,
    b: &impl Identifiable,
) -> Result<Option<Relationship>> {
    get_related_query(a, b).first(conn)
}

/// Query for edges between `a` and `b` in either direction.
pub fn get_related_query(a: &impl Identifiable, b: &impl Identifiable) -> RelatedQuery {
    get_related_query_by_type_id(
        Some(a.object_type()),
        Some(a.object_id()),
        Some(b.object_type()),
        Some(b.object_id()),
        false,
    )
}

/// Resolve the source endpoint.
///
/// Returns `None` with a warning when the recorded type has no registered
/// accessor or the row is gone.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn source(
    conn: &Connection,
    registry: &TypeRegistry,
    relationship: &Relationship,
) -> Result<Option<Object>> {
    resolve_endpoint(conn, registry, relationship, EdgeEnd::Source)
}

/// Resolve the destination endpoint. See [`source`].
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn destination(
    conn: &Connection,
    registry: &TypeRegistry,
    relationship: &Relationship,
) -> Result<Option<Object>> {
    resolve_endpoint(conn, registry, relationship, EdgeEnd::Destination)
}

/// The endpoint opposite the one of type `object_type`.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_related_for(
    conn: &Connection,
    registry: &TypeRegistry,
    relationship: &Relationship,
    object_type: &str,
) -> Result<Option<Object>> {
    if object_type == relationship.source_type {
        return destination(conn, registry, relationship);
    }
    if object_type == relationship.destination_type {
        return source(conn, registry, relationship);
    }
    Ok(None)
}

fn resolve_endpoint(
    conn: &Connection,
    registry: &TypeRegistry,
    relationship: &Relationship,
    end: EdgeEnd,
) -> Result<Option<Object>> {
    let (attr, stub) = match end {
        EdgeEnd::Source => (relationship.source_attr(), relationship.source_stub()),
        EdgeEnd::Destination => (
            relationship.destination_attr(),
            relationship.destination_stub(),
        ),
    };

    if !endpoint_resolvable(registry, &attr) {
        return Ok(None);
    }

    let object = get_object(conn, &stub)?;
    if object.is_none() {
        tracing::warn!(
            relationship_id = relationship.id,
            endpoint = %stub,
            "Relationship endpoint points at a missing object"
        );
    }
    Ok(object)
}

/// Whether an accessor is registered, warning about stored data when not.
pub(crate) fn endpoint_resolvable(registry: &TypeRegistry, attr: &str) -> bool {
    if registry.resolve_accessor(attr).is_some() {
        return true;
    }
    tracing::warn!(
        "Relationship endpoint attr '{attr}' does not exist. \
         This indicates invalid data in our database!"
    );
    false
}

pub(crate) fn row_to_relationship(row: &rusqlite::Row<'_>) -> rusqlite::Result<Relationship> {
    Ok(Relationship {
        id: row.get(0)?,
        source_type: row.get(1)?,
        source_id: row.get(2)?,
        destination_type: row.get(3)?,
        destination_id: row.get(4)?,
        parent_id: row.get(5)?,
        automapping_id: row.get(6)?,
        is_external: row.get(7)?,
        modified_by_id: row.get(8)?,
        created_at_us: row.get(9)?,
        updated_at_us: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::objects::insert_object;
    use crate::db::open_in_memory;
    use crate::registry::NodeType;

    struct Fixture {
        conn: Connection,
        registry: TypeRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                conn: open_in_memory().expect("open store"),
                registry: TypeRegistry::builtin(),
            }
        }

        fn object(&self, object_type: &str, id: i64) -> Object {
            insert_object(
                &self.conn,
                &self.registry,
                &Object::new(object_type, id, format!("{object_type} {id}")),
            )
            .expect("insert object")
        }

        fn map(&self, actor: &Actor, a: &Object, b: &Object) -> Result<Relationship> {
            create(
                &self.conn,
                &self.registry,
                actor,
                NewRelationship::between(a, b).external(actor.is_external),
            )
        }

        fn edge_count(&self) -> i64 {
            self.conn
                .query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))
                .expect("count")
        }
    }

    const USER: Actor = Actor::internal(1);
    const INTEGRATION: Actor = Actor::external(99);

    #[test]
    fn create_then_find_related_in_both_directions() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let objective = fx.object("Objective", 3);

        let rel = fx.map(&USER, &control, &objective).expect("create");
        assert_eq!(rel.display_name(), "Control:1 <-> Objective:3");
        assert_eq!(rel.modified_by_id, Some(1));
        assert!(!rel.is_external);

        let forward = find_related(&fx.conn, &control, &objective).expect("query");
        let backward = find_related(&fx.conn, &objective, &control).expect("query");
        assert_eq!(forward.as_ref().map(|r| r.id), Some(rel.id));
        assert_eq!(backward.map(|r| r.id), Some(rel.id));
        assert_eq!(get(&fx.conn, rel.id).expect("get"), forward);
    }

    #[test]
    fn missing_endpoint_is_rejected_without_a_row() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);

        let err = create(
            &fx.conn,
            &fx.registry,
            &USER,
            NewRelationship {
                destination: Some(&control),
                ..NewRelationship::default()
            },
        )
        .expect_err("no source");
        assert_eq!(err.to_string(), "Relationship.source can't be None.");

        let err = create(
            &fx.conn,
            &fx.registry,
            &USER,
            NewRelationship {
                source: Some(&control),
                ..NewRelationship::default()
            },
        )
        .expect_err("no destination");
        assert_eq!(err.to_string(), "Relationship.destination can't be None.");
        assert_eq!(fx.edge_count(), 0);
    }

    #[test]
    fn non_relatable_type_is_rejected() {
        let mut fx = Fixture::new();
        fx.registry.register(NodeType::plain("Widget"));
        let control = fx.object("Control", 1);
        let widget = fx.object("Widget", 1);

        let err = fx.map(&USER, &control, &widget).expect_err("plain type");
        assert_eq!(
            err.to_string(),
            "You are trying to create relationship with not Relatable type: Widget"
        );
        assert_eq!(fx.edge_count(), 0);
    }

    #[test]
    fn unsaved_endpoint_is_rejected() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let ghost = Object::new("Objective", 404, "never saved");

        let err = fx.map(&USER, &control, &ghost).expect_err("ghost");
        assert!(err.is_validation());
        assert!(err.to_string().contains("Objective#404"));
    }

    #[test]
    fn control_regulation_requires_external_actor() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let regulation = fx.object("Regulation", 2);

        let err = fx.map(&USER, &control, &regulation).expect_err("restricted pair");
        assert!(err.is_validation());
        assert!(err.to_string().contains("regulations"), "got: {err}");
        assert_eq!(fx.edge_count(), 0);

        let rel = fx.map(&INTEGRATION, &control, &regulation).expect("external create");
        assert!(rel.is_external);
    }

    #[test]
    fn duplicate_pair_is_conflict() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let objective = fx.object("Objective", 3);
        fx.map(&USER, &control, &objective).expect("first");

        let err = fx.map(&USER, &control, &objective).expect_err("second");
        assert!(matches!(err, GraphError::Conflict(_)), "got {err:?}");
        assert_eq!(fx.edge_count(), 1);

        fx.map(&USER, &objective, &control).expect("reverse pair is distinct");
    }

    #[test]
    fn snapshot_cannot_relate_to_its_origin() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let audit = fx.object("Audit", 7);
        let snapshot = insert_object(
            &fx.conn,
            &fx.registry,
            &Object::snapshot_of(10, control.stub()),
        )
        .expect("snapshot");

        let err = fx.map(&USER, &snapshot, &control).expect_err("origin pair");
        assert_eq!(
            err.to_string(),
            "Invalid source-destination types pair for Relationship: \
             source_type='Snapshot', destination_type='Control'"
        );
        assert!(fx.map(&USER, &control, &snapshot).is_err());

        // A caller holding a bare Snapshot value still hits the guard.
        let mut bare = snapshot.clone();
        bare.child = None;
        assert!(fx.map(&USER, &control, &bare).is_err());

        fx.map(&USER, &audit, &snapshot).expect("unrelated pair");
    }

    #[test]
    fn snapshot_guard_ignores_a_stale_child_value() {
        let fx = Fixture::new();
        let origin = fx.object("Control", 1);
        fx.object("Control", 2);
        let snapshot = insert_object(
            &fx.conn,
            &fx.registry,
            &Object::snapshot_of(10, origin.stub()),
        )
        .expect("snapshot");

        let mut stale = snapshot;
        stale.child = Some(Stub::new("Control", 2));
        let before = fx.edge_count();

        let err = fx.map(&USER, &stale, &origin).expect_err("stored child wins");
        assert!(matches!(err, GraphError::Validation(_)));
        assert!(fx.map(&USER, &origin, &stale).is_err());
        assert_eq!(fx.edge_count(), before);
    }

    #[test]
    fn external_actor_deletes_only_external_edges() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let objective = fx.object("Objective", 3);
        let issue = fx.object("Issue", 4);

        let internal = fx.map(&USER, &control, &objective).expect("internal edge");
        let external = fx.map(&INTEGRATION, &control, &issue).expect("external edge");

        let err = delete(&fx.conn, &fx.registry, &INTEGRATION, internal.id)
            .expect_err("external deleting internal");
        assert_eq!(
            err.to_string(),
            "External application can delete only external relationships."
        );
        assert!(get(&fx.conn, internal.id).expect("get").is_some());

        delete(&fx.conn, &fx.registry, &INTEGRATION, external.id).expect("external delete");
        delete(&fx.conn, &fx.registry, &USER, internal.id).expect("internal delete");
        assert_eq!(fx.edge_count(), 0);

        let err = delete(&fx.conn, &fx.registry, &USER, internal.id).expect_err("gone");
        assert!(matches!(err, GraphError::NotFound { kind: "relationship", .. }));
    }

    #[test]
    fn restricted_pair_cannot_be_unmapped_internally() {
        let fx = Fixture::new();
        let system = fx.object("System", 1);
        let standard = fx.object("Standard", 2);
        let rel = fx.map(&INTEGRATION, &system, &standard).expect("external create");

        let err = delete(&fx.conn, &fx.registry, &USER, rel.id).expect_err("restricted");
        assert!(err.to_string().contains("scoping objects to directives"));
        assert_eq!(fx.edge_count(), 1);
    }

    #[test]
    fn endpoints_resolve_through_registry() {
        let mut fx = Fixture::new();
        let control = fx.object("Control", 1);
        let objective = fx.object("Objective", 3);
        let rel = fx.map(&USER, &control, &objective).expect("create");

        assert_eq!(
            source(&fx.conn, &fx.registry, &rel).expect("source"),
            Some(control.clone())
        );
        assert_eq!(
            get_related_for(&fx.conn, &fx.registry, &rel, "Control").expect("related"),
            Some(objective)
        );
        assert_eq!(
            get_related_for(&fx.conn, &fx.registry, &rel, "Risk").expect("related"),
            None
        );

        fx.registry.register(NodeType::plain("Objective"));
        assert_eq!(
            destination(&fx.conn, &fx.registry, &rel).expect("destination"),
            None
        );
    }

    #[test]
    fn deleting_object_cascades_edges() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let objective = fx.object("Objective", 3);
        let issue = fx.object("Issue", 4);
        fx.map(&USER, &control, &objective).expect("edge");
        fx.map(&USER, &issue, &control).expect("edge");
        fx.map(&USER, &issue, &objective).expect("edge");

        let removed =
            delete_object(&fx.conn, &fx.registry, &USER, &control.stub()).expect("cascade");
        assert_eq!(removed.len(), 2);
        assert_eq!(fx.edge_count(), 1);
        assert!(!object_exists(&fx.conn, &control.stub()).expect("exists"));
    }

    #[test]
    fn object_cascade_is_all_or_nothing() {
        let fx = Fixture::new();
        let control = fx.object("Control", 1);
        let objective = fx.object("Objective", 3);
        let regulation = fx.object("Regulation", 2);
        fx.map(&USER, &control, &objective).expect("edge");
        fx.map(&INTEGRATION, &control, &regulation).expect("edge");

        let err = delete_object(&fx.conn, &fx.registry, &USER, &control.stub())
            .expect_err("restricted edge blocks cascade");
        assert!(err.is_validation());
        assert_eq!(fx.edge_count(), 2);
        assert!(object_exists(&fx.conn, &control.stub()).expect("exists"));
    }
}
