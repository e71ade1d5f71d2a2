//! Node rows: the objects relationships point at.
//!
//! Edges only store `(type, id)` pairs, so resolving an endpoint means a
//! lookup here. Bulk lookups bind the whole stub set as one parameter.

use rusqlite::{Connection, OptionalExtension, params};

use super::{is_unique_violation, now_us, stub_set_param, stub_set_subquery};
use crate::error::{GraphError, Result};
use crate::model::{Object, Stub};
use crate::registry::TypeRegistry;

const OBJECT_COLUMNS: &str =
    "object_type, object_id, title, child_type, child_id, created_at_us, updated_at_us";

/// Insert a new object row.
///
/// # Errors
///
/// - `Validation` when the type is unregistered, a snapshot lacks its
///   origin (or points at a missing one), or a non-snapshot carries one.
/// - `Conflict` when an object with the same `(type, id)` exists.
pub fn insert_object(conn: &Connection, registry: &TypeRegistry, object: &Object) -> Result<Object> {
    if registry.get(&object.object_type).is_none() {
        return Err(GraphError::validation(format!(
            "Unknown object type: {}",
            object.object_type
        )));
    }

    match (&object.child, object.is_snapshot()) {
        (None, true) => {
            return Err(GraphError::validation(
                "Snapshot objects must reference the object they were taken from.",
            ));
        }
        (Some(_), false) => {
            return Err(GraphError::validation(format!(
                "Only snapshots can reference an origin object, not {}",
                object.object_type
            )));
        }
        (Some(child), true) => {
            if !object_exists(conn, child)? {
                return Err(GraphError::validation(format!(
                    "Snapshot origin {child} does not exist"
                )));
            }
        }
        (None, false) => {}
    }

    let now = now_us();
    let (child_type, child_id) = object
        .child
        .as_ref()
        .map_or((None, None), |c| (Some(c.object_type.as_str()), Some(c.id)));

    conn.execute(
        "INSERT INTO objects (object_type, object_id, title, child_type, child_id, \
         created_at_us, updated_at_us) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            object.object_type,
            object.id,
            object.title,
            child_type,
            child_id,
            now
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            GraphError::Conflict(format!("object {}#{}", object.object_type, object.id))
        } else {
            GraphError::Storage(e)
        }
    })?;

    tracing::debug!(object_type = %object.object_type, id = object.id, "inserted object");

    Ok(Object {
        created_at_us: now,
        updated_at_us: now,
        ..object.clone()
    })
}

/// Fetch one object by stub.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_object(conn: &Connection, stub: &Stub) -> Result<Option<Object>> {
    let sql = format!(
        "SELECT {OBJECT_COLUMNS} FROM objects WHERE object_type = ?1 AND object_id = ?2"
    );
    let object = conn
        .query_row(&sql, params![stub.object_type, stub.id], row_to_object)
        .optional()?;
    Ok(object)
}

/// Fetch every existing object named in `stubs` with a single query.
///
/// Missing stubs are simply absent from the result.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_objects(conn: &Connection, stubs: &[Stub]) -> Result<Vec<Object>> {
    if stubs.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {OBJECT_COLUMNS} FROM objects \
         WHERE (object_type, object_id) IN ({}) \
         ORDER BY object_type, object_id",
        stub_set_subquery(1)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([stub_set_param(stubs)?], row_to_object)?;

    let mut objects = Vec::new();
    for row in rows {
        objects.push(row?);
    }
    Ok(objects)
}

/// Check if an object exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn object_exists(conn: &Connection, stub: &Stub) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM objects WHERE object_type = ?1 AND object_id = ?2)",
        params![stub.object_type, stub.id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// List objects, optionally restricted to one type, ordered by type then id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_objects(conn: &Connection, object_type: Option<&str>) -> Result<Vec<Object>> {
    let sql = format!(
        "SELECT {OBJECT_COLUMNS} FROM objects \
         WHERE (?1 IS NULL OR object_type = ?1) \
         ORDER BY object_type, object_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![object_type], row_to_object)?;

    let mut objects = Vec::new();
    for row in rows {
        objects.push(row?);
    }
    Ok(objects)
}

/// Remove the object row only. Edges are handled by
/// [`delete_object`](crate::relationship::delete_object).
pub(crate) fn delete_object_row(conn: &Connection, stub: &Stub) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM objects WHERE object_type = ?1 AND object_id = ?2",
        params![stub.object_type, stub.id],
    )?;
    Ok(removed > 0)
}

fn row_to_object(row: &rusqlite::Row<'_>) -> rusqlite::Result<Object> {
    let child_type: Option<String> = row.get(3)?;
    let child_id: Option<i64> = row.get(4)?;
    Ok(Object {
        object_type: row.get(0)?,
        id: row.get(1)?,
        title: row.get(2)?,
        child: child_type.zip(child_id).map(|(t, id)| Stub::new(t, id)),
        created_at_us: row.get(5)?,
        updated_at_us: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn setup() -> (Connection, TypeRegistry) {
        (open_in_memory().expect("open store"), TypeRegistry::builtin())
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let (conn, registry) = setup();
        let saved = insert_object(&conn, &registry, &Object::new("Control", 1, "Access reviews"))
            .expect("insert");
        assert!(saved.created_at_us > 0);

        let loaded = get_object(&conn, &Stub::new("Control", 1))
            .expect("query")
            .expect("object exists");
        assert_eq!(loaded, saved);
        assert!(get_object(&conn, &Stub::new("Control", 2)).expect("query").is_none());
    }

    #[test]
    fn duplicate_insert_is_conflict() {
        let (conn, registry) = setup();
        insert_object(&conn, &registry, &Object::new("Risk", 5, "Fraud")).expect("insert");
        let err = insert_object(&conn, &registry, &Object::new("Risk", 5, "Again"))
            .expect_err("duplicate must fail");
        assert!(matches!(err, GraphError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let (conn, registry) = setup();
        let err = insert_object(&conn, &registry, &Object::new("Gizmo", 1, "?"))
            .expect_err("unknown type must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn snapshot_requires_existing_origin() {
        let (conn, registry) = setup();

        let mut bare = Object::new("Snapshot", 1, "bare");
        bare.child = None;
        assert!(insert_object(&conn, &registry, &bare)
            .expect_err("snapshot without origin")
            .is_validation());

        let dangling = Object::snapshot_of(1, Stub::new("Control", 77));
        assert!(insert_object(&conn, &registry, &dangling)
            .expect_err("missing origin")
            .is_validation());

        insert_object(&conn, &registry, &Object::new("Control", 77, "c")).expect("origin");
        let saved = insert_object(&conn, &registry, &dangling).expect("snapshot insert");
        assert_eq!(saved.child, Some(Stub::new("Control", 77)));

        let mut wrong = Object::new("Control", 2, "not a snapshot");
        wrong.child = Some(Stub::new("Control", 77));
        assert!(insert_object(&conn, &registry, &wrong)
            .expect_err("child on plain object")
            .is_validation());
    }

    #[test]
    fn get_objects_fetches_batch_and_skips_missing() {
        let (conn, registry) = setup();
        for id in 1..=3 {
            insert_object(&conn, &registry, &Object::new("Control", id, format!("c{id}")))
                .expect("insert");
        }
        insert_object(&conn, &registry, &Object::new("Risk", 1, "r1")).expect("insert");

        let found = get_objects(
            &conn,
            &[
                Stub::new("Control", 3),
                Stub::new("Risk", 1),
                Stub::new("Control", 99),
            ],
        )
        .expect("batch get");
        let stubs: Vec<String> = found.iter().map(|o| format!("{}#{}", o.object_type, o.id)).collect();
        assert_eq!(stubs, vec!["Control#3", "Risk#1"]);

        assert!(get_objects(&conn, &[]).expect("empty").is_empty());
    }

    #[test]
    fn list_objects_filters_by_type() {
        let (conn, registry) = setup();
        insert_object(&conn, &registry, &Object::new("Control", 2, "b")).expect("insert");
        insert_object(&conn, &registry, &Object::new("Control", 1, "a")).expect("insert");
        insert_object(&conn, &registry, &Object::new("Risk", 1, "r")).expect("insert");

        assert_eq!(list_objects(&conn, None).expect("list").len(), 3);
        let controls = list_objects(&conn, Some("Control")).expect("list");
        assert_eq!(
            controls.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }
}
