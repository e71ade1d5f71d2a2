//! Edges derived from an existing edge by a mapping rule.
//!
//! A derived edge points back at the edge that triggered it through
//! `parent_id` and at the [`Automapping`] record through `automapping_id`.
//! Removing the parent only clears `parent_id` on its children; removing
//! the automapping record removes the derived edges with it.

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use super::{
    NewRelationship, RELATIONSHIP_COLUMNS, Relationship, create, find_related,
    row_to_relationship,
};
use crate::context::Actor;
use crate::db::{in_savepoint, now_us};
use crate::error::Result;
use crate::model::Object;
use crate::registry::TypeRegistry;

/// One run of a mapping rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Automapping {
    pub id: i64,
    /// The edge that triggered the rule; cleared when that edge is deleted.
    pub relationship_id: Option<i64>,
    pub source_type: String,
    pub source_id: i64,
    pub destination_type: String,
    pub destination_id: i64,
    pub modified_by_id: Option<i64>,
    pub created_at_us: i64,
}

/// Create an edge between `source` and `destination` derived from `parent`.
///
/// Returns `Ok(None)` without writing anything when the two objects are
/// already related in either direction.
///
/// # Errors
///
/// Any [`create`] validation failure; nothing is persisted in that case.
pub fn create_derived(
    conn: &Connection,
    registry: &TypeRegistry,
    actor: &Actor,
    parent: &Relationship,
    source: &Object,
    destination: &Object,
) -> Result<Option<Relationship>> {
    in_savepoint(conn, "automapping_create", || {
        if let Some(existing) = find_related(conn, source, destination)? {
            tracing::debug!(
                parent_id = parent.id,
                existing = existing.id,
                "skipping automapping for already related pair"
            );
            return Ok(None);
        }

        let now = now_us();
        conn.execute(
            "INSERT INTO automappings (
                relationship_id, source_type, source_id,
                destination_type, destination_id, modified_by_id, created_at_us
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                parent.id,
                parent.source_type,
                parent.source_id,
                parent.destination_type,
                parent.destination_id,
                actor.user_id,
                now
            ],
        )?;
        let automapping_id = conn.last_insert_rowid();

        let derived = create(
            conn,
            registry,
            actor,
            NewRelationship {
                source: Some(source),
                destination: Some(destination),
                is_external: parent.is_external,
                parent_id: Some(parent.id),
                automapping_id: Some(automapping_id),
            },
        )?;

        tracing::debug!(
            parent_id = parent.id,
            automapping_id,
            edge = %derived.display_name(),
            "created derived relationship"
        );
        Ok(Some(derived))
    })
}

/// Edges whose `parent_id` is `parent_id`, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn children_of(conn: &Connection, parent_id: i64) -> Result<Vec<Relationship>> {
    let sql = format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM relationships \
         WHERE parent_id = ?1 ORDER BY relationship_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([parent_id], row_to_relationship)?;

    let mut children = Vec::new();
    for row in rows {
        children.push(row?);
    }
    Ok(children)
}

/// Fetch one automapping record.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_automapping(conn: &Connection, id: i64) -> Result<Option<Automapping>> {
    let automapping = conn
        .query_row(
            "SELECT automapping_id, relationship_id, source_type, source_id,
                    destination_type, destination_id, modified_by_id, created_at_us
             FROM automappings WHERE automapping_id = ?1",
            [id],
            |row| {
                Ok(Automapping {
                    id: row.get(0)?,
                    relationship_id: row.get(1)?,
                    source_type: row.get(2)?,
                    source_id: row.get(3)?,
                    destination_type: row.get(4)?,
                    destination_id: row.get(5)?,
                    modified_by_id: row.get(6)?,
                    created_at_us: row.get(7)?,
                })
            },
        )
        .optional()?;
    Ok(automapping)
}
