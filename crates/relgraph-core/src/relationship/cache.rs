//! Request-scoped neighbor index for bulk graph traversal.
//!
//! [`RelationshipsCache::populate_cache`] answers "who is connected to each
//! of these N objects" with a single statement. The statement is two
//! `SELECT`s joined by `UNION ALL`, one filtered on the source columns and
//! one on the destination columns, so that each half can use its own index.
//! A single `OR` across both column pairs would scan the table.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::db::{stub_set_param, stub_set_subquery};
use crate::error::Result;
use crate::model::Stub;

/// Stub → neighbor stubs, filled by [`populate_cache`](Self::populate_cache).
///
/// Only requested stubs become keys, so a key's neighbor set is always
/// complete for the type filter it was populated with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipsCache {
    cache: HashMap<Stub, HashSet<Stub>>,
}

impl RelationshipsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch all edges touching `stubs` and record their neighbors.
    ///
    /// `of_types` restricts the neighbor side to the listed types; `None`
    /// or an empty list caches every neighbor. Returns the number of edge
    /// rows read.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn populate_cache(
        &mut self,
        conn: &Connection,
        stubs: &[Stub],
        of_types: Option<&[String]>,
    ) -> Result<usize> {
        if stubs.is_empty() {
            return Ok(0);
        }

        let of_types = of_types.filter(|types| !types.is_empty());
        let requested: HashSet<&Stub> = stubs.iter().collect();
        let stub_param = stub_set_param(stubs)?;

        let (dst_filter, src_filter) = if of_types.is_some() {
            (
                " AND destination_type IN (SELECT value FROM json_each(?2))",
                " AND source_type IN (SELECT value FROM json_each(?2))",
            )
        } else {
            ("", "")
        };
        let set = stub_set_subquery(1);
        let sql = format!(
            "SELECT source_type, source_id, destination_type, destination_id
             FROM relationships
             WHERE (source_type, source_id) IN ({set}){dst_filter}
             UNION ALL
             SELECT source_type, source_id, destination_type, destination_id
             FROM relationships
             WHERE (destination_type, destination_id) IN ({set}){src_filter}"
        );

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = match of_types {
            Some(types) => stmt.query(rusqlite::params![stub_param, serde_json::to_string(types)?])?,
            None => stmt.query([stub_param])?,
        };

        let mut edges = 0_usize;
        while let Some(row) = rows.next()? {
            let src = Stub::new(row.get::<_, String>(0)?, row.get(1)?);
            let dst = Stub::new(row.get::<_, String>(2)?, row.get(3)?);
            edges += 1;

            // Only requested stubs get entries: their neighborhoods are
            // complete once every row has been seen.
            if requested.contains(&src) {
                self.cache.entry(src.clone()).or_default().insert(dst.clone());
            }
            if requested.contains(&dst) {
                self.cache.entry(dst).or_default().insert(src);
            }
        }

        tracing::debug!(
            stubs = stubs.len(),
            edges,
            keys = self.cache.len(),
            filtered = of_types.is_some(),
            "populated relationships cache"
        );
        Ok(edges)
    }

    /// Neighbor set of `stub`, if it was requested and has any neighbors.
    #[must_use]
    pub fn get(&self, stub: &Stub) -> Option<&HashSet<Stub>> {
        self.cache.get(stub)
    }

    /// Neighbors of `stub`; empty when it has none or was never requested.
    pub fn neighbors(&self, stub: &Stub) -> impl Iterator<Item = &Stub> + '_ {
        self.cache.get(stub).into_iter().flatten()
    }

    #[must_use]
    pub fn contains(&self, stub: &Stub) -> bool {
        self.cache.contains_key(stub)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<Stub, HashSet<Stub>> {
        self.cache
    }
}
