//! Direction-agnostic edge lookups.

use rusqlite::types::{Type, Value};
use rusqlite::{Connection, params_from_iter};

use super::{RELATIONSHIP_COLUMNS, Relationship, row_to_relationship};
use crate::error::Result;

/// A lookup for edges between two (possibly partially specified) objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelatedQuery {
    /// Matches no rows. Produced when the inputs cannot identify a pair.
    Nothing,
    /// `(type1, id1) -> (type2, id2)` or the reverse. An absent id matches
    /// any id of that type.
    Match {
        type1: String,
        id1: Option<i64>,
        type2: String,
        id2: Option<i64>,
    },
}

/// Build a query for edges between `(type1, id1)` and `(type2, id2)` in
/// either direction.
///
/// With `strict_id`, both ids are required. A missing type always yields
/// [`RelatedQuery::Nothing`]. Without `strict_id`, a missing id drops that
/// id predicate so the match is by type alone.
#[must_use]
pub fn get_related_query_by_type_id(
    type1: Option<&str>,
    id1: Option<i64>,
    type2: Option<&str>,
    id2: Option<i64>,
    strict_id: bool,
) -> RelatedQuery {
    let (Some(type1), Some(type2)) = (type1, type2) else {
        return RelatedQuery::Nothing;
    };
    if strict_id && (id1.is_none() || id2.is_none()) {
        return RelatedQuery::Nothing;
    }

    RelatedQuery::Match {
        type1: type1.to_string(),
        id1,
        type2: type2.to_string(),
        id2,
    }
}

impl RelatedQuery {
    #[must_use]
    pub const fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// All matching edges, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all(&self, conn: &Connection) -> Result<Vec<Relationship>> {
        self.fetch(conn, None)
    }

    /// The oldest matching edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn first(&self, conn: &Connection) -> Result<Option<Relationship>> {
        Ok(self.fetch(conn, Some(1))?.into_iter().next())
    }

    /// Number of matching edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the count does not fit `usize`.
    pub fn count(&self, conn: &Connection) -> Result<usize> {
        let Some((clause, values)) = self.where_clause() else {
            return Ok(0);
        };
        let sql = format!("SELECT COUNT(*) FROM relationships WHERE {clause}");
        let count: i64 = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        row_count(count)
    }

    fn fetch(&self, conn: &Connection, limit: Option<u32>) -> Result<Vec<Relationship>> {
        let Some((clause, values)) = self.where_clause() else {
            return Ok(Vec::new());
        };

        let mut sql = format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM relationships WHERE {clause} \
             ORDER BY relationship_id"
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), row_to_relationship)?;

        let mut relationships = Vec::new();
        for row in rows {
            relationships.push(row?);
        }
        Ok(relationships)
    }

    /// `(forward) OR (reverse)` with positional parameters, or `None` for
    /// [`RelatedQuery::Nothing`].
    fn where_clause(&self) -> Option<(String, Vec<Value>)> {
        let Self::Match {
            type1,
            id1,
            type2,
            id2,
        } = self
        else {
            return None;
        };

        let mut values = Vec::new();
        let forward = predicate(&mut values, type1, *id1, type2, *id2);
        let reverse = predicate(&mut values, type2, *id2, type1, *id1);
        Some((format!("({forward}) OR ({reverse})"), values))
    }
}

fn predicate(
    values: &mut Vec<Value>,
    src_type: &str,
    src_id: Option<i64>,
    dst_type: &str,
    dst_id: Option<i64>,
) -> String {
    let mut filters = Vec::with_capacity(4);

    values.push(Value::Text(src_type.to_string()));
    filters.push(format!("source_type = ?{}", values.len()));
    values.push(Value::Text(dst_type.to_string()));
    filters.push(format!("destination_type = ?{}", values.len()));

    if let Some(id) = src_id {
        values.push(Value::Integer(id));
        filters.push(format!("source_id = ?{}", values.len()));
    }
    if let Some(id) = dst_id {
        values.push(Value::Integer(id));
        filters.push(format!("destination_id = ?{}", values.len()));
    }

    filters.join(" AND ")
}

fn row_count(raw: i64) -> Result<usize> {
    usize::try_from(raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error)).into()
    })
}
