//! `relg neighbors`: bulk neighbor lookup through [`RelationshipsCache`].

use super::{ActorOverrides, open_project};
use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::Result;
use clap::Args;
use relgraph_core::config::ProjectConfig;
use relgraph_core::{RelationshipsCache, Stub};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct NeighborsArgs {
    /// Object references (`Type#id`).
    #[arg(required = true)]
    pub stubs: Vec<Stub>,
    /// Only count neighbors of these types (repeatable).
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,
}

#[derive(Debug, Serialize)]
struct NeighborRow {
    object: Stub,
    neighbors: Vec<Stub>,
}

pub fn run_neighbors(
    args: &NeighborsArgs,
    output: OutputMode,
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let project = open_project(project_root, config, overrides)?;

    let mut cache = RelationshipsCache::new();
    let rows_read = cache.populate_cache(&project.conn, &args.stubs, Some(args.types.as_slice()))?;
    tracing::debug!(rows_read, keys = cache.len(), "populated neighbor cache");

    let mut requested = args.stubs.clone();
    requested.sort();
    requested.dedup();
    let rows: Vec<NeighborRow> = requested
        .into_iter()
        .map(|object| {
            let mut neighbors: Vec<Stub> = cache.neighbors(&object).cloned().collect();
            neighbors.sort();
            NeighborRow { object, neighbors }
        })
        .collect();

    render_mode(
        output,
        &rows,
        |rows, w| {
            for row in rows {
                let list: Vec<String> = row.neighbors.iter().map(ToString::to_string).collect();
                writeln!(w, "{}  {}", row.object, list.join(","))?;
            }
            Ok(())
        },
        |rows, w| {
            for row in rows {
                let list: Vec<String> = row.neighbors.iter().map(ToString::to_string).collect();
                let shown = if list.is_empty() {
                    "(none)".to_string()
                } else {
                    list.join(", ")
                };
                pretty_kv(w, &row.object.to_string(), shown)?;
            }
            Ok(())
        },
    )
}
