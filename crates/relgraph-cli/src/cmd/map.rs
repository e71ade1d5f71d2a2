//! `relg map` / `relg unmap`: create and delete relationships.

use super::{ActorOverrides, Project, open_project};
use crate::output::{OutputMode, render, render_item};
use anyhow::Result;
use clap::Args;
use relgraph_core::config::ProjectConfig;
use relgraph_core::db::objects::get_object;
use relgraph_core::relationship::{self, NewRelationship, automapping};
use relgraph_core::{GraphError, Object, Stub};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Source object (`Type#id`).
    pub source: Stub,
    /// Destination object (`Type#id`).
    pub destination: Stub,
    /// Mark the edge as owned by an external application.
    #[arg(long)]
    pub external: bool,
    /// Record the edge as derived from relationship `<ID>`.
    #[arg(long, value_name = "ID")]
    pub derived_from: Option<i64>,
}

#[derive(Args, Debug)]
pub struct UnmapArgs {
    /// Relationship id.
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct Skipped {
    skipped: bool,
    reason: &'static str,
}

/// Load `stub`, or stand in an unsaved placeholder so that `create`
/// reports the missing endpoint with its own message.
fn endpoint(project: &Project, stub: &Stub) -> Result<Object> {
    Ok(get_object(&project.conn, stub)?
        .unwrap_or_else(|| Object::new(stub.object_type.as_str(), stub.id, String::new())))
}

pub fn run_map(
    args: &MapArgs,
    output: OutputMode,
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let project = open_project(project_root, config, overrides)?;
    let source = endpoint(&project, &args.source)?;
    let destination = endpoint(&project, &args.destination)?;

    if let Some(parent_id) = args.derived_from {
        let parent = relationship::get(&project.conn, parent_id)?.ok_or_else(|| {
            GraphError::NotFound {
                kind: "relationship",
                key: parent_id.to_string(),
            }
        })?;
        return match automapping::create_derived(
            &project.conn,
            &project.registry,
            &project.actor,
            &parent,
            &source,
            &destination,
        )? {
            Some(created) => Ok(render_item(&created, output)?),
            None => render(
                output,
                &Skipped {
                    skipped: true,
                    reason: "already related",
                },
                |_, w| writeln!(w, "{} and {} are already related", args.source, args.destination),
            ),
        };
    }

    let request = NewRelationship::between(&source, &destination)
        .external(args.external || project.actor.is_external);
    let created =
        relationship::create(&project.conn, &project.registry, &project.actor, request)?;
    tracing::info!(relationship_id = created.id, edge = %created.display_name(), "mapped");
    render_item(&created, output)?;
    Ok(())
}

pub fn run_unmap(
    args: &UnmapArgs,
    output: OutputMode,
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let project = open_project(project_root, config, overrides)?;
    let removed =
        relationship::delete(&project.conn, &project.registry, &project.actor, args.id)?;
    render(output, &removed, |r, w| {
        writeln!(w, "✓ Unmapped #{} {}", r.id, r.display_name())
    })
}
