//! `relg related`: objects on the other end of an object's edges.

use super::{ActorOverrides, open_project};
use crate::output::{OutputMode, render_list};
use anyhow::Result;
use clap::Args;
use relgraph_core::config::ProjectConfig;
use relgraph_core::{Object, Relatable, Stub};
use std::path::Path;

#[derive(Args, Debug)]
pub struct RelatedArgs {
    /// Object reference (`Type#id`).
    pub stub: Stub,
    /// Only return objects of these types (repeatable).
    #[arg(long = "type", value_name = "TYPE")]
    pub types: Vec<String>,
}

pub fn run_related(
    args: &RelatedArgs,
    output: OutputMode,
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let project = open_project(project_root, config, overrides)?;
    let related = args
        .stub
        .related_objects(&project.conn, &project.registry, Some(args.types.as_slice()))?;

    let mut objects: Vec<Object> = related.into_iter().collect();
    objects.sort_by(|a, b| (&a.object_type, a.id).cmp(&(&b.object_type, b.id)));
    render_list(&objects, output)?;
    Ok(())
}
