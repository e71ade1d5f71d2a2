//! `relg edges`: list relationships matching a type/id pattern in either
//! direction.

use super::{ActorOverrides, open_project};
use crate::output::{OutputMode, render_list};
use anyhow::Result;
use clap::Args;
use relgraph_core::config::ProjectConfig;
use relgraph_core::relationship::get_related_query_by_type_id;
use std::path::Path;

#[derive(Args, Debug)]
pub struct EdgesArgs {
    /// First endpoint type.
    #[arg(long)]
    pub type1: Option<String>,
    /// First endpoint id.
    #[arg(long)]
    pub id1: Option<i64>,
    /// Second endpoint type.
    #[arg(long)]
    pub type2: Option<String>,
    /// Second endpoint id.
    #[arg(long)]
    pub id2: Option<i64>,
    /// Match nothing unless all four parts are given.
    #[arg(long)]
    pub strict: bool,
}

pub fn run_edges(
    args: &EdgesArgs,
    output: OutputMode,
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let project = open_project(project_root, config, overrides)?;
    let query = get_related_query_by_type_id(
        args.type1.as_deref(),
        args.id1,
        args.type2.as_deref(),
        args.id2,
        args.strict,
    );
    let edges = query.all(&project.conn)?;
    render_list(&edges, output)?;
    Ok(())
}
