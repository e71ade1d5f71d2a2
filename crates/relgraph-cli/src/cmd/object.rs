//! `relg object`: add, inspect, list, and delete graph nodes.

use super::{ActorOverrides, open_project};
use crate::output::{OutputMode, Renderable, pretty_section, render, render_item, render_list};
use anyhow::Result;
use clap::{Args, Subcommand};
use relgraph_core::config::ProjectConfig;
use relgraph_core::db::objects::{get_object, insert_object, list_objects};
use relgraph_core::relationship::{self, EagerOptions, eager_load};
use relgraph_core::{GraphError, Identifiable, Object, Relationship, Stub};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ObjectArgs {
    #[command(subcommand)]
    pub command: ObjectCommand,
}

#[derive(Subcommand, Debug)]
pub enum ObjectCommand {
    /// Store a new object.
    Add {
        /// Object type, e.g. `Control`.
        object_type: String,
        /// Numeric id, unique within the type.
        id: i64,
        /// Display title. Defaults to "<Type> <id>".
        #[arg(long)]
        title: Option<String>,
        /// Entity a snapshot was taken of (`Type#id`). Snapshots only.
        #[arg(long)]
        child: Option<Stub>,
    },
    /// Show one object and its edges.
    Show {
        /// Object reference (`Type#id`).
        stub: Stub,
    },
    /// List stored objects.
    List {
        /// Restrict to one type.
        #[arg(long = "type")]
        object_type: Option<String>,
    },
    /// Delete an object and every edge touching it.
    Rm {
        /// Object reference (`Type#id`).
        stub: Stub,
    },
}

#[derive(Debug, Serialize)]
struct ObjectDetail {
    #[serde(flatten)]
    object: Object,
    related_sources: Vec<Relationship>,
    related_destinations: Vec<Relationship>,
}

#[derive(Debug, Serialize)]
struct Removed {
    object: Stub,
    relationships: Vec<Relationship>,
}

pub fn run_object(
    args: &ObjectArgs,
    output: OutputMode,
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let project = open_project(project_root, config, overrides)?;
    let conn = &project.conn;

    match &args.command {
        ObjectCommand::Add {
            object_type,
            id,
            title,
            child,
        } => {
            let mut object = Object::new(
                object_type.as_str(),
                *id,
                title.clone().unwrap_or_else(|| format!("{object_type} {id}")),
            );
            object.child = child.clone();
            let stored = insert_object(conn, &project.registry, &object)?;
            tracing::info!(object = %stored.stub(), "object added");
            render_item(&stored, output)?;
        }
        ObjectCommand::Show { stub } => {
            let object = get_object(conn, stub)?.ok_or_else(|| GraphError::NotFound {
                kind: "object",
                key: stub.to_string(),
            })?;
            let eager = eager_load(conn, std::slice::from_ref(stub), EagerOptions::default())?;
            let detail = ObjectDetail {
                related_sources: eager.related_sources(stub).to_vec(),
                related_destinations: eager.related_destinations(stub).to_vec(),
                object,
            };
            render(output, &detail, |d, w| {
                d.object.render_human(w)?;
                pretty_section(w, "Sources")?;
                for rel in &d.related_sources {
                    rel.render_human(w)?;
                }
                pretty_section(w, "Destinations")?;
                for rel in &d.related_destinations {
                    rel.render_human(w)?;
                }
                Ok(())
            })?;
        }
        ObjectCommand::List { object_type } => {
            let objects = list_objects(conn, object_type.as_deref())?;
            render_list(&objects, output)?;
        }
        ObjectCommand::Rm { stub } => {
            let relationships =
                relationship::delete_object(conn, &project.registry, &project.actor, stub)?;
            let removed = Removed {
                object: stub.clone(),
                relationships,
            };
            render(output, &removed, |r, w| {
                writeln!(
                    w,
                    "✓ Deleted {} and {} relationship(s)",
                    r.object,
                    r.relationships.len()
                )
            })?;
        }
    }
    Ok(())
}
