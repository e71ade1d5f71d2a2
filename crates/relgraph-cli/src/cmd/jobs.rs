//! `relg jobs`: import/export job bookkeeping for the acting user.

use super::{ActorOverrides, open_project};
use crate::output::{OutputMode, render, render_item, render_list};
use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use relgraph_core::config::ProjectConfig;
use relgraph_core::jobs::{self, JobStatus, JobType, NewJob};
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommand,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// Record a new job in `Not Started`.
    Create {
        /// `import` or `export`.
        #[arg(long = "type", default_value = "import")]
        job_type: JobType,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Clear pending imports first; fails while one is running.
        #[arg(long)]
        replace: bool,
    },
    /// List your jobs of one type.
    List {
        #[arg(long = "type", default_value = "import")]
        job_type: JobType,
        /// Restrict to these job ids (repeatable).
        #[arg(long = "id", value_name = "ID")]
        ids: Vec<i64>,
    },
    /// Show one job.
    Show { id: i64 },
    /// Move a job to a new status, e.g. `"In Progress"` or `in-progress`.
    Status { id: i64, status: JobStatus },
    /// Replace a job's results with a JSON document.
    Results {
        id: i64,
        #[arg(id = "results_json", value_name = "JSON")]
        json: String,
    },
    /// Delete your imports that are `Not Started` or `Blocked`.
    Clear,
}

#[derive(Debug, Serialize)]
struct Cleared {
    removed: usize,
}

pub fn run_jobs(
    args: &JobsArgs,
    output: OutputMode,
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let project = open_project(project_root, config, overrides)?;
    let conn = &project.conn;
    let actor = &project.actor;

    match &args.command {
        JobsCommand::Create {
            job_type,
            title,
            description,
            replace,
        } => {
            if *replace && *job_type == JobType::Import {
                jobs::delete_previous_imports(conn, actor)?;
            }
            let job = jobs::create_job(
                conn,
                actor,
                NewJob {
                    job_type: Some(*job_type),
                    title: title.clone(),
                    description: description.clone(),
                    ..NewJob::default()
                },
            )?;
            render_item(&job.log_json()?, output)?;
        }
        JobsCommand::List { job_type, ids } => {
            let logs = jobs::get_jobs(conn, actor, *job_type, Some(ids.as_slice()))?;
            render_list(&logs, output)?;
        }
        JobsCommand::Show { id } => {
            let job = jobs::get(conn, actor, *id)?;
            render_item(&job.log_json()?, output)?;
        }
        JobsCommand::Status { id, status } => {
            let job = jobs::update_status(conn, actor, *id, *status)?;
            render_item(&job.log_json()?, output)?;
        }
        JobsCommand::Results { id, json } => {
            let value: serde_json::Value =
                serde_json::from_str(json).context("results must be a JSON document")?;
            let job = jobs::set_results(conn, actor, *id, &value)?;
            render_item(&job.log_json()?, output)?;
        }
        JobsCommand::Clear => {
            let removed = jobs::delete_previous_imports(conn, actor)?;
            render(output, &Cleared { removed }, |c, w| {
                writeln!(w, "✓ Removed {} pending import(s)", c.removed)
            })?;
        }
    }
    Ok(())
}
