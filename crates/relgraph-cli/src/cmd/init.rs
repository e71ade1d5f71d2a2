use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::{Context as _, Result};
use clap::Args;
use relgraph_core::config::{PROJECT_DIR, load_project_config};
use relgraph_core::db::migrations::current_schema_version;
use relgraph_core::db::open_store;
use serde::Serialize;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.relgraph/config.toml` with the template.
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TOML: &str = "[store]\n\
    path = \"relgraph.db\"\n\
    busy_timeout_ms = 5000\n\
    \n\
    [registry]\n\
    # Extra types that join the scoping-object policy group.\n\
    scoping_types = []\n\
    relatable_types = []\n\
    non_relatable_types = []\n\
    \n\
    [actor]\n\
    user_id = 1\n\
    external = false\n";

const GITIGNORE: &str = "*.db\n*.db-wal\n*.db-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    store: String,
    config: String,
    schema_version: u32,
}

/// Execute `relg init`. Creates the project skeleton and migrates the store:
///
/// ```text
/// .relgraph/
///   config.toml   (default project config template)
///   .gitignore    (database files)
///   relgraph.db   (or the configured [store] path)
/// ```
///
/// Re-running on an initialized project is safe: the config is kept unless
/// `--force` is set, and migrations only apply what is pending.
///
/// # Errors
///
/// Returns an error if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let dir = project_root.join(PROJECT_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let config_path = dir.join("config.toml");
    if args.force || !config_path.exists() {
        std::fs::write(&config_path, CONFIG_TOML)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    }

    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        std::fs::write(&gitignore_path, GITIGNORE).with_context(|| {
            format!("Failed to write .gitignore: {}", gitignore_path.display())
        })?;
    }

    let config = load_project_config(project_root)?;
    let store = config.store_path(project_root);
    let conn = open_store(&store)?;
    let schema_version = current_schema_version(&conn)?;
    tracing::info!(store = %store.display(), schema_version, "initialized project");

    let report = InitReport {
        store: store.display().to_string(),
        config: config_path.display().to_string(),
        schema_version,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "store={} schema={}", r.store, r.schema_version),
        |r, w| {
            writeln!(w, "✓ Initialized {PROJECT_DIR}/")?;
            pretty_kv(w, "Store", &r.store)?;
            pretty_kv(w, "Config", &r.config)?;
            pretty_kv(w, "Schema", r.schema_version.to_string())
        },
    )
}
