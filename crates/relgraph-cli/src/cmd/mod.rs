pub mod check;
pub mod edges;
pub mod init;
pub mod jobs;
pub mod map;
pub mod neighbors;
pub mod object;
pub mod related;

use crate::output::CliError;
use anyhow::Result;
use relgraph_core::config::{PROJECT_DIR, ProjectConfig};
use relgraph_core::db::open_store_with_timeout;
use relgraph_core::{Actor, TypeRegistry};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Actor overrides from the global `--user` / `--external` flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorOverrides {
    pub user: Option<i64>,
    pub external: bool,
}

impl ActorOverrides {
    /// Apply the flags on top of the `[actor]` config section.
    pub fn resolve(self, config: &ProjectConfig) -> Actor {
        Actor {
            user_id: self.user.unwrap_or(config.actor.user_id),
            is_external: self.external || config.actor.external,
        }
    }
}

/// An opened project: migrated store, effective registry, and acting user.
pub struct Project {
    pub conn: Connection,
    pub registry: TypeRegistry,
    pub actor: Actor,
}

/// Open the store of an initialized project.
///
/// # Errors
///
/// [`CliError::not_initialized`] when `.relgraph/` is missing, or any
/// failure opening and migrating the database.
pub fn open_project(
    project_root: &Path,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<Project> {
    if !project_root.join(PROJECT_DIR).is_dir() {
        return Err(CliError::not_initialized().into());
    }

    let path = config.store_path(project_root);
    let conn = open_store_with_timeout(&path, Duration::from_millis(config.store.busy_timeout_ms))?;
    tracing::debug!(store = %path.display(), "opened store");

    Ok(Project {
        conn,
        registry: TypeRegistry::from_config(&config.registry),
        actor: overrides.resolve(config),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_actor_config() {
        let mut config = ProjectConfig::default();
        config.actor.user_id = 3;

        let actor = ActorOverrides::default().resolve(&config);
        assert_eq!(actor, Actor::internal(3));

        let actor = ActorOverrides {
            user: Some(9),
            external: true,
        }
        .resolve(&config);
        assert_eq!(actor, Actor::external(9));
    }

    #[test]
    fn config_external_cannot_be_turned_off_by_flags() {
        let mut config = ProjectConfig::default();
        config.actor.external = true;
        assert!(ActorOverrides::default().resolve(&config).is_external);
    }

    #[test]
    fn uninitialized_project_is_reported() {
        let root = tempfile::tempdir().expect("temp dir");
        let err = open_project(root.path(), &ProjectConfig::default(), ActorOverrides::default())
            .err()
            .expect("must fail");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E1001"));
    }
}
