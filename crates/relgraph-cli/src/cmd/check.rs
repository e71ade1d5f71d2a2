//! `relg check`: dry-run the type-pair mapping policy.

use super::ActorOverrides;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use relgraph_core::TypeRegistry;
use relgraph_core::config::ProjectConfig;
use relgraph_core::relationship::validate_relation_by_type;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Source type name.
    pub source_type: String,
    /// Destination type name.
    pub destination_type: String,
}

#[derive(Debug, Serialize)]
struct Verdict<'a> {
    source_type: &'a str,
    destination_type: &'a str,
    external: bool,
    allowed: bool,
}

/// Does not need a store: only the registry and actor are consulted.
pub fn run_check(
    args: &CheckArgs,
    output: OutputMode,
    config: &ProjectConfig,
    overrides: ActorOverrides,
) -> Result<()> {
    let registry = TypeRegistry::from_config(&config.registry);
    let actor = overrides.resolve(config);
    validate_relation_by_type(&registry, &actor, &args.source_type, &args.destination_type)?;

    let verdict = Verdict {
        source_type: &args.source_type,
        destination_type: &args.destination_type,
        external: actor.is_external,
        allowed: true,
    };
    render(output, &verdict, |v, w| {
        writeln!(w, "✓ {} -> {} allowed", v.source_type, v.destination_type)
    })
}
