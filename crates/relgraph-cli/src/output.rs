//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: pretty output for humans, compact text for agents, or stable JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` flag
//! 2. `--json`, `FORMAT`, then the user config `output` key (see
//!    [`relgraph_core::config::resolve_config`])
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.
//!
//! # Rendering approaches
//!
//! ```ignore
//! render_item(&object, mode)
//! render_list(&relationships, mode)
//! render_mode(mode, &value, text_fn, pretty_fn)
//! ```

use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use relgraph_core::jobs::JobLog;
use relgraph_core::{GraphError, Object, Relationship};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, visual framing).
    Pretty,
    /// Token-efficient plain text for agents and pipes.
    Text,
    /// Machine-readable JSON (one object per result, or a JSON array).
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Core resolution logic, separated from I/O for testability.
///
/// `resolved` is the normalized `pretty|text|json` string produced by the
/// config layer; anything else falls back to text.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, resolved: &str) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }
    match resolved {
        "json" => OutputMode::Json,
        "pretty" => OutputMode::Pretty,
        _ => OutputMode::Text,
    }
}

/// Trait implemented by any CLI result type that can be rendered in all modes.
///
/// `render_table` is reused for text mode rows in agent-friendly output.
/// The [`render_item`] and [`render_list`] free functions dispatch to the
/// appropriate method based on [`OutputMode`].
pub trait Renderable {
    /// Render for human consumption.
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Render as a single self-contained JSON value.
    fn render_json(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Render as a single text row (no header; see [`table_headers`]).
    ///
    /// [`table_headers`]: Renderable::table_headers
    fn render_table(&self, w: &mut dyn Write) -> io::Result<()>;

    /// Column headers for text mode, in the same order as [`render_table`] fields.
    ///
    /// [`render_table`]: Renderable::render_table
    fn table_headers() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

/// Render a single [`Renderable`] item to stdout using the given output mode.
pub fn render_item<R: Renderable>(item: &R, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Pretty => item.render_human(&mut out),
        OutputMode::Text => item.render_table(&mut out),
        OutputMode::Json => {
            item.render_json(&mut out)?;
            writeln!(out)
        }
    }
}

/// Render a list of [`Renderable`] items to stdout.
///
/// - In JSON mode, wraps items in a JSON array.
/// - In text mode, prints a header row followed by one row per item.
pub fn render_list<R: Renderable>(items: &[R], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Pretty => {
            for item in items {
                item.render_human(&mut out)?;
            }
        }
        OutputMode::Text => {
            if !items.is_empty() {
                writeln!(out, "{}", R::table_headers().join("  "))?;
            }
            for item in items {
                item.render_table(&mut out)?;
            }
        }
        OutputMode::Json => {
            write!(out, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(out, ",")?;
                }
                writeln!(out)?;
                item.render_json(&mut out)?;
            }
            writeln!(out, "\n]")?;
        }
    }
    Ok(())
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Render a serializable value; text and pretty share `human_fn`.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => human_fn(value, &mut out)?,
    }
    Ok(())
}

fn write_json<T: Serialize>(w: &mut dyn Write, value: &T) -> io::Result<()> {
    serde_json::to_writer(w, value).map_err(io::Error::other)
}

fn micros_to_local(us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(us).map_or_else(
        || us.to_string(),
        |ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn opt_local(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".to_string(),
        |ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

// ---------------------------------------------------------------------------
// Domain rows
// ---------------------------------------------------------------------------

impl Renderable for Object {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        pretty_section(w, &format!("{}#{}  {}", self.object_type, self.id, self.title))?;
        if let Some(child) = &self.child {
            pretty_kv(w, "Snapshot of", child.to_string())?;
        }
        pretty_kv(w, "Created", micros_to_local(self.created_at_us))?;
        pretty_kv(w, "Updated", micros_to_local(self.updated_at_us))?;
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        write_json(w, self)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let child = self.child.as_ref().map_or_else(|| "-".to_string(), ToString::to_string);
        writeln!(w, "{}  {}  {}  {}", self.object_type, self.id, child, self.title)
    }

    fn table_headers() -> &'static [&'static str] {
        &["type", "id", "child", "title"]
    }
}

impl Renderable for Relationship {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "#{:<6} {}", self.id, self.display_name())?;
        if self.is_external {
            write!(w, "  [external]")?;
        }
        if let Some(parent) = self.parent_id {
            write!(w, "  (from #{parent})")?;
        }
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        write_json(w, self)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}",
            self.id,
            self.source_stub(),
            self.destination_stub(),
            self.is_external
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["id", "source", "destination", "external"]
    }
}

impl Renderable for JobLog {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let title = self.title.as_deref().unwrap_or("(untitled)");
        pretty_section(w, &format!("Job {}  {title}", self.id))?;
        pretty_kv(w, "Type", self.job_type.as_str())?;
        pretty_kv(w, "Status", self.status.as_str())?;
        pretty_kv(w, "Created", opt_local(self.created_at))?;
        pretty_kv(w, "Started", opt_local(self.start_at))?;
        pretty_kv(w, "Ended", opt_local(self.end_at))?;
        if let Some(results) = &self.results {
            pretty_kv(w, "Results", results.to_string())?;
        }
        writeln!(w)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        write_json(w, self)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}  {}  {}  {}",
            self.id,
            self.job_type,
            self.status,
            self.title.as_deref().unwrap_or("-")
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["id", "type", "status", "title"]
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (`E####`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Create a simple error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    /// Error for a command that needs a store before `relg init` ran.
    pub fn not_initialized() -> Self {
        let code = relgraph_core::ErrorCode::NotInitialized;
        Self {
            message: code.message().to_string(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&GraphError> for CliError {
    fn from(err: &GraphError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
        }
    }
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        if let Some(graph) = err.downcast_ref::<GraphError>() {
            return graph.into();
        }
        if let Some(cli) = err.downcast_ref::<Self>() {
            return Self {
                message: cli.message.clone(),
                suggestion: cli.suggestion.clone(),
                error_code: cli.error_code.clone(),
            };
        }
        Self::new(format!("{err:#}"))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_wins_over_resolved_config() {
        assert_eq!(
            resolve_output_mode(Some(OutputMode::Text), "json"),
            OutputMode::Text
        );
    }

    #[test]
    fn resolved_strings_map_to_modes() {
        assert_eq!(resolve_output_mode(None, "json"), OutputMode::Json);
        assert_eq!(resolve_output_mode(None, "pretty"), OutputMode::Pretty);
        assert_eq!(resolve_output_mode(None, "text"), OutputMode::Text);
        assert_eq!(resolve_output_mode(None, "bogus"), OutputMode::Text);
        assert!(resolve_output_mode(None, "json").is_json());
    }

    #[test]
    fn graph_error_carries_code_and_hint() {
        let err = GraphError::Conflict("Control#1 <-> Issue#2".into());
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E3002"));
        assert!(cli.suggestion.is_some());
        assert!(cli.message.contains("already exists"));
    }

    #[test]
    fn anyhow_wrapping_keeps_graph_code() {
        let err = anyhow::Error::new(GraphError::validation("Relationship.source can't be None."));
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E3001"));
        assert_eq!(cli.message, "Relationship.source can't be None.");
    }

    #[test]
    fn anyhow_wrapping_keeps_cli_error() {
        let err = anyhow::Error::new(CliError::not_initialized());
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E1001"));
    }

    #[test]
    fn plain_anyhow_has_no_code() {
        let err = anyhow::anyhow!("boom").context("loading config");
        let cli = CliError::from(&err);
        assert!(cli.error_code.is_none());
        assert_eq!(cli.message, "loading config: boom");
    }

    #[test]
    fn object_table_row_matches_headers() {
        let object = Object::new("Control", 3, "Access review");
        let mut buf = Vec::new();
        object.render_table(&mut buf).expect("render");
        let line = String::from_utf8(buf).expect("utf8");
        assert_eq!(line, "Control  3  -  Access review\n");
        assert_eq!(Object::table_headers().len(), 4);
    }

    #[test]
    fn object_json_uses_type_key() {
        let object = Object::new("Risk", 5, "Fraud");
        let mut buf = Vec::new();
        object.render_json(&mut buf).expect("render");
        let value: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(value["type"], "Risk");
        assert_eq!(value["id"], 5);
    }
}
