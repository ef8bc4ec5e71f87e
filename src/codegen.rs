//! JSON Schema document generation.
//!
//! Renders one document per target message of a [`DescriptorPool`]:
//! - the message's own schema as the document root
//! - a `definitions` section for every message, enum and well-known type it
//!   reaches
//! - an `$id` built from the configured base URL and the message's path
//!
//! The generated output is deterministic: identical input always produces
//! byte-identical output. Properties follow field declaration order and
//! definitions follow first use.
//!
//! Every document is rendered before any file is written, so a run that
//! fails leaves the output directory untouched.

use std::path::Path;

use crate::error::{Error, Result};
use crate::pool::DescriptorPool;
use crate::translate::translate_message;
use crate::type_map::schema_file_path;

/// Base URL used for `$id` when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://protoc-gen-jsonschema.cerbos.dev/";

/// Generation options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Prefix of every document's `$id`. Normalized to end with `/`.
    pub base_url: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Statistics collected during generation for reporting.
#[derive(Debug, Default)]
pub struct GenerationStats {
    pub messages_generated: usize,
    /// Definitions summed over every document.
    pub definitions_emitted: usize,
    pub files_written: usize,
}

/// A rendered schema document and where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path relative to the output directory, `/`-separated.
    pub path: String,
    /// Pretty-printed JSON with a trailing newline.
    pub content: String,
}

/// Render the schema document of every target message.
///
/// Nothing is written; the first fatal error aborts the whole run.
pub fn render(pool: &DescriptorPool, options: &Options) -> Result<Vec<RenderedFile>> {
    render_with_stats(pool, options).map(|(files, _)| files)
}

fn render_with_stats(
    pool: &DescriptorPool,
    options: &Options,
) -> Result<(Vec<RenderedFile>, GenerationStats)> {
    let base_url = normalize_base_url(&options.base_url);
    let mut stats = GenerationStats::default();
    let mut files = Vec::new();

    for message in pool.target_messages() {
        let document = translate_message(pool, message)?;
        stats.messages_generated += 1;
        stats.definitions_emitted += document.definitions.len();

        let path = schema_file_path(&message.full_name);
        let document = document.with_id(format!("{base_url}{path}"));
        let content = document.to_json_pretty()?;
        tracing::debug!(message = %message.full_name, path = %path, "rendered");
        files.push(RenderedFile { path, content });
    }

    Ok((files, stats))
}

/// Generate schema files for every target message into `output_dir`.
///
/// Returns generation statistics for reporting.
pub fn generate(
    pool: &DescriptorPool,
    output_dir: &Path,
    options: &Options,
) -> Result<GenerationStats> {
    let (files, mut stats) = render_with_stats(pool, options)?;
    if files.is_empty() {
        tracing::warn!("descriptor set has no target messages");
    }

    for file in &files {
        write_file(&output_dir.join(&file.path), &file.content)?;
        stats.files_written += 1;
    }

    Ok(stats)
}

// ── Helpers ────────────────────────────────────────────────────────────

/// Ensure a base URL ends with exactly the `/` a relative path needs.
///
/// `"https://example.com/schemas"` → `"https://example.com/schemas/"`
pub fn normalize_base_url(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    }
}

/// Write content to a file, creating parent directories as needed.
fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
