//! `sr export`: an item's history as CSV.

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use stockroom_core::history::csv::write_history_csv;

use super::{Context, resolve_item};
use crate::output::render;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Item id or identifier.
    pub item: String,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Sibling file the export is staged in before it replaces `path`.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "export".to_string(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Run `write` against a staging file and move it over `path` only if it
/// succeeds. On failure the staging file is removed and `path` is untouched.
fn write_replacing<T>(
    path: &Path,
    write: impl FnOnce(BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let tmp = staging_path(path);
    let file = File::create(&tmp).with_context(|| format!("Failed to create {}", tmp.display()))?;
    match write(BufWriter::new(file)) {
        Ok(value) => {
            fs::rename(&tmp, path)
                .with_context(|| format!("Failed to persist {}", path.display()))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::debug!(path = %tmp.display(), error = %cleanup, "could not remove staged export");
            }
            Err(err)
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportReport {
    path: PathBuf,
    rows: usize,
}

/// Execute `sr export`. Only events that place the item somewhere become
/// rows; the header row is always written.
///
/// # Errors
///
/// Returns a not-found error for an unknown item, or a write error.
pub fn run_export(args: &ExportArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let item_id = resolve_item(&store, &args.item)?;
    let records = store.projector().project(item_id)?;

    let Some(path) = &args.output else {
        let stdout = io::stdout();
        write_history_csv(stdout.lock(), records, ctx.terms())?;
        return Ok(());
    };

    let rows = write_replacing(path, |out| {
        Ok(write_history_csv(out, records, ctx.terms())?)
    })?;
    tracing::info!(%item_id, rows, path = %path.display(), "exported history");

    let report = ExportReport {
        path: path.clone(),
        rows,
    };
    render(ctx.output, &report, |r, w| {
        writeln!(w, "✓ Wrote {} row(s) to {}", r.rows, r.path.display())
    })
}
