use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use stockroom_core::Store;
use stockroom_core::config::{
    self, ProjectConfig, STOCKROOM_DIR, load_project_config, write_project_config,
};
use stockroom_core::db::migrations::current_schema_version;

use super::Context;
use crate::output::{pretty_kv, render};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite `.stockroom/config.toml` with defaults even if it exists.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "*.sqlite3\n*.sqlite3-wal\n*.sqlite3-shm\n";

#[derive(Debug, Serialize)]
struct InitReport {
    config_path: PathBuf,
    store_path: PathBuf,
    schema_version: u32,
    wrote_config: bool,
}

/// Execute `sr init`. Creates the project skeleton and the store:
///
/// ```text
/// .stockroom/
///   config.toml         (default project config)
///   .gitignore          (database files)
///   stockroom.sqlite3   (created and migrated)
/// ```
///
/// Running it again is safe: an existing config is kept unless `--force`
/// is given, and the store is only migrated forward.
///
/// # Errors
///
/// Returns an error if any filesystem operation or the store open fails.
pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let config_path = config::project_config_path(&ctx.root);
    let wrote_config = args.force || !config_path.exists();
    if wrote_config {
        write_project_config(&ctx.root, &ProjectConfig::default())?;
    }

    let gitignore = ctx.root.join(STOCKROOM_DIR).join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, GITIGNORE)
            .with_context(|| format!("Failed to write {}", gitignore.display()))?;
    }

    let project = load_project_config(&ctx.root)?;
    let store_path = project.store_path(&ctx.root);
    let store = Store::open(&store_path)
        .with_context(|| format!("Failed to create store {}", store_path.display()))?;
    let schema_version = current_schema_version(store.conn())?;

    let report = InitReport {
        config_path,
        store_path,
        schema_version,
        wrote_config,
    };
    render(ctx.output, &report, |r, w| {
        writeln!(w, "Initialized stockroom in {}", ctx.root.display())?;
        pretty_kv(w, "Config", r.config_path.display().to_string())?;
        pretty_kv(w, "Store", r.store_path.display().to_string())?;
        pretty_kv(w, "Schema", format!("v{}", r.schema_version))
    })
}
