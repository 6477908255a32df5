//! `sr delete` / `sr restore`: soft-delete an item and bring it back.
//!
//! Deleted items keep their full history and stay resolvable; they are
//! hidden from the default listing and refuse tracking and updates.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stockroom_core::{EventId, ItemId};

use super::{Context, resolve_item};
use crate::output::render_mode;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Item id or identifier.
    pub item: String,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Item id or identifier.
    pub item: String,
}

#[derive(Debug, Serialize)]
struct DeleteReport {
    item_id: ItemId,
    event_id: EventId,
    deleted: bool,
}

fn render_report(ctx: &Context, report: &DeleteReport) -> Result<()> {
    render_mode(
        ctx.output,
        report,
        |r, w| writeln!(w, "{}\t{}", r.item_id, r.event_id),
        |r, w| {
            let verb = if r.deleted { "Deleted" } else { "Restored" };
            writeln!(w, "✓ {verb} {}", r.item_id)
        },
    )
}

pub fn run_delete(args: &DeleteArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let actor = ctx.actor(&store)?;
    let item_id = resolve_item(&store, &args.item)?;
    let event = store.lifecycle().delete_item(actor.id, item_id)?;
    render_report(
        ctx,
        &DeleteReport {
            item_id,
            event_id: event.id,
            deleted: true,
        },
    )
}

pub fn run_restore(args: &RestoreArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let actor = ctx.actor(&store)?;
    let item_id = resolve_item(&store, &args.item)?;
    let event = store.lifecycle().restore_item(actor.id, item_id)?;
    render_report(
        ctx,
        &DeleteReport {
            item_id,
            event_id: event.id,
            deleted: false,
        },
    )
}
