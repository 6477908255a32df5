use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stockroom_core::db::history::count_for_item;
use stockroom_core::db::items::require_item;

use super::{Context, ItemView, format_time, resolve_item};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Item id or identifier.
    pub item: String,
}

#[derive(Debug, Serialize)]
struct ShowView {
    #[serde(flatten)]
    view: ItemView,
    event_count: u64,
}

/// Execute `sr show`: one item, where it is, and how long its log is.
///
/// # Errors
///
/// Returns a not-found error for an unknown item, or a storage error.
pub fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let item_id = resolve_item(&store, &args.item)?;
    let item = require_item(store.conn(), item_id)?;
    let event_count = count_for_item(store.conn(), item_id)?;
    let shown = ShowView {
        view: ItemView::load(&store, item)?,
        event_count,
    };

    let terms = ctx.terms();
    render_mode(
        ctx.output,
        &shown,
        |s, w| {
            let item = &s.view.item;
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                item.id,
                item.reference,
                item.group_key,
                s.view.position_label(),
                if item.deleted { "deleted" } else { "active" }
            )
        },
        |s, w| {
            let item = &s.view.item;
            pretty_section(w, &format!("{} {}", terms.item(), item.reference))?;
            pretty_kv(w, "ID", item.id.to_string())?;
            if let Some(identifier) = &item.identifier {
                pretty_kv(w, "Identifier", identifier)?;
            }
            pretty_kv(w, terms.group(), &item.group_key)?;
            if let Some(description) = &item.description {
                pretty_kv(w, "Description", description)?;
            }
            pretty_kv(w, terms.location(), s.view.position_label())?;
            if let Some(position) = &s.view.position {
                pretty_kv(w, "Since", format_time(position.tracked_at_us()))?;
            }
            pretty_kv(w, "Status", if item.deleted { "deleted" } else { "active" })?;
            pretty_kv(w, "Created", format_time(item.created_at_us))?;
            pretty_kv(w, "Updated", format_time(item.updated_at_us))?;
            pretty_kv(w, "Events", s.event_count.to_string())
        },
    )
}
