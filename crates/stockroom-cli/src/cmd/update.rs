//! `sr update`: change an item's reference, group or description.
//!
//! Only fields that actually change are recorded in the `updated` event; an
//! update that changes nothing appends nothing.

use anyhow::Result;
use clap::Args;
use stockroom_core::ItemPatch;

use super::{Context, ItemView, resolve_item};
use crate::output::{CliError, pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Item id or identifier.
    pub item: String,

    /// New reference.
    #[arg(short, long)]
    pub reference: Option<String>,

    /// New group key.
    #[arg(short, long)]
    pub group: Option<String>,

    /// New description. Pass an empty string to clear it.
    #[arg(short, long)]
    pub description: Option<String>,
}

impl UpdateArgs {
    fn patch(&self) -> ItemPatch {
        ItemPatch {
            reference: self.reference.clone(),
            group_key: self.group.clone(),
            description: self.description.clone(),
        }
    }
}

pub fn run_update(args: &UpdateArgs, ctx: &Context) -> Result<()> {
    let patch = args.patch();
    if patch.is_empty() {
        return Err(CliError::with_details(
            "Nothing to update.",
            "Pass at least one of --reference, --group or --description.",
            "nothing_to_update",
        )
        .into());
    }

    let mut store = ctx.open_store()?;
    let actor = ctx.actor(&store)?;
    let item_id = resolve_item(&store, &args.item)?;
    let item = store.lifecycle().update_item(actor.id, item_id, &patch)?;
    let view = ItemView::load(&store, item)?;

    render_mode(
        ctx.output,
        &view,
        |v, w| writeln!(w, "{}", v.item.id),
        |v, w| {
            writeln!(w, "✓ Updated {}", v.item.reference)?;
            pretty_kv(w, ctx.terms().group(), &v.item.group_key)?;
            pretty_kv(w, "Description", v.item.description.as_deref().unwrap_or("-"))
        },
    )
}
