//! `sr create`: create an item at its first location.

use anyhow::Result;
use clap::Args;
use stockroom_core::NewItem;

use super::{Context, ItemView, resolve_location};
use crate::output::{pretty_kv, render_mode};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Item reference (part number, SKU, ...).
    #[arg(short, long)]
    pub reference: String,

    /// Group key the item belongs to.
    #[arg(short, long)]
    pub group: String,

    /// Initial location: id or exact name.
    #[arg(long)]
    pub at: String,

    /// Optional unique identifier (asset tag, serial number).
    #[arg(short, long)]
    pub identifier: Option<String>,

    /// Description text.
    #[arg(short, long)]
    pub description: Option<String>,
}

pub fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let actor = ctx.actor(&store)?;
    let location_id = resolve_location(&store, &args.at)?;

    let item = store.lifecycle().create_item(
        actor.id,
        &NewItem {
            identifier: args.identifier.clone(),
            reference: args.reference.clone(),
            group_key: args.group.clone(),
            description: args.description.clone(),
            location_id,
        },
    )?;
    let view = ItemView::load(&store, item)?;

    render_mode(
        ctx.output,
        &view,
        |v, w| writeln!(w, "{}", v.item.id),
        |v, w| {
            writeln!(w, "✓ Created {} {}", ctx.terms().item().to_lowercase(), v.item.reference)?;
            pretty_kv(w, "ID", v.item.id.to_string())?;
            pretty_kv(w, ctx.terms().group(), &v.item.group_key)?;
            pretty_kv(w, ctx.terms().location(), v.position_label())
        },
    )
}
