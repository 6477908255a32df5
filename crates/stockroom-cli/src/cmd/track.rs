//! `sr track`: move an item to a location or hand it to a user.

use anyhow::Result;
use clap::{ArgGroup, Args};
use serde::Serialize;
use stockroom_core::{CurrentPosition, EventId, ItemId};

use super::{Context, position_label, resolve_item, resolve_location, resolve_user};
use crate::output::{CliError, render_mode};

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("destination").required(true).args(["to", "to_user"])))]
pub struct TrackArgs {
    /// Item id or identifier.
    pub item: String,

    /// Destination location: id or exact name.
    #[arg(long)]
    pub to: Option<String>,

    /// Destination user: id or username.
    #[arg(long)]
    pub to_user: Option<String>,
}

#[derive(Debug, Serialize)]
struct TrackReport {
    item_id: ItemId,
    event_id: EventId,
    position: CurrentPosition,
}

pub fn run_track(args: &TrackArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let actor = ctx.actor(&store)?;
    let item_id = resolve_item(&store, &args.item)?;

    let event = if let Some(location) = &args.to {
        let location_id = resolve_location(&store, location)?;
        store.lifecycle().track_item(actor.id, item_id, location_id)?
    } else if let Some(user) = &args.to_user {
        let holder = resolve_user(&store, user)?;
        store
            .lifecycle()
            .track_item_to_user(actor.id, item_id, holder.id)?
    } else {
        return Err(CliError::new("pass --to <location> or --to-user <user>").into());
    };

    let report = TrackReport {
        item_id,
        event_id: event.id,
        position: store.resolver().resolve(item_id)?,
    };
    render_mode(
        ctx.output,
        &report,
        |r, w| writeln!(w, "{}\t{}", r.event_id, position_label(Some(&r.position))),
        |r, w| {
            let verb = if r.position.is_user() {
                "Handed to"
            } else {
                "Tracked to"
            };
            writeln!(w, "✓ {verb} {}", position_label(Some(&r.position)))
        },
    )
}
