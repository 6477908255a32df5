//! `sr list`: items, newest first, with their current position.

use anyhow::Result;
use clap::Args;
use stockroom_core::db::items::{ItemFilter, list_items};
use stockroom_core::event::Destination;

use super::{Context, ItemView, resolve_location, resolve_user};
use crate::output::{pretty_rule, render_mode};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only items in this group.
    #[arg(short, long)]
    pub group: Option<String>,

    /// Only items currently at this location (id or exact name).
    #[arg(short, long)]
    pub location: Option<String>,

    /// Only items currently held by this user (id or username).
    #[arg(short, long, conflicts_with = "location")]
    pub user: Option<String>,

    /// Include deleted items.
    #[arg(long)]
    pub all: bool,

    /// Maximum number of items to show.
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,
}

impl ListArgs {
    fn filter(&self) -> ItemFilter {
        ItemFilter {
            group: self.group.clone(),
            include_deleted: self.all,
            limit: self.limit,
        }
    }
}

pub fn run_list(args: &ListArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let filter = args.filter();

    let destination = if let Some(location) = &args.location {
        Some(Destination::Location(resolve_location(&store, location)?))
    } else if let Some(user) = &args.user {
        Some(Destination::User(resolve_user(&store, user)?.id))
    } else {
        None
    };

    let items = match destination {
        Some(destination) => store.resolver().items_at(&filter, destination)?,
        None => list_items(store.conn(), &filter)?,
    };
    let views = items
        .into_iter()
        .map(|item| ItemView::load(&store, item))
        .collect::<Result<Vec<_>>>()?;

    let terms = ctx.terms();
    render_mode(
        ctx.output,
        &views,
        |list, w| {
            for v in list {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    v.item.id,
                    v.item.reference,
                    v.item.group_key,
                    v.position_label()
                )?;
            }
            Ok(())
        },
        |list, w| {
            if list.is_empty() {
                return writeln!(w, "No {} found.", terms.items().to_lowercase());
            }
            writeln!(
                w,
                "{:<20} {:<16} {:<24} ID",
                "REFERENCE",
                terms.group().to_uppercase(),
                terms.location().to_uppercase()
            )?;
            pretty_rule(w)?;
            for v in list {
                let marker = if v.item.deleted { " (deleted)" } else { "" };
                writeln!(
                    w,
                    "{:<20} {:<16} {:<24} {}{marker}",
                    v.item.reference,
                    v.item.group_key,
                    v.position_label(),
                    v.item.id
                )?;
            }
            Ok(())
        },
    )
}
