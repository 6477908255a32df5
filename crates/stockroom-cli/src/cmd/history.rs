//! `sr history`: an item's projected history, newest first.

use anyhow::Result;
use clap::Args;
use stockroom_core::{HistoryDetail, HistoryRecord};

use super::{Context, resolve_item};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Item id or identifier.
    pub item: String,
}

fn or_unknown(name: Option<&str>) -> &str {
    name.unwrap_or("(unknown)")
}

/// One-line description of what an event did.
fn summary(record: &HistoryRecord) -> String {
    match &record.data {
        HistoryDetail::Created {
            reference,
            group,
            location_name,
            ..
        } => format!(
            "{reference} in {group} at {}",
            or_unknown(location_name.as_deref())
        ),
        HistoryDetail::Updated { updated_fields } => updated_fields
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect::<Vec<_>>()
            .join(", "),
        HistoryDetail::Tracked { location_name, .. } => {
            format!("to {}", or_unknown(location_name.as_deref()))
        }
        HistoryDetail::TrackedToUser {
            user_name,
            user_username,
            ..
        } => match user_username {
            Some(username) => format!("to {} (@{username})", or_unknown(user_name.as_deref())),
            None => format!("to {}", or_unknown(user_name.as_deref())),
        },
        HistoryDetail::Deleted | HistoryDetail::Restored => String::new(),
    }
}

fn actor(record: &HistoryRecord) -> &str {
    or_unknown(record.user_name.as_deref())
}

pub fn run_history(args: &HistoryArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let item_id = resolve_item(&store, &args.item)?;
    let records = store.projector().collect(item_id)?;

    render_mode(
        ctx.output,
        &records,
        |list, w| {
            for r in list {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    r.date.to_rfc3339(),
                    r.kind,
                    actor(r),
                    summary(r)
                )?;
            }
            Ok(())
        },
        |list, w| {
            pretty_section(w, &format!("History of {item_id}"))?;
            for r in list {
                writeln!(
                    w,
                    "{}  {:<16} {:<20} {}",
                    r.date.format("%Y-%m-%d %H:%M:%S"),
                    r.kind.label(),
                    actor(r),
                    summary(r)
                )?;
            }
            Ok(())
        },
    )
}
