use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stockroom_core::Store;
use stockroom_core::db::items::{group_exists, list_groups};

use super::Context;
use crate::output::{CliError, pretty_section, render, render_mode};

#[derive(Args, Debug)]
pub struct GroupsArgs {
    /// Only groups containing this text (case-insensitive).
    pub filter: Option<String>,

    /// Maximum number of groups to show.
    #[arg(short = 'n', long, default_value_t = 50)]
    pub limit: u32,

    /// Check that this exact group is carried by an active item instead of
    /// listing groups. Fails with exit code 2 when it is not.
    #[arg(long, value_name = "GROUP", conflicts_with = "filter")]
    pub exists: Option<String>,
}

#[derive(Debug, Serialize)]
struct GroupCheck<'a> {
    group: &'a str,
    exists: bool,
}

/// Execute `sr groups`: distinct groups of active items, alphabetically.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_groups(args: &GroupsArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    if let Some(group) = args.exists.as_deref() {
        return check_group(&store, group.trim(), ctx);
    }

    let groups = list_groups(store.conn(), args.limit, args.filter.as_deref())?;
    render_mode(
        ctx.output,
        &groups,
        |list, w| {
            for group in list {
                writeln!(w, "{group}")?;
            }
            Ok(())
        },
        |list, w| {
            pretty_section(w, ctx.terms().groups())?;
            if list.is_empty() {
                return writeln!(w, "(none)");
            }
            for group in list {
                writeln!(w, "  {group}")?;
            }
            Ok(())
        },
    )
}

fn check_group(store: &Store, group: &str, ctx: &Context) -> Result<()> {
    if !group_exists(store.conn(), group)? {
        return Err(CliError::with_details(
            format!("no active item is in group '{group}'"),
            "Use `sr groups` to see the groups in use.",
            "group_not_found",
        )
        .into());
    }
    render(ctx.output, &GroupCheck { group, exists: true }, |check, w| {
        writeln!(w, "{}", check.group)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: GroupsArgs,
    }

    #[test]
    fn exists_flag_parses() {
        let w = Wrapper::parse_from(["test", "--exists", "XYZ"]);
        assert_eq!(w.args.exists.as_deref(), Some("XYZ"));
        assert!(w.args.filter.is_none());
    }

    #[test]
    fn exists_conflicts_with_filter() {
        assert!(Wrapper::try_parse_from(["test", "xy", "--exists", "XYZ"]).is_err());
    }
}
