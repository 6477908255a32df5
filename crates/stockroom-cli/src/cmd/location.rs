//! `sr location`: register and list locations.

use anyhow::Result;
use clap::{Args, Subcommand};
use stockroom_core::model::Location;

use super::Context;
use crate::output::{pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum LocationCommand {
    /// Register a new location.
    Add(LocationAddArgs),
    /// List locations, alphabetically.
    List(LocationListArgs),
}

#[derive(Args, Debug)]
pub struct LocationAddArgs {
    /// Display name.
    pub name: String,

    /// Free-text description.
    #[arg(short, long)]
    pub description: Option<String>,

    /// Register a user-proxy row standing in for a person. Proxies are
    /// listed but items cannot be tracked to them.
    #[arg(long, conflicts_with = "description")]
    pub user_proxy: bool,
}

#[derive(Args, Debug)]
pub struct LocationListArgs {
    /// Include deleted locations.
    #[arg(long)]
    pub all: bool,
}

fn flags(location: &Location) -> &'static str {
    match (location.is_user, location.is_deleted) {
        (true, true) => "user proxy, deleted",
        (true, false) => "user proxy",
        (false, true) => "deleted",
        (false, false) => "",
    }
}

pub fn run_location(command: &LocationCommand, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let directory = store.directory();
    match command {
        LocationCommand::Add(args) => {
            let location = if args.user_proxy {
                directory.add_user_proxy(&args.name)?
            } else {
                directory.add_location(&args.name, args.description.as_deref())?
            };
            render(ctx.output, &location, |l, w| {
                writeln!(w, "✓ {} {}: {}", ctx.terms().location(), l.id, l.name)
            })
        }
        LocationCommand::List(args) => {
            let locations = directory.list_locations(args.all)?;
            render_mode(
                ctx.output,
                &locations,
                |list, w| {
                    for l in list {
                        writeln!(w, "{}\t{}\t{}", l.id, l.name, flags(l))?;
                    }
                    Ok(())
                },
                |list, w| {
                    pretty_section(w, ctx.terms().locations())?;
                    if list.is_empty() {
                        return writeln!(w, "(none)");
                    }
                    for l in list {
                        let suffix = match flags(l) {
                            "" => String::new(),
                            f => format!("  [{f}]"),
                        };
                        writeln!(w, "{:<24} {}{suffix}", l.name, l.id)?;
                        if let Some(description) = &l.description {
                            writeln!(w, "{:<24} {description}", "")?;
                        }
                    }
                    Ok(())
                },
            )
        }
    }
}
