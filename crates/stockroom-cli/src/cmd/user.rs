//! `sr user`: register and list users.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;
use crate::output::{pretty_section, render, render_mode};

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a new user.
    Add(UserAddArgs),
    /// List users by username.
    List,
}

#[derive(Args, Debug)]
pub struct UserAddArgs {
    /// Unique login handle.
    pub username: String,

    /// Display name.
    #[arg(short, long)]
    pub name: String,
}

pub fn run_user(command: &UserCommand, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let directory = store.directory();
    match command {
        UserCommand::Add(args) => {
            let user = directory.add_user(&args.name, &args.username)?;
            render(ctx.output, &user, |u, w| {
                writeln!(w, "✓ user {}: {} (@{})", u.id, u.name, u.username)
            })
        }
        UserCommand::List => {
            let users = directory.list_users()?;
            render_mode(
                ctx.output,
                &users,
                |list, w| {
                    for u in list {
                        writeln!(w, "{}\t{}\t{}", u.id, u.username, u.name)?;
                    }
                    Ok(())
                },
                |list, w| {
                    pretty_section(w, "Users")?;
                    if list.is_empty() {
                        return writeln!(w, "(none)");
                    }
                    for u in list {
                        writeln!(w, "@{:<16} {:<24} {}", u.username, u.name, u.id)?;
                    }
                    Ok(())
                },
            )
        }
    }
}
