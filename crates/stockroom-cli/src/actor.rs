//! Acting-user resolution for CLI commands.
//!
//! The resolution chain: `--as` flag > `STOCKROOM_USER` env > `user` in the
//! user config file. The value may be a user id or a username.
//! Mutating commands require an acting user; read-only commands work without one.

use std::env;

use stockroom_core::model::User;
use stockroom_core::Store;

use crate::cmd::resolve_user;
use crate::output::CliError;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Core resolution logic, parameterized by environment reader.
fn resolve_actor_with(
    cli_flag: Option<&str>,
    config_user: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(flag) = cli_flag.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(flag.to_string());
    }

    if let Some(val) = env.get("STOCKROOM_USER") {
        return Some(val.trim().to_string());
    }

    config_user
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// Resolve who is acting, without checking that the user exists.
///
/// Returns `None` if no identity could be resolved.
pub fn resolve_actor(cli_flag: Option<&str>, config_user: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, config_user, &RealEnv)
}

/// Resolve the acting user and look them up in the store.
///
/// Use this for mutating commands.
///
/// # Errors
///
/// Returns a `missing_user` [`CliError`] when nothing names an acting user,
/// or a not-found error when the named user does not exist.
pub fn require_actor(
    store: &Store,
    cli_flag: Option<&str>,
    config_user: Option<&str>,
) -> anyhow::Result<User> {
    let raw = resolve_actor(cli_flag, config_user).ok_or_else(|| {
        CliError::with_details(
            "Acting user required for this command.",
            "Set --as, STOCKROOM_USER, or `user` in the stockroom user config.",
            "missing_user",
        )
    })?;
    resolve_user(store, &raw)
}
