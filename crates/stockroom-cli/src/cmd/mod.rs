pub mod completions;
pub mod create;
pub mod delete;
pub mod export;
pub mod groups;
pub mod history;
pub mod init;
pub mod list;
pub mod location;
pub mod show;
pub mod track;
pub mod update;
pub mod user;

use anyhow::Context as _;
use serde::Serialize;
use std::path::{Path, PathBuf};
use stockroom_core::config::{EffectiveConfig, STOCKROOM_DIR};
use stockroom_core::db::items;
use stockroom_core::model::time::to_datetime;
use stockroom_core::model::{Item, User};
use stockroom_core::{
    CurrentPosition, ErrorCode, ItemId, LocationId, Store, StoreError, Terminology, UserDirectory,
    UserId,
};

use crate::actor;
use crate::output::{CliError, OutputMode};

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub root: PathBuf,
    pub config: EffectiveConfig,
    pub output: OutputMode,
    /// Raw `--as` value.
    pub acting_as: Option<String>,
}

impl Context {
    /// Open the project's store. The store must already exist.
    ///
    /// # Errors
    ///
    /// Returns a `not_initialized` [`CliError`] if `sr init` has not been
    /// run, or the open/migration error otherwise.
    pub fn open_store(&self) -> anyhow::Result<Store> {
        let path = self.config.project.store_path(&self.root);
        if !path.exists() {
            return Err(CliError::with_details(
                format!("No stockroom store at {}", path.display()),
                "Run `sr init` in the project directory first.",
                "not_initialized",
            )
            .into());
        }
        Store::open(&path).with_context(|| format!("Failed to open store {}", path.display()))
    }

    /// The acting user for a mutation.
    ///
    /// # Errors
    ///
    /// See [`actor::require_actor`].
    pub fn actor(&self, store: &Store) -> anyhow::Result<User> {
        actor::require_actor(
            store,
            self.acting_as.as_deref(),
            self.config.user.user.as_deref(),
        )
    }

    pub const fn terms(&self) -> &Terminology {
        &self.config.project.terminology
    }
}

/// Walk up from `start` to the nearest directory holding `.stockroom/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(STOCKROOM_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Resolve an item argument: an item id, or an item identifier.
///
/// # Errors
///
/// Returns an `E2001` [`CliError`] when neither matches.
pub fn resolve_item(store: &Store, raw: &str) -> anyhow::Result<ItemId> {
    if let Ok(id) = raw.parse::<ItemId>() {
        return Ok(id);
    }
    items::find_by_identifier(store.conn(), raw.trim())?
        .map(|item| item.id)
        .ok_or_else(|| {
            CliError::with_details(
                format!("no item with id or identifier '{raw}'"),
                "Use `sr list --all` to find the item id.",
                ErrorCode::ItemNotFound.code(),
            )
            .into()
        })
}

/// Resolve a location argument: a location id, or the exact name of one
/// active location.
///
/// # Errors
///
/// Returns an `E2002` [`CliError`] when no active location has that name,
/// or an `ambiguous_location` error when several do.
pub fn resolve_location(store: &Store, raw: &str) -> anyhow::Result<LocationId> {
    if let Ok(id) = raw.parse::<LocationId>() {
        return Ok(id);
    }
    let wanted = raw.trim();
    let matches: Vec<LocationId> = store
        .directory()
        .list_locations(false)?
        .into_iter()
        .filter(|location| location.name == wanted)
        .map(|location| location.id)
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(CliError::with_details(
            format!("no location named '{wanted}'"),
            "Use `sr location list` to find a valid location.",
            ErrorCode::LocationNotFound.code(),
        )
        .into()),
        _ => Err(CliError::with_details(
            format!("{} locations are named '{wanted}'", matches.len()),
            "Pass the location id instead of its name.",
            "ambiguous_location",
        )
        .into()),
    }
}

/// Resolve a user argument: a user id or a username.
///
/// # Errors
///
/// Returns [`StoreError::UserNotFound`] for an unknown id, or an `E2003`
/// [`CliError`] for an unknown username.
pub fn resolve_user(store: &Store, raw: &str) -> anyhow::Result<User> {
    let directory = store.directory();
    if let Ok(id) = raw.parse::<UserId>() {
        return Ok(directory.get_user(id)?);
    }
    directory
        .find_user_by_username(raw.trim())?
        .ok_or_else(|| {
            CliError::with_details(
                format!("no user with username '{}'", raw.trim()),
                "Use `sr user list` to find a valid user.",
                ErrorCode::UserNotFound.code(),
            )
            .into()
        })
}

/// An item together with where it is now.
#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    /// `None` when the item has no readable positional event.
    pub position: Option<CurrentPosition>,
}

impl ItemView {
    /// # Errors
    ///
    /// Propagates resolver failures other than an unknown position.
    pub fn load(store: &Store, item: Item) -> anyhow::Result<Self> {
        let position = match store.resolver().resolve(item.id) {
            Ok(position) => Some(position),
            Err(StoreError::PositionUnknown { .. }) => None,
            Err(err) => return Err(err.into()),
        };
        Ok(Self { item, position })
    }

    /// Short label for the current position.
    pub fn position_label(&self) -> String {
        position_label(self.position.as_ref())
    }
}

pub fn position_label(position: Option<&CurrentPosition>) -> String {
    match position {
        Some(CurrentPosition::AtLocation(location)) if location.is_deleted => {
            format!("{} (deleted)", location.name)
        }
        Some(CurrentPosition::AtLocation(location)) => location.name.clone(),
        Some(CurrentPosition::WithUser(user)) => format!("{} (@{})", user.name, user.username),
        None => "unknown".to_string(),
    }
}

/// Render a microsecond timestamp for human output.
pub fn format_time(micros: i64) -> String {
    to_datetime(micros).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::NewItem;

    fn store_with_shelves() -> (Store, User) {
        let store = Store::open_in_memory().expect("store");
        let ada = store.directory().add_user("Ada", "ada").expect("user");
        store.directory().add_location("Shelf", None).expect("shelf");
        store.directory().add_location("Twin", None).expect("twin");
        store.directory().add_location("Twin", None).expect("twin");
        (store, ada)
    }

    #[test]
    fn find_project_root_walks_up() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(STOCKROOM_DIR)).expect("mkdir");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir nested");
        assert_eq!(find_project_root(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn resolve_location_by_unique_name() {
        let (store, _) = store_with_shelves();
        let id = resolve_location(&store, "Shelf").expect("shelf");
        let listed = store.directory().list_locations(false).expect("list");
        assert!(listed.iter().any(|l| l.id == id && l.name == "Shelf"));
    }

    #[test]
    fn resolve_location_rejects_ambiguous_and_unknown_names() {
        let (store, _) = store_with_shelves();
        let err = resolve_location(&store, "Twin").unwrap_err();
        let cli = err.downcast_ref::<CliError>().expect("cli error");
        assert_eq!(cli.error_code.as_deref(), Some("ambiguous_location"));

        let err = resolve_location(&store, "Attic").unwrap_err();
        let cli = err.downcast_ref::<CliError>().expect("cli error");
        assert_eq!(cli.error_code.as_deref(), Some("E2002"));
    }

    #[test]
    fn resolve_item_by_identifier() {
        let (mut store, ada) = store_with_shelves();
        let shelf = resolve_location(&store, "Shelf").expect("shelf");
        let item = store
            .lifecycle()
            .create_item(
                ada.id,
                &NewItem {
                    identifier: Some("INV-7".into()),
                    reference: "REF-7".into(),
                    group_key: "G".into(),
                    description: None,
                    location_id: shelf,
                },
            )
            .expect("create");

        assert_eq!(resolve_item(&store, "INV-7").expect("by identifier"), item.id);
        assert_eq!(
            resolve_item(&store, &item.id.to_string()).expect("by id"),
            item.id
        );
        assert!(resolve_item(&store, "INV-8").is_err());
    }

    #[test]
    fn unknown_user_id_is_a_store_error() {
        let (store, _) = store_with_shelves();
        let err = resolve_user(&store, &UserId::new().to_string()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::UserNotFound { .. })
        ));
    }

    #[test]
    fn position_label_marks_unknown() {
        assert_eq!(position_label(None), "unknown");
    }
}
