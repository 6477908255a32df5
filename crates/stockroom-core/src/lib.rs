//! stockroom-core library.
//!
//! The item history engine: an append-only log of typed lifecycle events,
//! the current-location resolver that derives where an item is from that
//! log, the projector that turns raw events into display records, and the
//! lifecycle coordinator that is the only writer of item state.
//!
//! # Conventions
//!
//! - **Errors**: typed [`error::StoreError`] in the core, `anyhow::Result`
//!   for configuration and the CLI.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod event;
pub mod history;
pub mod lifecycle;
pub mod model;
pub mod resolve;

pub use config::Terminology;
pub use db::Store;
pub use directory::{LocationDirectory, SqliteDirectory, UserDirectory};
pub use error::{ErrorClass, ErrorCode, StoreError};
pub use history::{HistoryDetail, HistoryProjector, HistoryRecord};
pub use lifecycle::{ItemPatch, Lifecycle, NewItem};
pub use model::ids::{EventId, ItemId, LocationId, UserId};
pub use resolve::{CurrentLocationResolver, CurrentPosition};
