//! Domain records shared by every component.

pub mod directory;
pub mod ids;
pub mod item;
pub mod time;

pub use directory::{Location, User};
pub use item::Item;
