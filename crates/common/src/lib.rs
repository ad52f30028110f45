//! Shared types for multiworld.

pub mod types;

pub use types::{LevelHandle, MAX_NAME_LEN, NameError, WorldName};
