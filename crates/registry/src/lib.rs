//! World registry: keeps per-world metadata files, the in-memory index of
//! known worlds, and the host server's loaded levels in step.
//!
//! # Invariants
//! - Every registered world has a metadata file on disk.
//! - World names are unique registry keys; the filename stem is canonical.
//! - Load state is owned by the host and queried, never cached.

pub mod host;
pub mod metadata;
pub mod registry;

pub use host::{LevelHost, LocalHost};
pub use metadata::{MetadataDoc, MetadataError};
pub use registry::{LoadSummary, RegistryError, WorldRecord, WorldRegistry};
