//! Core abstractions for niivue-rs.
//!
//! This crate provides the pieces shared by the entity model and the viewer:
//! - The wire protocol ([`OutboundMessage`], [`InboundMessage`], [`Command`])
//! - The [`Transport`] seam and the per-model [`SyncChannel`]
//! - The [`Entity`] trait and write-once / observer machinery
//! - Viewer [`Options`] and the colormap catalog

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod colormap;
pub mod entity;
pub mod error;
pub mod options;
pub mod protocol;
pub mod transport;

pub use colormap::{colormaps, ColormapSpec, BUILTIN_COLORMAPS};
pub use entity::{check_write_once, Entity, FieldChange, Observers, Origin, SyncField};
pub use error::{NiivueError, Result};
pub use options::{OptionKind, Options};
pub use protocol::{Command, CustomMessage, InboundMessage, ModelId, OutboundMessage};
pub use transport::{JsonLinesTransport, MessageLog, NullTransport, SyncChannel, Transport};

// Re-export glam types for convenience
pub use glam::Vec4;
