//! niivue-rs: drive an in-browser NiiVue viewer from Rust.
//!
//! A [`NiiVue`] is the host-side proxy of one viewer widget. It owns the
//! ordered lists of [`Volume`]s and [`Mesh`]es, mirrors every change to the
//! frontend through a [`Transport`], applies updates coming back, and relays
//! frontend events to registered callbacks.
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use niivue::*;
//!
//! fn main() -> Result<()> {
//!     let transport = Rc::new(MessageLog::new());
//!     let nv = NiiVue::new(transport.clone());
//!
//!     nv.load_volumes([
//!         VolumeFields::from_path("https://niivue.github.io/niivue/images/mni152.nii.gz")
//!             .with_id("mni"),
//!     ])?;
//!
//!     nv.on_frame_change(|volume, frame| {
//!         println!("{} moved to frame {frame}", volume.id());
//!     });
//!
//!     nv.handle_frame(
//!         r#"{"method":"custom","content":{"event":"frame_change","data":{"id":"mni","frame_index":3}}}"#,
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! # Protocol
//!
//! Host → frontend frames are `open` (a new model and its state), `update`
//! (changed fields, camelCase) and `custom` (a [`Command`]). The frontend
//! sends `update` frames and `custom` frames carrying `{event, data}`.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod callbacks;
pub mod collection;
mod commands;
pub mod dispatcher;
pub mod events;
mod viewer;

pub use niivue_core::{
    colormap::{colormaps, ColormapSpec},
    entity::{Entity, FieldChange, Origin, SyncField},
    error::{NiivueError, Result},
    options::{OptionKind, Options},
    protocol::{Command, CustomMessage, InboundMessage, ModelId, OutboundMessage},
    transport::{JsonLinesTransport, MessageLog, NullTransport, Transport},
    Vec4,
};

pub use niivue_structures::{
    DataSource, Mesh, MeshField, MeshFields, MeshLayer, Volume, VolumeField, VolumeFields,
};

pub use collection::{AddRequest, Collection};
pub use commands::DEFAULT_SCENE_FILE;
pub use dispatcher::{CallbackId, Dispatcher};
pub use events::{Event, EventKind, Resolved};
pub use viewer::{NiiVue, DEFAULT_HEIGHT};

/// Model name of the viewer widget on the wire.
pub const MODEL_VIEWER: &str = "NiiVue";

/// Initializes `env_logger` once; later calls are ignored.
///
/// Filtering follows `RUST_LOG`, e.g. `RUST_LOG=niivue=debug`.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
