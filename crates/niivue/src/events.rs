//! The frontend event catalog and per-event payload reshaping.
//!
//! Each [`EventKind`] maps to one reshape rule. Three policies exist for
//! events that carry an entity id:
//!
//! - `image_loaded` / `mesh_loaded`: resolved entity, or the raw payload
//! - `frame_change` / `intensity_change`: resolved entity, or no event at all
//! - every other event: the payload as-is (or unpacked scalars)
//!
//! Both entity policies are pinned by `tests/dispatch_test.rs`.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use niivue_core::{NiivueError, Result};
use niivue_structures::{Mesh, Volume};

use crate::collection::Collection;

/// The events the frontend raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    AzimuthElevationChange,
    ClickToSegment,
    ClipPlaneChange,
    DocumentLoaded,
    DragRelease,
    FrameChange,
    ImageLoaded,
    IntensityChange,
    LocationChange,
    MeshAddedFromUrl,
    MeshLoaded,
    MouseUp,
    VolumeAddedFromUrl,
    VolumeUpdated,
}

impl EventKind {
    /// Every event kind, in wire-name order.
    pub const ALL: &'static [Self] = &[
        Self::AzimuthElevationChange,
        Self::ClickToSegment,
        Self::ClipPlaneChange,
        Self::DocumentLoaded,
        Self::DragRelease,
        Self::FrameChange,
        Self::ImageLoaded,
        Self::IntensityChange,
        Self::LocationChange,
        Self::MeshAddedFromUrl,
        Self::MeshLoaded,
        Self::MouseUp,
        Self::VolumeAddedFromUrl,
        Self::VolumeUpdated,
    ];

    /// Returns the wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AzimuthElevationChange => "azimuth_elevation_change",
            Self::ClickToSegment => "click_to_segment",
            Self::ClipPlaneChange => "clip_plane_change",
            Self::DocumentLoaded => "document_loaded",
            Self::DragRelease => "drag_release",
            Self::FrameChange => "frame_change",
            Self::ImageLoaded => "image_loaded",
            Self::IntensityChange => "intensity_change",
            Self::LocationChange => "location_change",
            Self::MeshAddedFromUrl => "mesh_added_from_url",
            Self::MeshLoaded => "mesh_loaded",
            Self::MouseUp => "mouse_up",
            Self::VolumeAddedFromUrl => "volume_added_from_url",
            Self::VolumeUpdated => "volume_updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = NiivueError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| NiivueError::UnknownEvent(name.to_string()))
    }
}

/// An entity resolved from an event payload, or the payload itself when no
/// entity with that id exists.
#[derive(Debug, Clone)]
pub enum Resolved<E> {
    Entity(E),
    Raw(Value),
}

impl<E> Resolved<E> {
    /// Returns the entity, if resolution succeeded.
    pub fn entity(&self) -> Option<&E> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Raw(_) => None,
        }
    }

    /// Returns the raw payload, if resolution failed.
    pub fn raw(&self) -> Option<&Value> {
        match self {
            Self::Entity(_) => None,
            Self::Raw(value) => Some(value),
        }
    }
}

/// A reshaped event, ready for callbacks.
#[derive(Debug, Clone)]
pub enum Event {
    AzimuthElevationChange { azimuth: f64, elevation: f64 },
    ClickToSegment(Value),
    ClipPlaneChange(Value),
    DocumentLoaded(Value),
    DragRelease(Value),
    FrameChange { volume: Volume, frame_index: usize },
    ImageLoaded(Resolved<Volume>),
    IntensityChange(Volume),
    LocationChange(Value),
    MeshAddedFromUrl { options: Value, mesh: Value },
    MeshLoaded(Resolved<Mesh>),
    MouseUp(Value),
    VolumeAddedFromUrl { options: Value, volume: Value },
    VolumeUpdated,
}

impl Event {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AzimuthElevationChange { .. } => EventKind::AzimuthElevationChange,
            Self::ClickToSegment(_) => EventKind::ClickToSegment,
            Self::ClipPlaneChange(_) => EventKind::ClipPlaneChange,
            Self::DocumentLoaded(_) => EventKind::DocumentLoaded,
            Self::DragRelease(_) => EventKind::DragRelease,
            Self::FrameChange { .. } => EventKind::FrameChange,
            Self::ImageLoaded(_) => EventKind::ImageLoaded,
            Self::IntensityChange(_) => EventKind::IntensityChange,
            Self::LocationChange(_) => EventKind::LocationChange,
            Self::MeshAddedFromUrl { .. } => EventKind::MeshAddedFromUrl,
            Self::MeshLoaded(_) => EventKind::MeshLoaded,
            Self::MouseUp(_) => EventKind::MouseUp,
            Self::VolumeAddedFromUrl { .. } => EventKind::VolumeAddedFromUrl,
            Self::VolumeUpdated => EventKind::VolumeUpdated,
        }
    }

    /// Builds the event for `kind` from its wire payload.
    ///
    /// Returns `Ok(None)` when a `frame_change` or `intensity_change` names a
    /// volume that is not loaded.
    pub fn reshape(
        kind: EventKind,
        data: Value,
        volumes: &Collection<Volume>,
        meshes: &Collection<Mesh>,
    ) -> Result<Option<Self>> {
        let event = match kind {
            EventKind::AzimuthElevationChange => Self::AzimuthElevationChange {
                azimuth: number(kind, &data, "azimuth")?,
                elevation: number(kind, &data, "elevation")?,
            },
            EventKind::ClickToSegment => Self::ClickToSegment(data),
            EventKind::ClipPlaneChange => Self::ClipPlaneChange(data),
            EventKind::DocumentLoaded => Self::DocumentLoaded(data),
            EventKind::DragRelease => Self::DragRelease(data),
            EventKind::LocationChange => Self::LocationChange(data),
            EventKind::MouseUp => Self::MouseUp(data),
            EventKind::VolumeUpdated => Self::VolumeUpdated,

            EventKind::FrameChange => {
                let Some(volume) = entity_id(&data).and_then(|id| volumes.find_by_id(id)) else {
                    log::debug!("{kind}: no loaded volume matches {data}");
                    return Ok(None);
                };
                let frame_index = data
                    .get("frame_index")
                    .or_else(|| data.get("frameIndex"))
                    .and_then(Value::as_u64)
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| malformed(kind, "missing non-negative integer 'frame_index'"))?;
                Self::FrameChange {
                    volume,
                    frame_index,
                }
            }
            EventKind::IntensityChange => {
                match entity_id(&data).and_then(|id| volumes.find_by_id(id)) {
                    Some(volume) => Self::IntensityChange(volume),
                    None => {
                        log::debug!("{kind}: no loaded volume matches {data}");
                        return Ok(None);
                    }
                }
            }
            EventKind::ImageLoaded => Self::ImageLoaded(
                match entity_id(&data).and_then(|id| volumes.find_by_id(id)) {
                    Some(volume) => Resolved::Entity(volume),
                    None => Resolved::Raw(data),
                },
            ),
            EventKind::MeshLoaded => Self::MeshLoaded(
                match entity_id(&data).and_then(|id| meshes.find_by_id(id)) {
                    Some(mesh) => Resolved::Entity(mesh),
                    None => Resolved::Raw(data),
                },
            ),

            EventKind::MeshAddedFromUrl => {
                let (options, mesh) = split_url_payload(kind, data, "mesh")?;
                Self::MeshAddedFromUrl { options, mesh }
            }
            EventKind::VolumeAddedFromUrl => {
                let (options, volume) = split_url_payload(kind, data, "volume")?;
                Self::VolumeAddedFromUrl { options, volume }
            }
        };
        Ok(Some(event))
    }
}

fn malformed(kind: EventKind, reason: &str) -> NiivueError {
    NiivueError::MalformedEvent {
        event: kind.as_str().to_string(),
        reason: reason.to_string(),
    }
}

fn entity_id(data: &Value) -> Option<&str> {
    data.get("id").and_then(Value::as_str)
}

fn number(kind: EventKind, data: &Value, key: &str) -> Result<f64> {
    data.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| malformed(kind, &format!("missing numeric '{key}'")))
}

/// Splits a `*_added_from_url` payload into `{url, headers}` and the entity
/// descriptor. The descriptor is the nested `descriptor_key` mapping when
/// present, and otherwise the remaining payload keys.
fn split_url_payload(kind: EventKind, data: Value, descriptor_key: &str) -> Result<(Value, Value)> {
    let Value::Object(mut payload) = data else {
        return Err(malformed(kind, "payload must be a mapping"));
    };
    let url = payload
        .remove("url")
        .ok_or_else(|| malformed(kind, "missing 'url'"))?;
    let headers = payload
        .remove("headers")
        .unwrap_or_else(|| Value::Object(Map::new()));

    let mut options = Map::new();
    options.insert("url".to_string(), url);
    options.insert("headers".to_string(), headers);

    let descriptor = payload
        .remove(descriptor_key)
        .unwrap_or(Value::Object(payload));
    Ok((Value::Object(options), descriptor))
}
