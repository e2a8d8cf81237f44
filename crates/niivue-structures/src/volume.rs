//! Volumes: 3D/4D scalar images shown by the viewer.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::{Map, Value};

use niivue_core::entity::{check_write_once, Entity, FieldChange, Observers, Origin, SyncField};
use niivue_core::{NiivueError, Result, SyncChannel, Transport};

use crate::source::DataSource;
use crate::{parse_field, parse_path, FieldValue, MODEL_VOLUME};

/// Synchronized fields of a [`Volume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeField {
    Path,
    Id,
    Name,
    Opacity,
    Colormap,
    ColorbarVisible,
    CalMin,
    CalMax,
    ColormapInvert,
}

impl SyncField for VolumeField {
    const ALL: &'static [Self] = &[
        Self::Path,
        Self::Id,
        Self::Name,
        Self::Opacity,
        Self::Colormap,
        Self::ColorbarVisible,
        Self::CalMin,
        Self::CalMax,
        Self::ColormapInvert,
    ];

    fn wire_name(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Id => "id",
            Self::Name => "name",
            Self::Opacity => "opacity",
            Self::Colormap => "colormap",
            Self::ColorbarVisible => "colorbarVisible",
            Self::CalMin => "calMin",
            Self::CalMax => "calMax",
            Self::ColormapInvert => "colormapInvert",
        }
    }
}

/// Constructor fields of a [`Volume`].
///
/// Deserializes from a mapping with snake_case or camelCase keys; missing
/// keys take the defaults below and unknown keys are ignored.
/// `colormap_invert` is display state owned by the frontend and cannot be
/// supplied here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VolumeFields {
    pub path: Option<DataSource>,
    pub id: String,
    pub name: String,
    pub opacity: f64,
    pub colormap: String,
    #[serde(alias = "colorbarVisible")]
    pub colorbar_visible: bool,
    #[serde(alias = "calMin")]
    pub cal_min: Option<f64>,
    #[serde(alias = "calMax")]
    pub cal_max: Option<f64>,
}

impl Default for VolumeFields {
    fn default() -> Self {
        Self {
            path: None,
            id: String::new(),
            name: String::new(),
            opacity: 1.0,
            colormap: "gray".to_string(),
            colorbar_visible: true,
            cal_min: None,
            cal_max: None,
        }
    }
}

impl VolumeFields {
    /// Fields for a volume loaded from `path`.
    pub fn from_path(path: impl Into<DataSource>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parses fields from an untyped mapping.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the opacity.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Sets the colormap name.
    #[must_use]
    pub fn with_colormap(mut self, colormap: impl Into<String>) -> Self {
        self.colormap = colormap.into();
        self
    }

    /// Sets the calibration window.
    #[must_use]
    pub fn with_cal_range(mut self, cal_min: Option<f64>, cal_max: Option<f64>) -> Self {
        self.cal_min = cal_min;
        self.cal_max = cal_max;
        self
    }
}

impl TryFrom<Value> for VolumeFields {
    type Error = NiivueError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

#[derive(Debug, Clone)]
struct VolumeState {
    path: Option<DataSource>,
    id: String,
    name: String,
    opacity: f64,
    colormap: String,
    colorbar_visible: bool,
    cal_min: Option<f64>,
    cal_max: Option<f64>,
    colormap_invert: bool,
}

/// A pending change of one field, already type-checked.
enum VolumeUpdate {
    Path(Option<DataSource>),
    Id(String),
    Name(String),
    Opacity(f64),
    Colormap(String),
    ColorbarVisible(bool),
    CalMin(Option<f64>),
    CalMax(Option<f64>),
    ColormapInvert(bool),
}

struct VolumeInner {
    channel: SyncChannel,
    state: RefCell<VolumeState>,
    observers: Observers<VolumeField>,
}

/// A 3D/4D image shown by the viewer.
///
/// `Volume` is a handle: clones share state, and every setter is mirrored to
/// the frontend. `id` and `path` are write-once.
#[derive(Clone)]
pub struct Volume {
    inner: Rc<VolumeInner>,
}

impl Volume {
    /// Creates a volume and announces it on `transport`.
    ///
    /// Fails without sending anything if a local file path cannot be read.
    pub fn new(fields: VolumeFields, transport: Rc<dyn Transport>) -> Result<Self> {
        let volume = Self {
            inner: Rc::new(VolumeInner {
                channel: SyncChannel::new(transport),
                state: RefCell::new(VolumeState {
                    path: fields.path,
                    id: fields.id,
                    name: fields.name,
                    opacity: fields.opacity,
                    colormap: fields.colormap,
                    colorbar_visible: fields.colorbar_visible,
                    cal_min: fields.cal_min,
                    cal_max: fields.cal_max,
                    colormap_invert: false,
                }),
                observers: Observers::default(),
            }),
        };
        let state = volume.wire_state()?;
        volume.inner.channel.open(Self::MODEL_NAME, state);
        Ok(volume)
    }

    /// Returns the data source, if set.
    #[must_use]
    pub fn path(&self) -> Option<DataSource> {
        self.inner.state.borrow().path.clone()
    }

    /// Returns the identifier (`""` when unset).
    #[must_use]
    pub fn id(&self) -> String {
        self.inner.state.borrow().id.clone()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.state.borrow().name.clone()
    }

    /// Returns the opacity.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.inner.state.borrow().opacity
    }

    /// Returns the colormap name.
    #[must_use]
    pub fn colormap(&self) -> String {
        self.inner.state.borrow().colormap.clone()
    }

    /// Returns whether the colorbar is shown.
    #[must_use]
    pub fn colorbar_visible(&self) -> bool {
        self.inner.state.borrow().colorbar_visible
    }

    /// Returns the lower calibration bound (`None` = header default).
    #[must_use]
    pub fn cal_min(&self) -> Option<f64> {
        self.inner.state.borrow().cal_min
    }

    /// Returns the upper calibration bound (`None` = header default).
    #[must_use]
    pub fn cal_max(&self) -> Option<f64> {
        self.inner.state.borrow().cal_max
    }

    /// Returns whether the colormap is inverted.
    #[must_use]
    pub fn colormap_invert(&self) -> bool {
        self.inner.state.borrow().colormap_invert
    }

    /// Sets the data source. Fails if a different source is already set.
    pub fn set_path(&self, path: impl Into<DataSource>) -> Result<()> {
        self.apply(VolumeUpdate::Path(Some(path.into())), Origin::Host)
    }

    /// Sets the identifier. Fails if a different id is already set.
    pub fn set_id(&self, id: impl Into<String>) -> Result<()> {
        self.apply(VolumeUpdate::Id(id.into()), Origin::Host)
    }

    /// Sets the display name.
    pub fn set_name(&self, name: impl Into<String>) {
        self.apply_infallible(VolumeUpdate::Name(name.into()));
    }

    /// Sets the opacity. The frontend clamps it to `[0, 1]`.
    pub fn set_opacity(&self, opacity: f64) {
        self.apply_infallible(VolumeUpdate::Opacity(opacity));
    }

    /// Sets the colormap by name. Names outside the built-in catalog are
    /// sent as-is.
    pub fn set_colormap(&self, colormap: impl Into<String>) {
        self.apply_infallible(VolumeUpdate::Colormap(colormap.into()));
    }

    /// Shows or hides the colorbar.
    pub fn set_colorbar_visible(&self, visible: bool) {
        self.apply_infallible(VolumeUpdate::ColorbarVisible(visible));
    }

    /// Sets the lower calibration bound.
    pub fn set_cal_min(&self, cal_min: Option<f64>) {
        self.apply_infallible(VolumeUpdate::CalMin(cal_min));
    }

    /// Sets the upper calibration bound.
    pub fn set_cal_max(&self, cal_max: Option<f64>) {
        self.apply_infallible(VolumeUpdate::CalMax(cal_max));
    }

    /// Inverts the colormap.
    pub fn set_colormap_invert(&self, invert: bool) {
        self.apply_infallible(VolumeUpdate::ColormapInvert(invert));
    }

    /// Registers an observer for every field change, host or frontend.
    pub fn observe(&self, observer: impl FnMut(&FieldChange<VolumeField>) + 'static) {
        self.inner.observers.push(observer);
    }

    fn apply_infallible(&self, update: VolumeUpdate) {
        if let Err(err) = self.apply(update, Origin::Host) {
            log::error!("volume {}: {err}", self.inner.channel.model());
        }
    }

    fn apply(&self, update: VolumeUpdate, origin: Origin) -> Result<()> {
        self.check(&update)?;
        match update {
            VolumeUpdate::Path(path) => {
                self.assign(VolumeField::Path, path, origin, |s| &mut s.path)
            }
            VolumeUpdate::Id(id) => self.assign(VolumeField::Id, id, origin, |s| &mut s.id),
            VolumeUpdate::Name(name) => {
                self.assign(VolumeField::Name, name, origin, |s| &mut s.name)
            }
            VolumeUpdate::Opacity(opacity) => {
                self.assign(VolumeField::Opacity, opacity, origin, |s| &mut s.opacity)
            }
            VolumeUpdate::Colormap(colormap) => {
                self.assign(VolumeField::Colormap, colormap, origin, |s| &mut s.colormap)
            }
            VolumeUpdate::ColorbarVisible(visible) => {
                self.assign(VolumeField::ColorbarVisible, visible, origin, |s| {
                    &mut s.colorbar_visible
                })
            }
            VolumeUpdate::CalMin(cal_min) => {
                self.assign(VolumeField::CalMin, cal_min, origin, |s| &mut s.cal_min)
            }
            VolumeUpdate::CalMax(cal_max) => {
                self.assign(VolumeField::CalMax, cal_max, origin, |s| &mut s.cal_max)
            }
            VolumeUpdate::ColormapInvert(invert) => {
                self.assign(VolumeField::ColormapInvert, invert, origin, |s| {
                    &mut s.colormap_invert
                })
            }
        }
    }

    fn check(&self, update: &VolumeUpdate) -> Result<()> {
        let state = self.inner.state.borrow();
        match update {
            VolumeUpdate::Id(id) => {
                check_write_once(MODEL_VOLUME, "id", &state.id, id, state.id.is_empty())
            }
            VolumeUpdate::Path(path) => {
                let unset = state.path.as_ref().map_or(true, DataSource::is_empty);
                check_write_once(MODEL_VOLUME, "path", &state.path, path, unset)
            }
            _ => Ok(()),
        }
    }

    /// Stores `value` in the field `slot` points at, then publishes the change.
    fn assign<T: FieldValue>(
        &self,
        field: VolumeField,
        value: T,
        origin: Origin,
        slot: impl Fn(&mut VolumeState) -> &mut T,
    ) -> Result<()> {
        if *slot(&mut *self.inner.state.borrow_mut()) == value {
            return Ok(());
        }
        // Encode before mutating so an unreadable file leaves the volume untouched.
        let wire = match origin {
            Origin::Host => Some(value.to_wire()?),
            Origin::Frontend => None,
        };
        let new = value.describe();
        let old = std::mem::replace(slot(&mut *self.inner.state.borrow_mut()), value);
        self.publish(
            FieldChange {
                field,
                old: old.describe(),
                new,
                origin,
            },
            wire,
        );
        Ok(())
    }

    fn publish(&self, change: FieldChange<VolumeField>, wire: Option<Value>) {
        if let Some(wire) = wire {
            self.inner.channel.update(change.field.wire_name(), wire);
        }
        self.inner.observers.notify(&change);
    }

    fn parse_update(&self, field: VolumeField, value: &Value) -> Result<VolumeUpdate> {
        Ok(match field {
            VolumeField::Path => {
                let state = self.inner.state.borrow();
                VolumeUpdate::Path(parse_path(MODEL_VOLUME, state.path.as_ref(), value)?)
            }
            VolumeField::Id => VolumeUpdate::Id(parse_field(MODEL_VOLUME, "id", value)?),
            VolumeField::Name => VolumeUpdate::Name(parse_field(MODEL_VOLUME, "name", value)?),
            VolumeField::Opacity => {
                VolumeUpdate::Opacity(parse_field(MODEL_VOLUME, "opacity", value)?)
            }
            VolumeField::Colormap => {
                VolumeUpdate::Colormap(parse_field(MODEL_VOLUME, "colormap", value)?)
            }
            VolumeField::ColorbarVisible => {
                VolumeUpdate::ColorbarVisible(parse_field(MODEL_VOLUME, "colorbarVisible", value)?)
            }
            VolumeField::CalMin => {
                VolumeUpdate::CalMin(parse_field(MODEL_VOLUME, "calMin", value)?)
            }
            VolumeField::CalMax => {
                VolumeUpdate::CalMax(parse_field(MODEL_VOLUME, "calMax", value)?)
            }
            VolumeField::ColormapInvert => {
                VolumeUpdate::ColormapInvert(parse_field(MODEL_VOLUME, "colormapInvert", value)?)
            }
        })
    }
}

impl Entity for Volume {
    type Field = VolumeField;

    const MODEL_NAME: &'static str = MODEL_VOLUME;

    fn model_id(&self) -> niivue_core::ModelId {
        self.inner.channel.model()
    }

    fn id(&self) -> String {
        Volume::id(self)
    }

    fn wire_state(&self) -> Result<Map<String, Value>> {
        let state = self.inner.state.borrow().clone();
        let path = state
            .path
            .as_ref()
            .map(DataSource::to_wire)
            .transpose()?
            .unwrap_or(Value::Null);

        let mut wire = Map::new();
        wire.insert(VolumeField::Path.wire_name().into(), path);
        wire.insert(VolumeField::Id.wire_name().into(), state.id.into());
        wire.insert(VolumeField::Name.wire_name().into(), state.name.into());
        wire.insert(VolumeField::Opacity.wire_name().into(), state.opacity.into());
        wire.insert(VolumeField::Colormap.wire_name().into(), state.colormap.into());
        wire.insert(
            VolumeField::ColorbarVisible.wire_name().into(),
            state.colorbar_visible.into(),
        );
        wire.insert(VolumeField::CalMin.wire_name().into(), state.cal_min.into());
        wire.insert(VolumeField::CalMax.wire_name().into(), state.cal_max.into());
        wire.insert(
            VolumeField::ColormapInvert.wire_name().into(),
            state.colormap_invert.into(),
        );
        Ok(wire)
    }

    fn apply_remote(&self, state: &Map<String, Value>) -> Result<()> {
        let mut updates = Vec::with_capacity(state.len());
        for (name, value) in state {
            match VolumeField::from_wire(name) {
                Some(field) => {
                    let update = self.parse_update(field, value)?;
                    self.check(&update)?;
                    updates.push(update);
                }
                None => log::warn!("volume {}: ignoring unknown field '{name}'", self.model_id()),
            }
        }
        for update in updates {
            self.apply(update, Origin::Frontend)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Volume")
            .field("model", &self.inner.channel.model())
            .field("id", &state.id)
            .field("path", &state.path)
            .field("name", &state.name)
            .finish_non_exhaustive()
    }
}
