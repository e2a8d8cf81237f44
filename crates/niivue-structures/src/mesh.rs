//! Meshes: surface geometry with optional per-vertex data layers.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use niivue_core::entity::{check_write_once, Entity, FieldChange, Observers, Origin, SyncField};
use niivue_core::{NiivueError, Result, SyncChannel, Transport};

use crate::source::DataSource;
use crate::{parse_field, parse_path, FieldValue, MODEL_MESH};

/// A per-vertex data layer drawn on a mesh.
///
/// Layers are synchronized as one list; replacing or appending a layer
/// sends the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshLayer {
    #[serde(skip_serializing)]
    pub path: DataSource,
    pub opacity: f64,
    pub colormap: String,
    #[serde(alias = "colormap_negative")]
    pub colormap_negative: String,
    #[serde(alias = "use_negative_cmap")]
    pub use_negative_cmap: bool,
    #[serde(alias = "cal_min")]
    pub cal_min: Option<f64>,
    #[serde(alias = "cal_max")]
    pub cal_max: Option<f64>,
}

impl Default for MeshLayer {
    fn default() -> Self {
        Self {
            path: DataSource::url(""),
            opacity: 0.5,
            colormap: "warm".to_string(),
            colormap_negative: "winter".to_string(),
            use_negative_cmap: false,
            cal_min: None,
            cal_max: None,
        }
    }
}

impl MeshLayer {
    /// A layer read from `path` with default display properties.
    pub fn new(path: impl Into<DataSource>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Builds the wire form, reading a local layer file.
    pub fn to_wire(&self) -> Result<Value> {
        let mut wire = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        wire.insert("path".to_string(), self.path.to_wire()?);
        Ok(Value::Object(wire))
    }
}

fn layers_to_wire(layers: &[MeshLayer]) -> Result<Value> {
    layers
        .iter()
        .map(MeshLayer::to_wire)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

impl FieldValue for Vec<MeshLayer> {
    fn describe(&self) -> Value {
        Value::from(self.iter().map(|l| l.path.name()).collect::<Vec<_>>())
    }

    fn to_wire(&self) -> Result<Value> {
        layers_to_wire(self)
    }
}

/// Synchronized fields of a [`Mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshField {
    Path,
    Id,
    Name,
    Rgba255,
    Opacity,
    Visible,
    Layers,
}

impl SyncField for MeshField {
    const ALL: &'static [Self] = &[
        Self::Path,
        Self::Id,
        Self::Name,
        Self::Rgba255,
        Self::Opacity,
        Self::Visible,
        Self::Layers,
    ];

    fn wire_name(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Id => "id",
            Self::Name => "name",
            Self::Rgba255 => "rgba255",
            Self::Opacity => "opacity",
            Self::Visible => "visible",
            Self::Layers => "layers",
        }
    }
}

/// Constructor fields of a [`Mesh`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeshFields {
    pub path: Option<DataSource>,
    pub id: String,
    pub name: String,
    pub rgba255: [u8; 4],
    pub opacity: f64,
    pub visible: bool,
    pub layers: Vec<MeshLayer>,
}

impl Default for MeshFields {
    fn default() -> Self {
        Self {
            path: None,
            id: String::new(),
            name: String::new(),
            rgba255: [0, 0, 0, 0],
            opacity: 1.0,
            visible: true,
            layers: Vec::new(),
        }
    }
}

impl MeshFields {
    /// Fields for a mesh loaded from `path`.
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

    /// Sets the base color.
    #[must_use]
    pub fn with_rgba255(mut self, rgba255: [u8; 4]) -> Self {
        self.rgba255 = rgba255;
        self
    }

    /// Appends a data layer.
    #[must_use]
    pub fn with_layer(mut self, layer: MeshLayer) -> Self {
        self.layers.push(layer);
        self
    }
}

impl TryFrom<Value> for MeshFields {
    type Error = NiivueError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

#[derive(Debug, Clone)]
struct MeshState {
    path: Option<DataSource>,
    id: String,
    name: String,
    rgba255: [u8; 4],
    opacity: f64,
    visible: bool,
    layers: Vec<MeshLayer>,
}

enum MeshUpdate {
    Path(Option<DataSource>),
    Id(String),
    Name(String),
    Rgba255([u8; 4]),
    Opacity(f64),
    Visible(bool),
    Layers(Vec<MeshLayer>),
}

struct MeshInner {
    channel: SyncChannel,
    state: RefCell<MeshState>,
    observers: Observers<MeshField>,
}

/// A surface mesh shown by the viewer.
///
/// Like [`crate::Volume`], a `Mesh` is a shared handle whose setters are
/// mirrored to the frontend; `id` and `path` are write-once.
#[derive(Clone)]
pub struct Mesh {
    inner: Rc<MeshInner>,
}

impl Mesh {
    /// Creates a mesh and announces it on `transport`.
    pub fn new(fields: MeshFields, transport: Rc<dyn Transport>) -> Result<Self> {
        let mesh = Self {
            inner: Rc::new(MeshInner {
                channel: SyncChannel::new(transport),
                state: RefCell::new(MeshState {
                    path: fields.path,
                    id: fields.id,
                    name: fields.name,
                    rgba255: fields.rgba255,
                    opacity: fields.opacity,
                    visible: fields.visible,
                    layers: fields.layers,
                }),
                observers: Observers::default(),
            }),
        };
        let state = mesh.wire_state()?;
        mesh.inner.channel.open(Self::MODEL_NAME, state);
        Ok(mesh)
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

    /// Returns the base color.
    #[must_use]
    pub fn rgba255(&self) -> [u8; 4] {
        self.inner.state.borrow().rgba255
    }

    /// Returns the opacity.
    #[must_use]
    pub fn opacity(&self) -> f64 {
        self.inner.state.borrow().opacity
    }

    /// Returns whether the mesh is drawn.
    #[must_use]
    pub fn visible(&self) -> bool {
        self.inner.state.borrow().visible
    }

    /// Returns a copy of the data layers.
    #[must_use]
    pub fn layers(&self) -> Vec<MeshLayer> {
        self.inner.state.borrow().layers.clone()
    }

    /// Sets the data source. Fails if a different source is already set.
    pub fn set_path(&self, path: impl Into<DataSource>) -> Result<()> {
        self.apply(MeshUpdate::Path(Some(path.into())), Origin::Host)
    }

    /// Sets the identifier. Fails if a different id is already set.
    pub fn set_id(&self, id: impl Into<String>) -> Result<()> {
        self.apply(MeshUpdate::Id(id.into()), Origin::Host)
    }

    /// Sets the display name.
    pub fn set_name(&self, name: impl Into<String>) {
        self.apply_infallible(MeshUpdate::Name(name.into()));
    }

    /// Sets the base color.
    pub fn set_rgba255(&self, rgba255: [u8; 4]) {
        self.apply_infallible(MeshUpdate::Rgba255(rgba255));
    }

    /// Sets the opacity.
    pub fn set_opacity(&self, opacity: f64) {
        self.apply_infallible(MeshUpdate::Opacity(opacity));
    }

    /// Shows or hides the mesh.
    pub fn set_visible(&self, visible: bool) {
        self.apply_infallible(MeshUpdate::Visible(visible));
    }

    /// Replaces all data layers.
    ///
    /// Local layer files are read first; nothing changes if one is unreadable.
    pub fn set_layers(&self, layers: Vec<MeshLayer>) -> Result<()> {
        self.apply(MeshUpdate::Layers(layers), Origin::Host)
    }

    /// Appends a data layer.
    pub fn add_layer(&self, layer: MeshLayer) -> Result<()> {
        let mut layers = self.layers();
        layers.push(layer);
        self.set_layers(layers)
    }

    /// Registers an observer for every field change, host or frontend.
    pub fn observe(&self, observer: impl FnMut(&FieldChange<MeshField>) + 'static) {
        self.inner.observers.push(observer);
    }

    fn apply_infallible(&self, update: MeshUpdate) {
        if let Err(err) = self.apply(update, Origin::Host) {
            log::error!("mesh {}: {err}", self.inner.channel.model());
        }
    }

    fn apply(&self, update: MeshUpdate, origin: Origin) -> Result<()> {
        self.check(&update)?;
        match update {
            MeshUpdate::Path(path) => self.assign(MeshField::Path, path, origin, |s| &mut s.path),
            MeshUpdate::Id(id) => self.assign(MeshField::Id, id, origin, |s| &mut s.id),
            MeshUpdate::Name(name) => self.assign(MeshField::Name, name, origin, |s| &mut s.name),
            MeshUpdate::Rgba255(rgba) => {
                self.assign(MeshField::Rgba255, rgba, origin, |s| &mut s.rgba255)
            }
            MeshUpdate::Opacity(opacity) => {
                self.assign(MeshField::Opacity, opacity, origin, |s| &mut s.opacity)
            }
            MeshUpdate::Visible(visible) => {
                self.assign(MeshField::Visible, visible, origin, |s| &mut s.visible)
            }
            MeshUpdate::Layers(layers) => {
                self.assign(MeshField::Layers, layers, origin, |s| &mut s.layers)
            }
        }
    }

    fn check(&self, update: &MeshUpdate) -> Result<()> {
        let state = self.inner.state.borrow();
        match update {
            MeshUpdate::Id(id) => {
                check_write_once(MODEL_MESH, "id", &state.id, id, state.id.is_empty())
            }
            MeshUpdate::Path(path) => {
                let unset = state.path.as_ref().map_or(true, DataSource::is_empty);
                check_write_once(MODEL_MESH, "path", &state.path, path, unset)
            }
            _ => Ok(()),
        }
    }

    /// Stores `value` in the field `slot` points at, then publishes the change.
    fn assign<T: FieldValue>(
        &self,
        field: MeshField,
        value: T,
        origin: Origin,
        slot: impl Fn(&mut MeshState) -> &mut T,
    ) -> Result<()> {
        if *slot(&mut *self.inner.state.borrow_mut()) == value {
            return Ok(());
        }
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

    fn publish(&self, change: FieldChange<MeshField>, wire: Option<Value>) {
        if let Some(wire) = wire {
            self.inner.channel.update(change.field.wire_name(), wire);
        }
        self.inner.observers.notify(&change);
    }

    fn parse_update(&self, field: MeshField, value: &Value) -> Result<MeshUpdate> {
        Ok(match field {
            MeshField::Path => {
                let state = self.inner.state.borrow();
                MeshUpdate::Path(parse_path(MODEL_MESH, state.path.as_ref(), value)?)
            }
            MeshField::Id => MeshUpdate::Id(parse_field(MODEL_MESH, "id", value)?),
            MeshField::Name => MeshUpdate::Name(parse_field(MODEL_MESH, "name", value)?),
            MeshField::Rgba255 => MeshUpdate::Rgba255(parse_field(MODEL_MESH, "rgba255", value)?),
            MeshField::Opacity => MeshUpdate::Opacity(parse_field(MODEL_MESH, "opacity", value)?),
            MeshField::Visible => MeshUpdate::Visible(parse_field(MODEL_MESH, "visible", value)?),
            MeshField::Layers => MeshUpdate::Layers(parse_field(MODEL_MESH, "layers", value)?),
        })
    }
}

impl Entity for Mesh {
    type Field = MeshField;

    const MODEL_NAME: &'static str = MODEL_MESH;

    fn model_id(&self) -> niivue_core::ModelId {
        self.inner.channel.model()
    }

    fn id(&self) -> String {
        Mesh::id(self)
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
        wire.insert(MeshField::Path.wire_name().into(), path);
        wire.insert(MeshField::Id.wire_name().into(), state.id.into());
        wire.insert(MeshField::Name.wire_name().into(), state.name.into());
        wire.insert(MeshField::Rgba255.wire_name().into(), state.rgba255.to_vec().into());
        wire.insert(MeshField::Opacity.wire_name().into(), state.opacity.into());
        wire.insert(MeshField::Visible.wire_name().into(), state.visible.into());
        wire.insert(MeshField::Layers.wire_name().into(), layers_to_wire(&state.layers)?);
        Ok(wire)
    }

    fn apply_remote(&self, state: &Map<String, Value>) -> Result<()> {
        let mut updates = Vec::with_capacity(state.len());
        for (name, value) in state {
            match MeshField::from_wire(name) {
                Some(field) => {
                    let update = self.parse_update(field, value)?;
                    self.check(&update)?;
                    updates.push(update);
                }
                None => log::warn!("mesh {}: ignoring unknown field '{name}'", self.model_id()),
            }
        }
        for update in updates {
            self.apply(update, Origin::Frontend)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Mesh")
            .field("model", &self.inner.channel.model())
            .field("id", &state.id)
            .field("path", &state.path)
            .field("layers", &state.layers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use niivue_core::{MessageLog, OutboundMessage};
    use serde_json::json;

    fn mesh(fields: MeshFields) -> (Mesh, Rc<MessageLog>) {
        let log = Rc::new(MessageLog::new());
        let mesh = Mesh::new(fields, log.clone()).unwrap();
        (mesh, log)
    }

    #[test]
    fn test_open_state() {
        let (m, log) = mesh(
            MeshFields::from_path("brain.mz3")
                .with_id("lh")
                .with_rgba255([255, 128, 0, 255])
                .with_layer(MeshLayer::new("curv.mz3")),
        );
        let messages = log.take();
        let OutboundMessage::Open { state, .. } = &messages[0] else {
            panic!("expected open frame");
        };
        assert_eq!(state["rgba255"], json!([255, 128, 0, 255]));
        assert_eq!(state["layers"][0]["path"], json!("curv.mz3"));
        assert_eq!(state["layers"][0]["colormapNegative"], json!("winter"));
        assert_eq!(m.id(), "lh");
    }

    #[test]
    fn test_fields_from_mapping() {
        let fields = MeshFields::from_value(json!({
            "path": "brain.mz3",
            "rgba255": [10, 20, 30, 255],
            "layers": [{"path": "a.curv", "colormap_negative": "blue", "opacity": 0.7}],
        }))
        .unwrap();
        assert_eq!(fields.layers[0].colormap_negative, "blue");
        assert_eq!(fields.layers[0].colormap, "warm");
        assert!(MeshFields::from_value(json!({"rgba255": [300, 0, 0, 0]})).is_err());
    }

    #[test]
    fn test_id_and_path_are_write_once() {
        let (m, _) = mesh(MeshFields::default());
        m.set_id("a").unwrap();
        assert!(m.set_id("b").is_err());
        m.set_path("a.mz3").unwrap();
        m.set_path("a.mz3").unwrap();
        assert!(m.set_path("b.mz3").is_err());
        assert_eq!(m.id(), "a");
    }

    #[test]
    fn test_layers_sync_as_a_unit() {
        let (m, log) = mesh(MeshFields::from_path("brain.mz3"));
        log.take();

        m.add_layer(MeshLayer::new("a.curv")).unwrap();
        m.add_layer(MeshLayer::new("b.curv")).unwrap();

        let messages = log.take();
        assert_eq!(messages.len(), 2);
        let OutboundMessage::Update { state, .. } = &messages[1] else {
            panic!("expected update frame");
        };
        assert_eq!(state["layers"].as_array().map(Vec::len), Some(2));
        assert_eq!(m.layers().len(), 2);
    }

    #[test]
    fn test_unreadable_layer_file_changes_nothing() {
        let (m, log) = mesh(MeshFields::from_path("brain.mz3"));
        log.take();
        assert!(m.add_layer(MeshLayer::new(DataSource::file("/no/such.curv"))).is_err());
        assert!(m.layers().is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_remote_update() {
        let (m, log) = mesh(MeshFields::default().with_id("m"));
        log.take();

        let mut state = Map::new();
        state.insert("visible".into(), json!(false));
        state.insert("rgba255".into(), json!([1, 2, 3, 4]));
        m.apply_remote(&state).unwrap();

        assert!(!m.visible());
        assert_eq!(m.rgba255(), [1, 2, 3, 4]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_observer_sees_host_changes() {
        let (m, _) = mesh(MeshFields::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        m.observe(move |change| sink.borrow_mut().push(change.new.clone()));
        m.set_opacity(0.25);
        m.set_opacity(0.25);
        assert_eq!(*seen.borrow(), vec![json!(0.25)]);
    }
}
