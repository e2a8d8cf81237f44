//! The viewer widget: options, collections and inbound message routing.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec4;
use serde_json::{Map, Value};

use niivue_core::{
    CustomMessage, Entity, InboundMessage, ModelId, NiivueError, Options, Result, SyncChannel,
    Transport,
};
use niivue_structures::{Mesh, MeshFields, Volume, VolumeFields};

use crate::collection::{AddRequest, Collection};
use crate::dispatcher::{CallbackId, Dispatcher};
use crate::events::{Event, EventKind};
use crate::MODEL_VIEWER;

/// Default widget height in pixels.
pub const DEFAULT_HEIGHT: u32 = 300;

const FIELD_HEIGHT: &str = "height";
const FIELD_OPTIONS: &str = "_opts";
const FIELD_VOLUMES: &str = "_volumes";
const FIELD_MESHES: &str = "_meshes";

pub(crate) struct ViewerInner {
    pub(crate) channel: SyncChannel,
    height: Cell<u32>,
    pub(crate) options: RefCell<Options>,
    pub(crate) volumes: RefCell<Collection<Volume>>,
    pub(crate) meshes: RefCell<Collection<Mesh>>,
    pub(crate) dispatcher: Dispatcher,
}

/// Host-side proxy of an in-browser NiiVue viewer.
///
/// `NiiVue` is a cheap handle; clones share the same widget, so callbacks can
/// capture a clone and drive the viewer from inside an event.
///
/// ```
/// use std::rc::Rc;
/// use niivue::{MessageLog, NiiVue, VolumeFields};
///
/// let log = Rc::new(MessageLog::new());
/// let nv = NiiVue::new(log.clone());
/// nv.load_volumes([VolumeFields::from_path("mni152.nii.gz").with_id("mni")])
///     .unwrap();
/// assert_eq!(nv.get_volume_index_by_id("mni"), Some(0));
/// ```
#[derive(Clone)]
pub struct NiiVue {
    pub(crate) inner: Rc<ViewerInner>,
}

impl NiiVue {
    /// Creates a viewer with the default height and no options.
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self::with_options(DEFAULT_HEIGHT, Options::new(), transport)
    }

    /// Creates a viewer with the given height and options.
    pub fn with_options(height: u32, options: Options, transport: Rc<dyn Transport>) -> Self {
        let viewer = Self {
            inner: Rc::new(ViewerInner {
                channel: SyncChannel::new(transport),
                height: Cell::new(height),
                options: RefCell::new(options),
                volumes: RefCell::new(Collection::new()),
                meshes: RefCell::new(Collection::new()),
                dispatcher: Dispatcher::new(),
            }),
        };
        viewer.inner.channel.open(MODEL_VIEWER, viewer.wire_state());
        log::info!(
            "niivue viewer {} created ({} px, {} option(s))",
            viewer.model_id(),
            height,
            viewer.inner.options.borrow().len()
        );
        viewer
    }

    /// Returns the widget's model id.
    pub fn model_id(&self) -> ModelId {
        self.inner.channel.model()
    }

    /// Returns the transport shared by the viewer and its entities.
    pub fn transport(&self) -> Rc<dyn Transport> {
        self.inner.channel.transport()
    }

    fn wire_state(&self) -> Map<String, Value> {
        let mut state = Map::new();
        state.insert(FIELD_HEIGHT.into(), self.inner.height.get().into());
        state.insert(
            FIELD_OPTIONS.into(),
            Value::Object(self.inner.options.borrow().to_wire()),
        );
        state.insert(
            FIELD_VOLUMES.into(),
            self.inner.volumes.borrow().references().into(),
        );
        state.insert(
            FIELD_MESHES.into(),
            self.inner.meshes.borrow().references().into(),
        );
        state
    }

    // ------------------------------------------------------------------
    // Height and options
    // ------------------------------------------------------------------

    /// Returns the widget height in pixels.
    pub fn height(&self) -> u32 {
        self.inner.height.get()
    }

    /// Sets the widget height in pixels.
    pub fn set_height(&self, height: u32) {
        if self.inner.height.replace(height) != height {
            self.inner.channel.update(FIELD_HEIGHT, height.into());
        }
    }

    /// Returns a copy of the current options.
    pub fn options(&self) -> Options {
        self.inner.options.borrow().clone()
    }

    /// Returns the current value of one option.
    pub fn option(&self, name: &str) -> Option<Value> {
        self.inner.options.borrow().get(name).cloned()
    }

    /// Validates and sets one option, then sends the options mapping.
    ///
    /// Nothing is sent when validation fails or the value is unchanged.
    pub fn set_option(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let changed = {
            let mut options = self.inner.options.borrow_mut();
            let before = options.get(name).cloned();
            options.set(name, value)?;
            options.get(name) != before.as_ref()
        };
        if changed {
            self.send_options();
        }
        Ok(())
    }

    /// Sets the crosshair color (RGBA, components in `[0, 1]`).
    pub fn set_crosshair_color(&self, rgba: &[f64]) -> Result<()> {
        self.set_color_option("crosshair_color", rgba)
    }

    /// Sets the selection box color (RGBA, components in `[0, 1]`).
    pub fn set_selection_box_color(&self, rgba: &[f64]) -> Result<()> {
        self.set_color_option("selection_box_color", rgba)
    }

    /// Returns the crosshair color, if set.
    pub fn crosshair_color(&self) -> Option<Vec4> {
        self.inner.options.borrow().color("crosshair_color")
    }

    /// Returns the selection box color, if set.
    pub fn selection_box_color(&self) -> Option<Vec4> {
        self.inner.options.borrow().color("selection_box_color")
    }

    fn set_color_option(&self, name: &str, rgba: &[f64]) -> Result<()> {
        let changed = {
            let mut options = self.inner.options.borrow_mut();
            let before = options.get(name).cloned();
            options.set_color(name, rgba)?;
            options.get(name) != before.as_ref()
        };
        if changed {
            self.send_options();
        }
        Ok(())
    }

    fn send_options(&self) {
        let wire = self.inner.options.borrow().to_wire();
        self.inner.channel.update(FIELD_OPTIONS, Value::Object(wire));
    }

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    /// Returns a snapshot of the loaded volumes.
    pub fn volumes(&self) -> Vec<Volume> {
        self.inner.volumes.borrow().snapshot()
    }

    /// Returns a snapshot of the loaded meshes.
    pub fn meshes(&self) -> Vec<Mesh> {
        self.inner.meshes.borrow().snapshot()
    }

    /// Replaces every volume with new ones built from `items`, in order.
    ///
    /// If any volume fails to build, the collection is left unchanged.
    pub fn load_volumes<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<VolumeFields>,
    {
        let transport = self.transport();
        let volumes = items
            .into_iter()
            .map(|fields| Volume::new(fields.into(), Rc::clone(&transport)))
            .collect::<Result<Vec<_>>>()?;
        log::info!("loading {} volume(s)", volumes.len());
        self.inner.volumes.borrow_mut().replace(volumes);
        self.send_volumes();
        Ok(())
    }

    /// Replaces every mesh with new ones built from `items`, in order.
    pub fn load_meshes<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<MeshFields>,
    {
        let transport = self.transport();
        let meshes = items
            .into_iter()
            .map(|fields| Mesh::new(fields.into(), Rc::clone(&transport)))
            .collect::<Result<Vec<_>>>()?;
        log::info!("loading {} mesh(es)", meshes.len());
        self.inner.meshes.borrow_mut().replace(meshes);
        self.send_meshes();
        Ok(())
    }

    /// Builds a volume and appends it.
    pub fn add_volume(&self, fields: impl Into<VolumeFields>) -> Result<Volume> {
        let volume = Volume::new(fields.into(), self.transport())?;
        self.inner.volumes.borrow_mut().push(volume.clone());
        self.send_volumes();
        Ok(volume)
    }

    /// Builds a mesh and appends it.
    pub fn add_mesh(&self, fields: impl Into<MeshFields>) -> Result<Mesh> {
        let mesh = Mesh::new(fields.into(), self.transport())?;
        self.inner.meshes.borrow_mut().push(mesh.clone());
        self.send_meshes();
        Ok(mesh)
    }

    /// Returns the index of the first volume with the given id.
    pub fn get_volume_index_by_id(&self, id: &str) -> Option<usize> {
        self.inner.volumes.borrow().index_by_id(id)
    }

    /// Returns the index of the first mesh with the given id.
    pub fn get_mesh_index_by_id(&self, id: &str) -> Option<usize> {
        self.inner.meshes.borrow().index_by_id(id)
    }

    /// Returns the first volume with the given id.
    pub fn volume_by_id(&self, id: &str) -> Option<Volume> {
        self.inner.volumes.borrow().find_by_id(id)
    }

    /// Returns the first mesh with the given id.
    pub fn mesh_by_id(&self, id: &str) -> Option<Mesh> {
        self.inner.meshes.borrow().find_by_id(id)
    }

    fn send_volumes(&self) {
        let references = self.inner.volumes.borrow().references();
        self.inner.channel.update(FIELD_VOLUMES, references.into());
    }

    fn send_meshes(&self) {
        let references = self.inner.meshes.borrow().references();
        self.inner.channel.update(FIELD_MESHES, references.into());
    }

    fn add_volume_from_frontend(&self, request: AddRequest) -> Result<()> {
        let fields = VolumeFields::from_value(request.fields)?;
        let volume = Volume::new(fields, self.transport())?;
        let position = self
            .inner
            .volumes
            .borrow_mut()
            .insert_at(request.target_index, volume);
        log::debug!("frontend added volume at {position}");
        self.send_volumes();
        Ok(())
    }

    fn add_mesh_from_frontend(&self, request: AddRequest) -> Result<()> {
        let fields = MeshFields::from_value(request.fields)?;
        let mesh = Mesh::new(fields, self.transport())?;
        let position = self
            .inner
            .meshes
            .borrow_mut()
            .insert_at(request.target_index, mesh);
        log::debug!("frontend added mesh at {position}");
        self.send_meshes();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    /// Registers a callback receiving the reshaped [`Event`] for `kind`.
    pub fn on(&self, kind: EventKind, callback: impl FnMut(&Event) + 'static) -> CallbackId {
        self.inner.dispatcher.register(kind, callback)
    }

    /// Removes a callback. Removing one that is not registered does nothing.
    pub fn unregister(&self, kind: EventKind, id: CallbackId) -> bool {
        self.inner.dispatcher.unregister(kind, id)
    }

    // ------------------------------------------------------------------
    // Inbound messages
    // ------------------------------------------------------------------

    /// Parses and handles one JSON frame from the frontend.
    pub fn handle_frame(&self, frame: &str) -> Result<()> {
        log::trace!("inbound frame: {frame}");
        self.handle_message(InboundMessage::from_json(frame)?)
    }

    /// Handles one message from the frontend.
    pub fn handle_message(&self, message: InboundMessage) -> Result<()> {
        match message {
            InboundMessage::Update { model, state } => self.apply_update(model, &state),
            InboundMessage::Custom { content } => self.handle_custom_message(content),
        }
    }

    /// Handles an `{event, data}` message.
    ///
    /// `add_volume` / `add_mesh` insert a frontend-created entity and never
    /// reach callbacks. Any other event is dropped when nothing listens to it,
    /// which includes every name outside [`EventKind::ALL`].
    pub fn handle_custom_message(&self, message: CustomMessage) -> Result<()> {
        let CustomMessage { event, data } = message;
        match event.as_str() {
            "add_volume" => {
                return self.add_volume_from_frontend(AddRequest::from_payload(&event, data)?)
            }
            "add_mesh" => {
                return self.add_mesh_from_frontend(AddRequest::from_payload(&event, data)?)
            }
            _ => {}
        }

        let Ok(kind) = event.parse::<EventKind>() else {
            log::debug!("ignoring unknown event '{event}'");
            return Ok(());
        };
        if !self.inner.dispatcher.has_subscribers(kind) {
            log::trace!("no callbacks for {kind}, dropping");
            return Ok(());
        }

        let reshaped = {
            let volumes = self.inner.volumes.borrow();
            let meshes = self.inner.meshes.borrow();
            Event::reshape(kind, data, &volumes, &meshes)
        };
        match reshaped {
            Ok(Some(event)) => {
                self.inner.dispatcher.dispatch(&event);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => {
                log::warn!("dropping {kind}: {err}");
                Err(err)
            }
        }
    }

    fn apply_update(&self, model: ModelId, state: &Map<String, Value>) -> Result<()> {
        if model == self.model_id() {
            return self.apply_remote(state);
        }
        let volume = self.inner.volumes.borrow().find_by_model(model);
        if let Some(volume) = volume {
            return volume.apply_remote(state);
        }
        let mesh = self.inner.meshes.borrow().find_by_model(model);
        if let Some(mesh) = mesh {
            return mesh.apply_remote(state);
        }
        Err(NiivueError::ModelNotFound(model))
    }

    /// Applies a frontend update of the viewer's own fields without echoing.
    fn apply_remote(&self, state: &Map<String, Value>) -> Result<()> {
        let malformed = |field: &str, reason: &str| NiivueError::MalformedUpdate {
            model: MODEL_VIEWER,
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let height = match state.get(FIELD_HEIGHT) {
            Some(value) => Some(
                value
                    .as_u64()
                    .and_then(|h| u32::try_from(h).ok())
                    .ok_or_else(|| malformed(FIELD_HEIGHT, "expected a pixel count"))?,
            ),
            None => None,
        };
        let options = match state.get(FIELD_OPTIONS) {
            Some(Value::Object(wire)) => Some(wire),
            Some(_) => return Err(malformed(FIELD_OPTIONS, "expected a mapping")),
            None => None,
        };

        let mut volumes = self.inner.volumes.borrow().clone();
        if let Some(references) = state.get(FIELD_VOLUMES) {
            volumes.reorder(references, FIELD_VOLUMES)?;
        }
        let mut meshes = self.inner.meshes.borrow().clone();
        if let Some(references) = state.get(FIELD_MESHES) {
            meshes.reorder(references, FIELD_MESHES)?;
        }

        for name in state.keys() {
            if ![FIELD_HEIGHT, FIELD_OPTIONS, FIELD_VOLUMES, FIELD_MESHES].contains(&name.as_str())
            {
                log::warn!("viewer {}: ignoring unknown field '{name}'", self.model_id());
            }
        }

        if let Some(height) = height {
            self.inner.height.set(height);
        }
        if let Some(wire) = options {
            self.inner.options.borrow_mut().replace_from_wire(wire);
        }
        *self.inner.volumes.borrow_mut() = volumes;
        *self.inner.meshes.borrow_mut() = meshes;
        Ok(())
    }
}

impl std::fmt::Debug for NiiVue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NiiVue")
            .field("model", &self.model_id())
            .field("height", &self.height())
            .field("volumes", &self.inner.volumes.borrow().len())
            .field("meshes", &self.inner.meshes.borrow().len())
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}
