//! Wire protocol between the host and the NiiVue frontend.
//!
//! Every frame is a JSON object tagged by `method`:
//!
//! - `open`: a new widget model with its full state (host → frontend)
//! - `update`: a partial state change keyed by camelCase field name (both ways)
//! - `custom`: a tagged message; commands outbound, `{event, data}` inbound

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::colormap::ColormapSpec;

/// Prefix used when one model references another inside its state.
pub const MODEL_REFERENCE_PREFIX: &str = "IPY_MODEL_";

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a synchronized widget model.
///
/// Unlike the user-facing `id` field of a volume or mesh, a model id is
/// assigned by the host at construction and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(u64);

impl ModelId {
    /// Allocates a fresh model id.
    pub fn next() -> Self {
        Self(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Returns the reference string used to embed this model in another
    /// model's state (e.g. the viewer's volume list).
    #[must_use]
    pub fn reference(self) -> String {
        format!("{MODEL_REFERENCE_PREFIX}{}", self.0)
    }

    /// Parses a reference string produced by [`ModelId::reference`].
    pub fn from_reference(reference: &str) -> Option<Self> {
        reference
            .strip_prefix(MODEL_REFERENCE_PREFIX)?
            .parse()
            .ok()
            .map(Self)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A host → frontend frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Announces a new model and its complete state.
    Open {
        model: ModelId,
        model_name: String,
        state: Map<String, Value>,
    },
    /// Carries one or more changed fields of an existing model.
    Update {
        model: ModelId,
        state: Map<String, Value>,
    },
    /// Carries a one-way command for the viewer.
    Custom { model: ModelId, content: Command },
}

impl OutboundMessage {
    /// Returns the model this frame addresses.
    #[must_use]
    pub fn model(&self) -> ModelId {
        match self {
            Self::Open { model, .. } | Self::Update { model, .. } | Self::Custom { model, .. } => {
                *model
            }
        }
    }

    /// Returns a short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Update { .. } => "update",
            Self::Custom { .. } => "custom",
        }
    }
}

/// A fire-and-forget action for the viewer, encoded as `{type, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Command {
    /// Saves the current scene as an image with the given file name.
    SaveScene(String),
    /// Registers a custom colormap under `name`.
    AddColormap { name: String, cmap: ColormapSpec },
    /// Sets the display gamma.
    SetGamma(f64),
}

impl Command {
    /// Returns the wire tag of this command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SaveScene(_) => "save_scene",
            Self::AddColormap { .. } => "add_colormap",
            Self::SetGamma(_) => "set_gamma",
        }
    }
}

/// A frontend → host frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum InboundMessage {
    /// The frontend changed one or more fields of a model.
    Update {
        model: ModelId,
        state: Map<String, Value>,
    },
    /// The frontend raised an event or requested a collection change.
    Custom { content: CustomMessage },
}

impl InboundMessage {
    /// Parses a single JSON frame.
    pub fn from_json(frame: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// The `{event, data}` body of an inbound custom frame.
///
/// Missing keys default to an empty event name and an empty mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMessage {
    #[serde(default)]
    pub event: String,
    #[serde(default = "empty_object")]
    pub data: Value,
}

impl CustomMessage {
    /// Creates a custom message.
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_reference_round_trip() {
        let id = ModelId::next();
        assert_eq!(ModelId::from_reference(&id.reference()), Some(id));
        assert_eq!(ModelId::from_reference("IPY_MODEL_abc"), None);
        assert_eq!(ModelId::from_reference("7"), None);
    }

    #[test]
    fn test_model_ids_are_unique() {
        let a = ModelId::next();
        let b = ModelId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_command_wire_shape() {
        let msg = serde_json::to_value(Command::SaveScene("scene.png".into())).unwrap();
        assert_eq!(msg, json!({"type": "save_scene", "data": "scene.png"}));

        let msg = serde_json::to_value(Command::SetGamma(1.5)).unwrap();
        assert_eq!(msg, json!({"type": "set_gamma", "data": 1.5}));
    }

    #[test]
    fn test_inbound_custom_defaults() {
        let msg = InboundMessage::from_json(r#"{"method":"custom","content":{}}"#).unwrap();
        let InboundMessage::Custom { content } = msg else {
            panic!("expected custom frame");
        };
        assert_eq!(content.event, "");
        assert_eq!(content.data, json!({}));
    }

    #[test]
    fn test_inbound_update() {
        let msg = InboundMessage::from_json(
            r#"{"method":"update","model":3,"state":{"opacity":0.25}}"#,
        )
        .unwrap();
        match msg {
            InboundMessage::Update { model, state } => {
                assert_eq!(model.get(), 3);
                assert_eq!(state["opacity"], json!(0.25));
            }
            InboundMessage::Custom { .. } => panic!("expected update frame"),
        }
    }

    #[test]
    fn test_inbound_rejects_unknown_method() {
        assert!(InboundMessage::from_json(r#"{"method":"close"}"#).is_err());
    }
}
