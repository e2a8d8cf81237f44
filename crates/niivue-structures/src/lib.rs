//! Synchronized entities for niivue-rs.
//!
//! - [`Volume`]: a 3D/4D image
//! - [`Mesh`]: a surface with optional [`MeshLayer`]s
//! - [`DataSource`]: where the frontend loads either from

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod mesh;
pub mod source;
pub mod volume;

use serde::de::DeserializeOwned;
use serde_json::Value;

use niivue_core::{NiivueError, Result};

pub use mesh::{Mesh, MeshField, MeshFields, MeshLayer};
pub use source::DataSource;
pub use volume::{Volume, VolumeField, VolumeFields};

/// Model name of volumes on the wire.
pub const MODEL_VOLUME: &str = "Volume";

/// Model name of meshes on the wire.
pub const MODEL_MESH: &str = "Mesh";

/// Decodes one field of a remote update.
pub(crate) fn parse_field<T: DeserializeOwned>(
    model: &'static str,
    field: &str,
    value: &Value,
) -> Result<T> {
    T::deserialize(value).map_err(|err| NiivueError::MalformedUpdate {
        model,
        field: field.to_string(),
        reason: err.to_string(),
    })
}

/// A value stored in one synchronized field.
///
/// `describe` is what observers see as old/new; `to_wire` is what the
/// frontend receives and may read local files.
pub(crate) trait FieldValue: PartialEq {
    fn describe(&self) -> Value;

    fn to_wire(&self) -> Result<Value> {
        Ok(self.describe())
    }
}

impl FieldValue for String {
    fn describe(&self) -> Value {
        Value::from(self.as_str())
    }
}

impl FieldValue for f64 {
    fn describe(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for bool {
    fn describe(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for Option<f64> {
    fn describe(&self) -> Value {
        Value::from(*self)
    }
}

impl FieldValue for [u8; 4] {
    fn describe(&self) -> Value {
        Value::from(self.to_vec())
    }
}

impl FieldValue for Option<DataSource> {
    fn describe(&self) -> Value {
        Value::from(self.as_ref().map(DataSource::name))
    }

    fn to_wire(&self) -> Result<Value> {
        self.as_ref().map_or(Ok(Value::Null), DataSource::to_wire)
    }
}

/// Decodes a remote `path` update.
///
/// The frontend reports a local file as the inline `{name, data}` form it was
/// sent; that is accepted only as an echo of the current source.
pub(crate) fn parse_path(
    model: &'static str,
    current: Option<&DataSource>,
    value: &Value,
) -> Result<Option<DataSource>> {
    if value.is_null() {
        return Ok(None);
    }
    if let Some(source) = DataSource::from_wire(value) {
        return Ok(Some(source));
    }
    match current {
        Some(source) if source.matches_wire(value) => Ok(Some(source.clone())),
        _ => Err(NiivueError::MalformedUpdate {
            model,
            field: "path".to_string(),
            reason: "expected a URL string or the current file".to_string(),
        }),
    }
}
