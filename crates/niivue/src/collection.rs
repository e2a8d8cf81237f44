//! Ordered collections of volumes and meshes.

use serde_json::{Map, Value};

use niivue_core::{Entity, ModelId, NiivueError, Result};

/// An ordered list of entities.
///
/// Every mutation swaps in a new list; [`Collection::snapshot`] hands out
/// copies, so callers never observe later changes through a snapshot.
#[derive(Debug, Clone)]
pub struct Collection<E: Entity> {
    items: Vec<E>,
}

impl<E: Entity> Default for Collection<E> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<E: Entity> Collection<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current order.
    pub fn snapshot(&self) -> Vec<E> {
        self.items.clone()
    }

    /// Returns the number of entities.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the entity at `index`.
    pub fn get(&self, index: usize) -> Option<E> {
        self.items.get(index).cloned()
    }

    /// Returns the index of the first entity whose `id` equals `id`.
    ///
    /// `""` is a valid query and matches entities without an id.
    pub fn index_by_id(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|e| e.id() == id)
    }

    /// Returns the first entity whose `id` equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<E> {
        self.index_by_id(id).and_then(|i| self.get(i))
    }

    /// Returns the entity with the given model id.
    pub fn find_by_model(&self, model: ModelId) -> Option<E> {
        self.items.iter().find(|e| e.model_id() == model).cloned()
    }

    /// Replaces every entity, keeping the given order.
    pub fn replace(&mut self, items: Vec<E>) {
        self.items = items;
    }

    /// Appends an entity.
    pub fn push(&mut self, item: E) {
        let mut items = self.items.clone();
        items.push(item);
        self.items = items;
    }

    /// Inserts at `index` when it lies within `[0, len]`, appends otherwise.
    ///
    /// Returns the position the entity ended up at.
    pub fn insert_at(&mut self, index: Option<i64>, item: E) -> usize {
        let position = insert_position(index, self.items.len());
        let mut items = self.items.clone();
        items.insert(position, item);
        self.items = items;
        position
    }

    /// Returns the model references of every entity, in order.
    pub fn references(&self) -> Vec<String> {
        self.items.iter().map(|e| e.model_id().reference()).collect()
    }

    /// Reorders or drops entities to match a reference list from the frontend.
    ///
    /// Every reference must name an entity already in the collection.
    pub fn reorder(&mut self, references: &Value, field: &'static str) -> Result<()> {
        let malformed = |reason: &str| NiivueError::MalformedUpdate {
            model: crate::MODEL_VIEWER,
            field: field.to_string(),
            reason: reason.to_string(),
        };
        let list = references
            .as_array()
            .ok_or_else(|| malformed("expected a list of model references"))?;

        let mut items = Vec::with_capacity(list.len());
        for reference in list {
            let model = reference
                .as_str()
                .and_then(ModelId::from_reference)
                .ok_or_else(|| malformed("expected a model reference string"))?;
            let item = self
                .find_by_model(model)
                .ok_or(NiivueError::ModelNotFound(model))?;
            items.push(item);
        }
        self.items = items;
        Ok(())
    }
}

/// Resolves a requested insert index against a collection of length `len`.
pub fn insert_position(index: Option<i64>, len: usize) -> usize {
    match index.map(usize::try_from) {
        Some(Ok(i)) if i <= len => i,
        Some(_) => {
            log::warn!("insert index {index:?} outside [0, {len}], appending");
            len
        }
        None => len,
    }
}

/// The envelope of a frontend-initiated add: entity fields plus an optional
/// target position that is not itself a field of the entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AddRequest {
    pub target_index: Option<i64>,
    pub fields: Value,
}

impl AddRequest {
    /// Splits an inbound `add_volume` / `add_mesh` payload.
    ///
    /// A non-integer `index` is ignored with a warning.
    pub fn from_payload(event: &str, data: Value) -> Result<Self> {
        let Value::Object(mut fields) = data else {
            return Err(NiivueError::MalformedEvent {
                event: event.to_string(),
                reason: "payload must be a mapping of entity fields".to_string(),
            });
        };
        let target_index = match fields.remove("index") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let index = value.as_i64();
                if index.is_none() {
                    log::warn!("{event}: ignoring non-integer index {value}");
                }
                index
            }
        };
        Ok(Self {
            target_index,
            fields: Value::Object(fields),
        })
    }

    /// Returns the fields as a mapping.
    pub fn fields(&self) -> Map<String, Value> {
        self.fields.as_object().cloned().unwrap_or_default()
    }
}
