//! Entity trait and the shared field-sync machinery.
//!
//! An [`Entity`] is a synchronized record owned by a viewer collection
//! (volumes, meshes). Every field is closed and typed ([`SyncField`]); every
//! setter validates, mutates local state, emits one wire update and then
//! notifies observers, in that order.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::{NiivueError, Result};
use crate::protocol::ModelId;

/// Which side of the channel produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Set through the host API; already sent to the frontend.
    Host,
    /// Applied from an inbound update; not echoed back.
    Frontend,
}

/// A closed set of synchronized fields.
pub trait SyncField: Copy + Eq + fmt::Debug + 'static {
    /// Every field, in wire order.
    const ALL: &'static [Self];

    /// The camelCase wire name.
    fn wire_name(self) -> &'static str;

    /// Looks up a field by wire name.
    fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.wire_name() == name)
    }
}

/// A recorded change of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange<F> {
    pub field: F,
    pub old: Value,
    pub new: Value,
    pub origin: Origin,
}

type Observer<F> = Rc<RefCell<dyn FnMut(&FieldChange<F>)>>;

/// Observers of an entity's field changes.
///
/// Changes raised while observers are running are queued and delivered
/// once the current change has reached every observer, so each observer
/// sees every change in order and is never re-entered.
pub struct Observers<F> {
    observers: RefCell<Vec<Observer<F>>>,
    pending: RefCell<VecDeque<FieldChange<F>>>,
    notifying: Cell<bool>,
}

impl<F> Default for Observers<F> {
    fn default() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            notifying: Cell::new(false),
        }
    }
}

/// Clears the delivery state when a notification round ends, including by
/// unwinding out of an observer.
struct Delivery<'a, F> {
    observers: &'a Observers<F>,
}

impl<F> Drop for Delivery<'_, F> {
    fn drop(&mut self) {
        self.observers.pending.borrow_mut().clear();
        self.observers.notifying.set(false);
    }
}

impl<F> Observers<F> {
    /// Adds an observer.
    pub fn push(&self, observer: impl FnMut(&FieldChange<F>) + 'static) {
        let observer: Observer<F> = Rc::new(RefCell::new(observer));
        self.observers.borrow_mut().push(observer);
    }

    /// Returns the number of observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Returns true if nothing observes the entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.borrow().is_empty()
    }
}

impl<F: Clone> Observers<F> {
    /// Calls every observer with `change`.
    ///
    /// Each change goes to the observers registered when its delivery
    /// starts. A panicking observer aborts the round and drops the queued
    /// changes, but every registration is kept.
    pub fn notify(&self, change: &FieldChange<F>) {
        self.pending.borrow_mut().push_back(change.clone());
        if self.notifying.replace(true) {
            return;
        }
        let _delivery = Delivery { observers: self };
        loop {
            let Some(next) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            let snapshot: Vec<Observer<F>> = self.observers.borrow().clone();
            for observer in snapshot {
                (&mut *observer.borrow_mut())(&next);
            }
        }
    }
}

impl<F> fmt::Debug for Observers<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}

/// Enforces the write-once rule for `id` and `path`.
///
/// Assigning to an unset field always succeeds, re-assigning the current
/// value is a no-op, and any other assignment fails.
pub fn check_write_once<T: PartialEq + fmt::Debug>(
    model: &'static str,
    field: &'static str,
    current: &T,
    attempted: &T,
    current_is_unset: bool,
) -> Result<()> {
    if current_is_unset || current == attempted {
        return Ok(());
    }
    Err(NiivueError::ImmutableField {
        model,
        field,
        current: format!("{current:?}"),
        attempted: format!("{attempted:?}"),
    })
}

/// A synchronized record held in a viewer collection.
///
/// Implementations are cheap-to-clone handles: clones share state, so a
/// handle passed to a callback is the live entity, not a snapshot.
pub trait Entity: Clone {
    /// The field set of this entity.
    type Field: SyncField;

    /// The model name announced to the frontend (e.g. `"Volume"`).
    const MODEL_NAME: &'static str;

    /// Returns the model id.
    fn model_id(&self) -> ModelId;

    /// Returns the user-facing identifier (`""` when unset).
    fn id(&self) -> String;

    /// Returns the full wire state, keyed by camelCase field name.
    fn wire_state(&self) -> Result<Map<String, Value>>;

    /// Applies a state update received from the frontend.
    ///
    /// Fields are applied without echoing them back. Unknown fields are
    /// skipped; a write-once violation fails the whole update before any
    /// field is applied.
    fn apply_remote(&self, state: &Map<String, Value>) -> Result<()>;

    /// Returns true if both handles refer to the same entity.
    fn same_entity(&self, other: &Self) -> bool {
        self.model_id() == other.model_id()
    }
}
