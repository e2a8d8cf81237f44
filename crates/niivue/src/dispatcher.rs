//! Per-widget callback registry.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::events::{Event, EventKind};

/// Handle returned by registration, used to unregister a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Callback = Rc<RefCell<Box<dyn FnMut(&Event)>>>;

/// Ordered subscribers per [`EventKind`].
///
/// Callbacks may register or unregister callbacks (including themselves)
/// while an event is being dispatched. A callback removed mid-dispatch is not
/// invoked afterwards; one added mid-dispatch first runs on the next event.
#[derive(Default)]
pub struct Dispatcher {
    next_id: Cell<u64>,
    handlers: RefCell<HashMap<EventKind, Vec<(CallbackId, Callback)>>>,
}

impl Dispatcher {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback for `kind`.
    pub fn register(&self, kind: EventKind, callback: impl FnMut(&Event) + 'static) -> CallbackId {
        let id = CallbackId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let callback: Box<dyn FnMut(&Event)> = Box::new(callback);
        self.handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(RefCell::new(callback))));
        log::debug!("registered callback {id} for {kind}");
        id
    }

    /// Removes a callback. Returns false if it was not registered for `kind`.
    pub fn unregister(&self, kind: EventKind, id: CallbackId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(registered, _)| *registered != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&kind);
        }
        removed
    }

    /// Returns true if at least one callback listens to `kind`.
    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        self.subscriber_count(kind) > 0
    }

    /// Returns the number of callbacks registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.borrow().get(&kind).map_or(0, Vec::len)
    }

    fn is_registered(&self, kind: EventKind, id: CallbackId) -> bool {
        self.handlers
            .borrow()
            .get(&kind)
            .is_some_and(|list| list.iter().any(|(registered, _)| *registered == id))
    }

    /// Invokes every callback registered for the event's kind, in
    /// registration order.
    ///
    /// A panicking callback is logged and skipped; the rest still run.
    /// Returns the number of callbacks that completed.
    pub fn dispatch(&self, event: &Event) -> usize {
        let kind = event.kind();
        let subscribers: Vec<(CallbackId, Callback)> = self
            .handlers
            .borrow()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        log::debug!("dispatching {kind} to {} callback(s)", subscribers.len());

        let mut completed = 0;
        for (id, callback) in subscribers {
            if !self.is_registered(kind, id) {
                continue;
            }
            let Ok(mut callback) = callback.try_borrow_mut() else {
                log::warn!("callback {id} for {kind} is already running, skipping re-entrant call");
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| (*callback)(event))) {
                Ok(()) => completed += 1,
                Err(_) => log::error!("callback {id} for {kind} panicked"),
            }
        }
        completed
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        let mut counts: Vec<_> = handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort_unstable();
        f.debug_struct("Dispatcher").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let dispatcher = Dispatcher::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        for n in 0..3 {
            let calls = Rc::clone(&calls);
            dispatcher.register(EventKind::VolumeUpdated, move |_| calls.borrow_mut().push(n));
        }
        assert_eq!(dispatcher.dispatch(&Event::VolumeUpdated), 3);
        assert_eq!(*calls.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let dispatcher = Dispatcher::new();
        let id = dispatcher.register(EventKind::MouseUp, |_| {});
        assert!(!dispatcher.unregister(EventKind::DragRelease, id));
        assert!(dispatcher.unregister(EventKind::MouseUp, id));
        assert!(!dispatcher.unregister(EventKind::MouseUp, id));
        assert!(!dispatcher.has_subscribers(EventKind::MouseUp));
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let dispatcher = Dispatcher::new();
        let hits = Rc::new(Cell::new(0));
        dispatcher.register(EventKind::VolumeUpdated, |_| panic!("boom"));
        let counter = Rc::clone(&hits);
        dispatcher.register(EventKind::VolumeUpdated, move |_| counter.set(counter.get() + 1));

        assert_eq!(dispatcher.dispatch(&Event::VolumeUpdated), 1);
        assert_eq!(dispatcher.dispatch(&Event::VolumeUpdated), 1);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_callback_can_unregister_a_later_one() {
        let dispatcher = Rc::new(Dispatcher::new());
        let later = Rc::new(Cell::new(None));
        let hits = Rc::new(Cell::new(0));

        let d = Rc::clone(&dispatcher);
        let target = Rc::clone(&later);
        dispatcher.register(EventKind::VolumeUpdated, move |_| {
            if let Some(id) = target.get() {
                d.unregister(EventKind::VolumeUpdated, id);
            }
        });
        let counter = Rc::clone(&hits);
        let id = dispatcher.register(EventKind::VolumeUpdated, move |_| {
            counter.set(counter.get() + 1);
        });
        later.set(Some(id));

        dispatcher.dispatch(&Event::VolumeUpdated);
        assert_eq!(hits.get(), 0);
        assert_eq!(dispatcher.subscriber_count(EventKind::VolumeUpdated), 1);
    }
}
