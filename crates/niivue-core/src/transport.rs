//! Outbound transports and the per-model sync channel.
//!
//! A [`Transport`] is the seam to whatever actually carries frames to the
//! frontend (a kernel comm, a websocket, a pipe). Sends are fire-and-forget:
//! a transport that fails to deliver logs the failure and drops the frame.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::protocol::{Command, ModelId, OutboundMessage};

/// Carries outbound frames to the frontend.
pub trait Transport {
    /// Sends one frame. Never blocks waiting for a reply.
    fn send(&self, message: OutboundMessage);
}

/// A transport that discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn send(&self, message: OutboundMessage) {
        log::trace!("dropping {} frame for model {}", message.kind(), message.model());
    }
}

/// A transport that records frames in memory.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: RefCell<Vec<OutboundMessage>>,
}

impl MessageLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded frame.
    #[must_use]
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.borrow().clone()
    }

    /// Removes and returns every recorded frame.
    pub fn take(&self) -> Vec<OutboundMessage> {
        self.messages.take()
    }

    /// Returns the number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    /// Returns the recorded commands, in send order.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.messages
            .borrow()
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::Custom { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Transport for MessageLog {
    fn send(&self, message: OutboundMessage) {
        self.messages.borrow_mut().push(message);
    }
}

/// A transport writing newline-delimited JSON frames.
pub struct JsonLinesTransport<W: Write> {
    writer: RefCell<W>,
}

impl<W: Write> JsonLinesTransport<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: RefCell::new(writer),
        }
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_frame(&self, message: &OutboundMessage) -> crate::Result<()> {
        let mut writer = self.writer.borrow_mut();
        serde_json::to_writer(&mut *writer, message)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Transport for JsonLinesTransport<W> {
    fn send(&self, message: OutboundMessage) {
        if let Err(err) = self.write_frame(&message) {
            log::error!(
                "failed to write {} frame for model {}: {err}",
                message.kind(),
                message.model()
            );
        }
    }
}

/// The sync endpoint of a single model: its id plus the shared transport.
#[derive(Clone)]
pub struct SyncChannel {
    model: ModelId,
    transport: Rc<dyn Transport>,
}

impl SyncChannel {
    /// Allocates a new model id on `transport`.
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self {
            model: ModelId::next(),
            transport,
        }
    }

    /// Returns the model id.
    #[must_use]
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Returns the shared transport, for creating sibling models.
    #[must_use]
    pub fn transport(&self) -> Rc<dyn Transport> {
        Rc::clone(&self.transport)
    }

    /// Announces the model with its full state.
    pub fn open(&self, model_name: &str, state: Map<String, Value>) {
        log::debug!("open {model_name} model {}", self.model);
        self.transport.send(OutboundMessage::Open {
            model: self.model,
            model_name: model_name.to_string(),
            state,
        });
    }

    /// Sends a single changed field.
    pub fn update(&self, field: &str, value: Value) {
        log::debug!("update model {} field {field}", self.model);
        let mut state = Map::new();
        state.insert(field.to_string(), value);
        self.transport.send(OutboundMessage::Update {
            model: self.model,
            state,
        });
    }

    /// Sends a command addressed to this model.
    pub fn command(&self, command: Command) {
        log::debug!("send command {} from model {}", command.name(), self.model);
        self.transport.send(OutboundMessage::Custom {
            model: self.model,
            content: command,
        });
    }
}
