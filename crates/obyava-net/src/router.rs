//! Tagged event dispatch.
//!
//! Decoded frames fan out to per-kind handler lists: registration order is
//! invocation order, and a failing handler is logged without stopping the
//! rest of the chain. Malformed or unrecognized frames are logged and
//! dropped, never propagated.

use std::collections::HashMap;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use obyava_shared::protocol::{
    FavoritesEvent, FavoritesEventKind, GeneralEvent, GeneralEventKind,
};

/// An inbound event that reports its dispatch kind.
pub trait RoutedEvent: DeserializeOwned {
    type Kind: Copy + Eq + Hash + std::fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

impl RoutedEvent for GeneralEvent {
    type Kind = GeneralEventKind;

    fn kind(&self) -> GeneralEventKind {
        GeneralEvent::kind(self)
    }
}

impl RoutedEvent for FavoritesEvent {
    type Kind = FavoritesEventKind;

    fn kind(&self) -> FavoritesEventKind {
        FavoritesEvent::kind(self)
    }
}

/// Registration token returned by [`EventRouter::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

type Handler<E> = Box<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;

/// Dispatch table from event kind to its ordered handler list.
pub struct EventRouter<E: RoutedEvent> {
    handlers: HashMap<E::Kind, Vec<(HandlerId, Handler<E>)>>,
    next_id: u64,
}

impl<E: RoutedEvent> EventRouter<E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Register a handler for `kind`. Handlers for the same kind run in
    /// registration order.
    pub fn on(
        &mut self,
        kind: E::Kind,
        handler: impl Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Unregister a handler. Returns whether it was present.
    pub fn off(&mut self, kind: E::Kind, id: HandlerId) -> bool {
        match self.handlers.get_mut(&kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(hid, _)| *hid != id);
                before != list.len()
            }
            None => false,
        }
    }

    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Decode a raw frame and dispatch it.
    pub fn dispatch_frame(&self, frame: &str) {
        match serde_json::from_str::<E>(frame) {
            Ok(event) => self.dispatch(&event),
            Err(e) => warn!(error = %e, "dropping undecodable frame"),
        }
    }

    /// Invoke every handler registered for the event's kind.
    pub fn dispatch(&self, event: &E) {
        let kind = event.kind();
        let Some(list) = self.handlers.get(&kind) else {
            debug!(kind = ?kind, "no handlers registered for event");
            return;
        };
        for (id, handler) in list {
            if let Err(e) = handler(event) {
                warn!(kind = ?kind, handler = ?id, error = %e, "event handler failed");
            }
        }
    }
}

impl<E: RoutedEvent> Default for EventRouter<E> {
    fn default() -> Self {
        Self::new()
    }
}
