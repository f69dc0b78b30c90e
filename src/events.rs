//! Event fan-out from matched rules to per-type handlers.

use std::collections::HashMap;

use crate::packet::Packet;
use crate::rules::{EventType, Rule};

/// A matched rule paired with the packet that triggered it. Borrowed for the
/// duration of dispatch only.
pub struct Event<'a> {
    pub event_type: EventType,
    pub rule: &'a Rule,
    pub packet: &'a Packet,
}

pub type EventCallback = Box<dyn Fn(&Event<'_>) + Send + Sync>;

/// Maps event types to ordered handler lists.
///
/// Registration takes `&mut self` and happens while the supervisor wires the
/// engine; the dispatcher is then frozen behind an `Arc`, so workers only
/// ever see a read-only handler table. Handlers run synchronously on the
/// worker thread that produced the event, in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    callbacks: HashMap<EventType, Vec<EventCallback>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_callback<F>(&mut self, event_type: EventType, callback: F)
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        self.callbacks
            .entry(event_type)
            .or_default()
            .push(Box::new(callback));
    }

    /// Run every handler registered for the event's type. Types with no
    /// handlers are silently ignored.
    pub fn dispatch(&self, event: &Event<'_>) {
        if let Some(callbacks) = self.callbacks.get(&event.event_type) {
            for callback in callbacks {
                callback(event);
            }
        }
    }
}
