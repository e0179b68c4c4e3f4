//! Lifecycle events and listeners.
//!
//! Events are delivered synchronously, one notification per occurrence, in
//! the order the engine performs the operations. Listeners get a
//! [`CommandQueue`] for any follow-up mutation they want.

use std::sync::{Arc, Mutex, PoisonError};

use crate::instance::{BuffInstance, InstanceId};

use super::CommandQueue;

/// A buff lifecycle notification carrying a snapshot of the instance.
#[derive(Clone, Debug)]
pub enum BuffEvent {
    Applied(BuffInstance),
    Removed(BuffInstance),
    /// Emitted after `Removed` when the removal was a natural expiry.
    Expired(BuffInstance),
    Stacked {
        instance: BuffInstance,
        new_stack: u32,
    },
}

impl BuffEvent {
    pub fn instance(&self) -> &BuffInstance {
        match self {
            Self::Applied(instance)
            | Self::Removed(instance)
            | Self::Expired(instance)
            | Self::Stacked { instance, .. } => instance,
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance().id()
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Applied(_) => "applied",
            Self::Removed(_) => "removed",
            Self::Expired(_) => "expired",
            Self::Stacked { .. } => "stacked",
        }
    }
}

/// Observer of buff lifecycle events.
pub trait BuffListener {
    fn on_event(&mut self, event: &BuffEvent, commands: &mut CommandQueue);
}

impl<F> BuffListener for F
where
    F: FnMut(&BuffEvent, &mut CommandQueue),
{
    fn on_event(&mut self, event: &BuffEvent, commands: &mut CommandQueue) {
        self(event, commands)
    }
}

/// Listener that records every event.
///
/// Clones share one log, so a test can keep a handle after registering the
/// recorder with an engine.
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<BuffEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the recorded events.
    pub fn take_events(&self) -> Vec<BuffEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *events)
    }

    /// Names of the recorded events, without draining.
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(BuffEvent::name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BuffListener for EventRecorder {
    fn on_event(&mut self, event: &BuffEvent, _commands: &mut CommandQueue) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
