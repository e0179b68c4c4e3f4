//! Deferred mutation requests.
//!
//! Listeners and Custom handlers run while the engine is mid-operation, so
//! they cannot mutate the instance store directly. They queue commands
//! instead; the engine executes them at the start of the next tick (or on
//! [`crate::BuffEngine::flush_commands`]).

use std::collections::VecDeque;

use crate::definition::BuffKind;
use crate::instance::{EntityId, InstanceId};

use super::ApplyOptions;

/// A mutation requested from inside event or trigger handling.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BuffCommand {
    Apply {
        definition_id: String,
        target: EntityId,
        options: ApplyOptions,
    },
    Remove {
        instance: InstanceId,
    },
    RemoveByKind {
        target: EntityId,
        kind: BuffKind,
    },
    NotifyEvent {
        target: EntityId,
        event: String,
    },
}

impl BuffCommand {
    /// Entity the command operates on, if it names one directly.
    pub fn target(&self) -> Option<EntityId> {
        match self {
            Self::Apply { target, .. }
            | Self::RemoveByKind { target, .. }
            | Self::NotifyEvent { target, .. } => Some(*target),
            Self::Remove { .. } => None,
        }
    }
}

/// Bounded FIFO of deferred commands.
#[derive(Clone, Debug)]
pub struct CommandQueue {
    pending: VecDeque<BuffCommand>,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity,
        }
    }

    /// Queues a command. Returns false (and logs) if the queue is full.
    pub fn push(&mut self, command: BuffCommand) -> bool {
        if self.pending.len() >= self.capacity {
            tracing::warn!(
                capacity = self.capacity,
                ?command,
                "command queue full; dropping command"
            );
            return false;
        }
        self.pending.push_back(command);
        true
    }

    /// Queues an application of `definition_id` to `target`.
    pub fn apply(
        &mut self,
        definition_id: impl Into<String>,
        target: EntityId,
        options: ApplyOptions,
    ) -> bool {
        self.push(BuffCommand::Apply {
            definition_id: definition_id.into(),
            target,
            options,
        })
    }

    pub fn remove(&mut self, instance: InstanceId) -> bool {
        self.push(BuffCommand::Remove { instance })
    }

    pub fn remove_by_kind(&mut self, target: EntityId, kind: BuffKind) -> bool {
        self.push(BuffCommand::RemoveByKind { target, kind })
    }

    pub fn notify_event(&mut self, target: EntityId, event: impl Into<String>) -> bool {
        self.push(BuffCommand::NotifyEvent {
            target,
            event: event.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuffCommand> {
        self.pending.iter()
    }

    /// Takes every queued command, leaving the queue empty.
    pub(crate) fn take(&mut self) -> Vec<BuffCommand> {
        self.pending.drain(..).collect()
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(crate::EngineConfig::DEFAULT_MAX_PENDING_COMMANDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_drops_commands() {
        let mut queue = CommandQueue::new(2);
        assert!(queue.remove(InstanceId(1)));
        assert!(queue.notify_event(EntityId(1), "hit"));
        assert!(!queue.remove_by_kind(EntityId(1), BuffKind::Debuff));
        assert_eq!(queue.len(), 2);

        let taken = queue.take();
        assert_eq!(taken[0], BuffCommand::Remove { instance: InstanceId(1) });
        assert_eq!(taken[1].target(), Some(EntityId(1)));
        assert!(queue.is_empty());
    }
}
