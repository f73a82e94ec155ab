//! Domain events and the per-entity outbox.
//!
//! Entities raise events while they are mutated; the events sit in the
//! entity's outbox until the owning service has persisted the entity and
//! drains them in FIFO order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events raised by posts and users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A post's content actually changed.
    PostRevised {
        post_id: Option<Uuid>,
        thread_id: Uuid,
        actor_id: Uuid,
    },
    /// A post was soft-deleted.
    PostHidden {
        post_id: Option<Uuid>,
        thread_id: Uuid,
        actor_id: Uuid,
        options: serde_json::Value,
    },
    /// A soft-deleted post was restored.
    PostRestored {
        post_id: Option<Uuid>,
        thread_id: Uuid,
        actor_id: Uuid,
        options: serde_json::Value,
    },
    /// A new user was persisted by the registration workflow.
    UserRegistered {
        user_id: Option<Uuid>,
        username: String,
        actor_id: Uuid,
        pending_review: bool,
    },
    /// Event raised by an extension (e.g. a registration observer).
    Custom {
        name: String,
        payload: serde_json::Value,
    },
}

impl DomainEvent {
    /// Stable machine name, used as a log field.
    pub fn name(&self) -> &str {
        match self {
            DomainEvent::PostRevised { .. } => "post_revised",
            DomainEvent::PostHidden { .. } => "post_hidden",
            DomainEvent::PostRestored { .. } => "post_restored",
            DomainEvent::UserRegistered { .. } => "user_registered",
            DomainEvent::Custom { name, .. } => name,
        }
    }
}

/// FIFO queue of events pending dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outbox {
    pending: VecDeque<DomainEvent>,
}

impl Outbox {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event.
    pub fn raise(&mut self, event: DomainEvent) {
        self.pending.push_back(event);
    }

    /// Take every pending event, oldest first, leaving the outbox empty.
    pub fn release(&mut self) -> Vec<DomainEvent> {
        self.pending.drain(..).collect()
    }

    /// Pending events, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &DomainEvent> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn custom(name: &str) -> DomainEvent {
        DomainEvent::Custom {
            name: name.to_string(),
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn release_is_fifo_and_clears() {
        let mut outbox = Outbox::new();
        outbox.raise(custom("a"));
        outbox.raise(custom("b"));
        outbox.raise(custom("c"));

        let names: Vec<String> = outbox
            .release()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(outbox.is_empty());
        assert!(outbox.release().is_empty());
    }

    #[test]
    fn event_serializes_with_tag() {
        let event = DomainEvent::PostRevised {
            post_id: None,
            thread_id: Uuid::nil(),
            actor_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "post_revised");
    }
}
