//! The user performing an action.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anonymous actor UUID (nil UUID).
pub const ANONYMOUS_ACTOR_ID: Uuid = Uuid::nil();

/// Identity of whoever triggers a mutation (revise, hide, register...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    /// An authenticated, non-admin actor.
    pub fn user(id: Uuid) -> Self {
        Self {
            id,
            is_admin: false,
        }
    }

    /// An administrator.
    pub fn admin(id: Uuid) -> Self {
        Self { id, is_admin: true }
    }

    /// The unauthenticated visitor (self-registration).
    pub fn anonymous() -> Self {
        Self {
            id: ANONYMOUS_ACTOR_ID,
            is_admin: false,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_ACTOR_ID
    }
}
