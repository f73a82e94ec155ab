//! Domain models.

pub mod actor;
pub mod event;
pub mod post;
pub mod thread;
pub mod user;

pub use actor::Actor;
pub use event::{DomainEvent, Outbox};
pub use post::{Approval, Deletion, Post, ReplyInput};
pub use thread::{Classification, Thread};
pub use user::{NewUser, User, UserStatus};
