//! Collaborator contracts and their default adapters.
//!
//! The kernel calls out to settings, censorship, validation, persistence and
//! event dispatch through these traits. Each module also ships a thin
//! default implementation.

pub mod censor;
pub mod events;
pub mod settings;
pub mod user_store;
pub mod validator;

pub use censor::{AllowAllCensor, CensorVerdict, CensorshipService};
pub use events::{EventSink, TracingEventSink};
pub use settings::{DEFAULT_SCOPE, InMemorySettings, SettingsRepository};
pub use user_store::{PgUserStore, UserStore};
pub use validator::{UserValidator, ValidationPayload, Validator};
