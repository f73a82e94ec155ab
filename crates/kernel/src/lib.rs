//! Agora forum kernel.
//!
//! Post content formatting and summaries, and the account registration
//! workflow. The `agora` binary is a thin command-line driver over this
//! library.

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod models;
pub mod registration;
pub mod services;

pub use content::ContentPipeline;
pub use error::{ContentError, ContentResult, RegistrationError, RegistrationResult};
pub use registration::{RegistrationInput, RegistrationService};
