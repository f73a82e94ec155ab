//! New account registration.

mod input;
mod service;

pub use input::{CaptchaChallenge, RegistrationInput};
pub use service::{QCLOUD_SCOPE, RegistrationObserver, RegistrationService, UserSaving};
