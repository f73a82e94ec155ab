//! Account registration workflow.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::input::{CaptchaChallenge, RegistrationInput};
use crate::error::{RegistrationError, RegistrationResult};
use crate::models::{Actor, DomainEvent, User, UserStatus};
use crate::services::settings::{loose_eq_int, loose_eq_str};
use crate::services::{
    CensorshipService, DEFAULT_SCOPE, EventSink, SettingsRepository, UserStore, ValidationPayload,
    Validator,
};

/// Settings scope of the Tencent Cloud CAPTCHA provider.
pub const QCLOUD_SCOPE: &str = "qcloud";

/// `register_type` value for registration without CAPTCHA.
const REGISTER_TYPE_NO_CAPTCHA: i64 = 2;

/// A user about to be validated and saved.
///
/// Observers may change anything on `user`; the changes are validated and
/// persisted.
#[derive(Debug)]
pub struct UserSaving<'a> {
    pub user: &'a mut User,
    pub actor: &'a Actor,
    pub input: &'a RegistrationInput,
}

/// Hook run before a new user is validated.
///
/// Returning an error aborts the registration with nothing persisted.
#[async_trait]
pub trait RegistrationObserver: Send + Sync {
    async fn saving(&self, event: &mut UserSaving<'_>) -> RegistrationResult<()>;
}

/// Registers new accounts.
pub struct RegistrationService {
    settings: Arc<dyn SettingsRepository>,
    censor: Arc<dyn CensorshipService>,
    validator: Arc<dyn Validator>,
    events: Arc<dyn EventSink>,
    store: Arc<dyn UserStore>,
    observers: Vec<Arc<dyn RegistrationObserver>>,
}

impl RegistrationService {
    pub fn new(
        settings: Arc<dyn SettingsRepository>,
        censor: Arc<dyn CensorshipService>,
        validator: Arc<dyn Validator>,
        events: Arc<dyn EventSink>,
        store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            settings,
            censor,
            validator,
            events,
            store,
            observers: Vec::new(),
        }
    }

    /// Add an observer. Observers run in the order they were added.
    pub fn with_observer(mut self, observer: Arc<dyn RegistrationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Validate, build and persist a new user from raw form input.
    ///
    /// Domain failures (censorship, missing reason, validation) return
    /// before the store is touched. On success the returned user carries
    /// its assigned id and all of its events have been dispatched.
    pub async fn register(
        &self,
        actor: &Actor,
        input: RegistrationInput,
    ) -> RegistrationResult<User> {
        let username = input.get("username").unwrap_or_default();
        let verdict = self.censor.check_text(username, "username").map_err(|e| {
            warn!(field = %e.field, "registration rejected by censor");
            e
        })?;

        let review_required = self.settings.flag("register_validate", DEFAULT_SCOPE);
        if review_required && !input.has("register_reason") {
            return Err(RegistrationError::ConfigurationPrecondition(
                "a registration reason is required while new accounts are reviewed".to_string(),
            ));
        }

        let mut user = User::register(input.new_user())?;

        let captcha = self.captcha_challenge(&input);
        debug!(captcha = captcha.is_some(), "derived captcha requirement");

        if self
            .settings
            .get("site_mode", DEFAULT_SCOPE)
            .is_some_and(|mode| loose_eq_str(&mode, "pay"))
        {
            user.expired_at = Some(Utc::now());
        }

        if review_required || verdict.held_for_review {
            user.status = UserStatus::PendingReview;
        }

        {
            let mut saving = UserSaving {
                user: &mut user,
                actor,
                input: &input,
            };
            for observer in &self.observers {
                observer.saving(&mut saving).await?;
            }
        }

        let payload = validation_payload(&user, &input, captcha.as_ref());
        self.validator.validate(&payload).await?;

        let id = self.store.insert(&user).await?;
        user.id = Some(id);

        info!(
            user_id = %id,
            username = %user.username,
            pending_review = user.is_pending_review(),
            "user registered"
        );

        self.events
            .dispatch(DomainEvent::UserRegistered {
                user_id: user.id,
                username: user.username.clone(),
                actor_id: actor.id,
                pending_review: user.is_pending_review(),
            })
            .await;
        for event in user.release_events() {
            self.events.dispatch(event).await;
        }

        Ok(user)
    }

    /// CAPTCHA answer to verify, or `None` when CAPTCHA is off.
    pub fn captcha_challenge(&self, input: &RegistrationInput) -> Option<CaptchaChallenge> {
        let enabled = self.settings.flag("register_captcha", DEFAULT_SCOPE)
            && self.settings.flag("qcloud_captcha", QCLOUD_SCOPE)
            && !self
                .settings
                .get("register_type", DEFAULT_SCOPE)
                .is_some_and(|t| loose_eq_int(&t, REGISTER_TYPE_NO_CAPTCHA));

        enabled.then(|| CaptchaChallenge::from_input(input))
    }
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService")
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// User attributes plus the raw password fields and CAPTCHA answer.
///
/// An empty password removes the key, so the validator accepts the
/// password-less account.
fn validation_payload(
    user: &User,
    input: &RegistrationInput,
    captcha: Option<&CaptchaChallenge>,
) -> ValidationPayload {
    let mut payload = user.attributes();

    if input.get("password") == Some("") {
        payload.remove("password");
    } else {
        payload.insert("password".into(), input.value("password"));
    }
    payload.insert(
        "password_confirmation".into(),
        input.value("password_confirmation"),
    );
    payload.insert(
        "captcha".into(),
        captcha.map_or(Value::Null, CaptchaChallenge::to_value),
    );

    payload
}
