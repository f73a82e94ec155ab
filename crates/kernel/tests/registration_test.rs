#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Registration workflow tests.
//!
//! Drives `RegistrationService` with recording collaborators and checks
//! policy ordering, payload assembly and persistence guarantees.

use std::sync::Arc;

use agora_kernel::error::{FieldError, RegistrationError, RegistrationResult, ValidationFailure};
use agora_kernel::models::{Actor, DomainEvent, UserStatus};
use agora_kernel::registration::{
    QCLOUD_SCOPE, RegistrationInput, RegistrationObserver, RegistrationService, UserSaving,
};
use agora_kernel::services::{DEFAULT_SCOPE, InMemorySettings, UserValidator};
use agora_test_utils::{
    RecordingEventSink, RecordingUserStore, RecordingValidator, StubCensor, member,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

struct Harness {
    censor: Arc<StubCensor>,
    validator: Arc<RecordingValidator>,
    events: Arc<RecordingEventSink>,
    store: Arc<RecordingUserStore>,
    service: RegistrationService,
}

fn harness_with(
    settings: InMemorySettings,
    censor: StubCensor,
    validator: RecordingValidator,
    store: RecordingUserStore,
) -> Harness {
    let censor = Arc::new(censor);
    let validator = Arc::new(validator);
    let events = Arc::new(RecordingEventSink::new());
    let store = Arc::new(store);
    let service = RegistrationService::new(
        Arc::new(settings),
        censor.clone(),
        validator.clone(),
        events.clone(),
        store.clone(),
    );

    Harness {
        censor,
        validator,
        events,
        store,
        service,
    }
}

fn harness(settings: InMemorySettings) -> Harness {
    harness_with(
        settings,
        StubCensor::pass(),
        RecordingValidator::accepting(),
        RecordingUserStore::new(),
    )
}

fn input(pairs: &[(&str, &str)]) -> RegistrationInput {
    pairs.iter().copied().collect()
}

fn alice() -> RegistrationInput {
    input(&[
        ("username", "alice"),
        ("password", "secret1"),
        ("password_confirmation", "secret1"),
        ("register_ip", "10.0.0.1"),
        ("register_port", "5000"),
        ("captcha_ticket", "ticket"),
        ("captcha_rand_str", "rand"),
    ])
}

#[tokio::test]
async fn test_register_persists_and_dispatches() {
    let h = harness(InMemorySettings::new());
    let actor = member();

    let user = h.service.register(&actor, alice()).await.unwrap();

    assert!(user.id.is_some());
    assert_eq!(user.username, "alice");
    assert_eq!(user.register_port, Some(5000));
    assert_eq!(user.status, UserStatus::Normal);
    assert!(user.expired_at.is_none());
    assert!(user.verify_password("secret1"));
    assert_eq!(h.store.insert_count(), 1);
    assert_eq!(
        h.censor.checked(),
        vec![("alice".to_string(), "username".to_string())]
    );

    let events = h.events.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        DomainEvent::UserRegistered {
            user_id: user.id,
            username: "alice".into(),
            actor_id: actor.id,
            pending_review: false,
        }
    );
}

#[tokio::test]
async fn test_censored_username_aborts_before_anything_else() {
    let h = harness_with(
        InMemorySettings::new().with(DEFAULT_SCOPE, "register_validate", true),
        StubCensor::reject("admin"),
        RecordingValidator::accepting(),
        RecordingUserStore::new(),
    );

    let err = h
        .service
        .register(&Actor::anonymous(), input(&[("username", "admin")]))
        .await
        .unwrap_err();

    match err {
        RegistrationError::Censorship(violation) => {
            assert_eq!(violation.field, "username");
            assert_eq!(violation.phrase, "admin");
        }
        other => panic!("expected censorship failure, got {other:?}"),
    }
    assert_eq!(h.validator.call_count(), 0);
    assert_eq!(h.store.insert_count(), 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_missing_reason_under_review_policy_aborts() {
    let h = harness(InMemorySettings::new().with(DEFAULT_SCOPE, "register_validate", true));

    let err = h
        .service
        .register(&Actor::anonymous(), alice())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistrationError::ConfigurationPrecondition(_)));
    assert!(err.is_domain());
    assert_eq!(h.validator.call_count(), 0);
    assert_eq!(h.store.insert_count(), 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_reason_under_review_policy_holds_account() {
    let h = harness(InMemorySettings::new().with(DEFAULT_SCOPE, "register_validate", "1"));
    let mut form = alice();
    form.set("register_reason", "I like forums");

    let user = h.service.register(&Actor::anonymous(), form).await.unwrap();

    assert_eq!(user.status, UserStatus::PendingReview);
    assert_eq!(user.register_reason, "I like forums");
    assert!(matches!(
        h.events.events()[0],
        DomainEvent::UserRegistered {
            pending_review: true,
            ..
        }
    ));
}

#[tokio::test]
async fn test_review_policy_off_ignores_missing_reason() {
    let h = harness(InMemorySettings::new().with(DEFAULT_SCOPE, "register_validate", "0"));

    let user = h.service.register(&Actor::anonymous(), alice()).await.unwrap();
    assert_eq!(user.status, UserStatus::Normal);
}

#[tokio::test]
async fn test_censor_hold_puts_account_in_review() {
    let h = harness_with(
        InMemorySettings::new(),
        StubCensor::hold(),
        RecordingValidator::accepting(),
        RecordingUserStore::new(),
    );

    let user = h.service.register(&Actor::anonymous(), alice()).await.unwrap();
    assert!(user.is_pending_review());
}

#[tokio::test]
async fn test_empty_password_is_left_out_of_validation() {
    let h = harness(InMemorySettings::new());
    let form = input(&[("username", "bob"), ("password", "")]);

    let user = h.service.register(&Actor::anonymous(), form).await.unwrap();

    let payload = h.validator.last_payload().unwrap();
    assert!(!payload.contains_key("password"));
    assert_eq!(payload["username"], "bob");
    assert!(user.password.is_empty());
    assert!(!user.verify_password(""));
    assert_eq!(h.store.insert_count(), 1);
}

#[tokio::test]
async fn test_validation_payload_carries_raw_password() {
    let h = harness(InMemorySettings::new());

    let user = h.service.register(&Actor::anonymous(), alice()).await.unwrap();

    let payload = h.validator.last_payload().unwrap();
    assert_eq!(payload["password"], "secret1");
    assert_eq!(payload["password_confirmation"], "secret1");
    assert_eq!(payload["register_ip"], "10.0.0.1");
    assert_eq!(payload["captcha"], Value::Null);
    assert_ne!(user.password, "secret1");
}

#[tokio::test]
async fn test_captcha_requirement_truth_table() {
    for register_captcha in [false, true] {
        for qcloud_captcha in [false, true] {
            for captcha_less in [false, true] {
                let register_type: Value = if captcha_less { json!("2") } else { json!(1) };
                let settings = InMemorySettings::new()
                    .with(DEFAULT_SCOPE, "register_captcha", register_captcha)
                    .with(QCLOUD_SCOPE, "qcloud_captcha", qcloud_captcha)
                    .with(DEFAULT_SCOPE, "register_type", register_type);
                let h = harness(settings);
                let expected = register_captcha && qcloud_captcha && !captcha_less;

                let challenge = h.service.captcha_challenge(&alice());
                assert_eq!(
                    challenge.is_some(),
                    expected,
                    "register_captcha={register_captcha} qcloud_captcha={qcloud_captcha} \
                     captcha_less={captcha_less}"
                );

                h.service
                    .register(&Actor::anonymous(), alice())
                    .await
                    .unwrap();
                let payload = h.validator.last_payload().unwrap();
                if expected {
                    assert_eq!(payload["captcha"], json!(["ticket", "rand", "10.0.0.1"]));
                } else {
                    assert_eq!(payload["captcha"], Value::Null);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_qcloud_flag_in_default_scope_does_not_count() {
    let settings = InMemorySettings::new()
        .with(DEFAULT_SCOPE, "register_captcha", true)
        .with(DEFAULT_SCOPE, "qcloud_captcha", true);
    let h = harness(settings);

    assert!(h.service.captcha_challenge(&alice()).is_none());
}

#[tokio::test]
async fn test_pay_mode_expires_immediately() {
    let h = harness(InMemorySettings::new().with(DEFAULT_SCOPE, "site_mode", "pay"));
    let before = Utc::now();

    let user = h.service.register(&Actor::anonymous(), alice()).await.unwrap();

    let expired_at = user.expired_at.unwrap();
    assert!(expired_at >= before);
    assert!(user.is_expired(Utc::now()));
}

#[tokio::test]
async fn test_public_mode_has_no_expiry() {
    let h = harness(InMemorySettings::new().with(DEFAULT_SCOPE, "site_mode", "public"));

    let user = h.service.register(&Actor::anonymous(), alice()).await.unwrap();
    assert!(user.expired_at.is_none());
}

struct Invitation;

#[async_trait]
impl RegistrationObserver for Invitation {
    async fn saving(&self, event: &mut UserSaving<'_>) -> RegistrationResult<()> {
        let inviter = event.input.get("invite_code").unwrap_or("none").to_string();
        event.user.register_reason = format!("invited: {inviter}");
        let username = event.user.username.clone();
        event.user.raise(DomainEvent::Custom {
            name: "invitation_used".into(),
            payload: json!({ "username": username, "actor": event.actor.id }),
        });
        Ok(())
    }
}

struct Closed;

#[async_trait]
impl RegistrationObserver for Closed {
    async fn saving(&self, _event: &mut UserSaving<'_>) -> RegistrationResult<()> {
        Err(RegistrationError::ConfigurationPrecondition(
            "registration is closed".into(),
        ))
    }
}

#[tokio::test]
async fn test_observer_changes_are_validated_and_saved() {
    let h = harness(InMemorySettings::new());
    let service = h.service.with_observer(Arc::new(Invitation));
    let mut form = alice();
    form.set("invite_code", "XYZ");

    let user = service.register(&member(), form).await.unwrap();

    assert_eq!(user.register_reason, "invited: XYZ");
    assert_eq!(
        h.validator.last_payload().unwrap()["register_reason"],
        "invited: XYZ"
    );
    assert_eq!(h.store.inserted()[0].register_reason, "invited: XYZ");
    assert_eq!(user.pending_events(), 0);
    assert_eq!(h.events.names(), ["user_registered", "invitation_used"]);
}

#[tokio::test]
async fn test_observer_error_aborts_without_persisting() {
    let h = harness(InMemorySettings::new());
    let service = h
        .service
        .with_observer(Arc::new(Invitation))
        .with_observer(Arc::new(Closed));

    let err = service
        .register(&Actor::anonymous(), alice())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("registration is closed"));
    assert_eq!(h.validator.call_count(), 0);
    assert_eq!(h.store.insert_count(), 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_validation_failure_is_reported_per_field() {
    let failure = ValidationFailure::new(vec![
        FieldError::new("username", "username has already been taken"),
        FieldError::new("password", "password must be at least 6 characters"),
    ]);
    let h = harness_with(
        InMemorySettings::new(),
        StubCensor::pass(),
        RecordingValidator::failing(failure.clone()),
        RecordingUserStore::new(),
    );

    let err = h
        .service
        .register(&Actor::anonymous(), alice())
        .await
        .unwrap_err();

    match err {
        RegistrationError::Validation(reported) => assert_eq!(reported, failure),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(h.store.insert_count(), 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_infrastructure() {
    let h = harness_with(
        InMemorySettings::new(),
        StubCensor::pass(),
        RecordingValidator::accepting(),
        RecordingUserStore::failing(),
    );

    let err = h
        .service
        .register(&Actor::anonymous(), alice())
        .await
        .unwrap_err();

    assert!(matches!(err, RegistrationError::Infrastructure(_)));
    assert!(!err.is_domain());
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_user_validator_rejects_taken_username() {
    let store = Arc::new(RecordingUserStore::new().with_username("alice"));
    let events = Arc::new(RecordingEventSink::new());
    let service = RegistrationService::new(
        Arc::new(InMemorySettings::new()),
        Arc::new(StubCensor::pass()),
        Arc::new(UserValidator::new(store.clone())),
        events.clone(),
        store.clone(),
    );

    let err = service
        .register(&Actor::anonymous(), alice())
        .await
        .unwrap_err();

    match err {
        RegistrationError::Validation(failure) => {
            assert_eq!(
                failure.messages_for("username"),
                ["username has already been taken"]
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(store.insert_count(), 0);
    assert!(events.events().is_empty());
}

#[tokio::test]
async fn test_user_validator_accepts_second_distinct_user() {
    let store = Arc::new(RecordingUserStore::new());
    let service = RegistrationService::new(
        Arc::new(InMemorySettings::new()),
        Arc::new(StubCensor::pass()),
        Arc::new(UserValidator::new(store.clone())),
        Arc::new(RecordingEventSink::new()),
        store.clone(),
    );

    service
        .register(&Actor::anonymous(), alice())
        .await
        .unwrap();
    let mut bob = alice();
    bob.set("username", "bob");
    service.register(&Actor::anonymous(), bob).await.unwrap();

    let again = service.register(&Actor::anonymous(), alice()).await;
    assert!(matches!(again, Err(RegistrationError::Validation(_))));
    assert_eq!(store.insert_count(), 2);
}
