//! Agora test utilities.
//!
//! Helpers for integration testing: post and thread fixtures, in-memory
//! collaborators that record what the kernel asked of them, and assertion
//! utilities for rendered content.

use std::collections::HashSet;

use agora_kernel::ContentPipeline;
use agora_kernel::error::{CensorshipViolation, ContentResult, ValidationFailure};
use agora_kernel::models::{Actor, Classification, DomainEvent, Post, ReplyInput, Thread, User};
use agora_kernel::services::{
    CensorVerdict, CensorshipService, EventSink, UserStore, ValidationPayload, Validator,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

/// Create a reply builder for a thread.
pub fn test_reply(thread_id: Uuid, content: &str) -> TestReply {
    TestReply {
        input: ReplyInput {
            thread_id,
            content: content.to_string(),
            user_id: Some(Uuid::now_v7()),
            ip: "127.0.0.1".to_string(),
            ..Default::default()
        },
    }
}

/// A reply builder for creating post fixtures.
#[derive(Debug, Clone)]
pub struct TestReply {
    pub input: ReplyInput,
}

impl TestReply {
    /// Mark as the thread's opening post.
    pub fn first(mut self) -> Self {
        self.input.is_first = true;
        self
    }

    /// Make this a reply to another post.
    pub fn nested_under(mut self, post_id: Uuid) -> Self {
        self.input.reply_post_id = Some(post_id);
        self.input.reply_user_id = Some(Uuid::now_v7());
        self.input.is_comment = true;
        self
    }

    /// Set the author.
    pub fn by(mut self, user_id: Uuid) -> Self {
        self.input.user_id = Some(user_id);
        self
    }

    /// Create the post through the pipeline.
    pub fn post(
        self,
        pipeline: &ContentPipeline,
        classification: Classification,
    ) -> ContentResult<Post> {
        Post::reply(pipeline, classification, self.input)
    }
}

/// A standard thread.
pub fn standard_thread() -> Thread {
    Thread::standard(Uuid::now_v7())
}

/// A long-form thread with a title.
pub fn long_form_thread(title: &str) -> Thread {
    Thread::long_form(Uuid::now_v7(), title)
}

/// An authenticated, non-admin actor.
pub fn member() -> Actor {
    Actor::user(Uuid::now_v7())
}

/// An admin actor.
pub fn admin() -> Actor {
    Actor::admin(Uuid::now_v7())
}

/// Event sink that keeps every dispatched event.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in dispatch order.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    /// Event names in dispatch order.
    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn dispatch(&self, event: DomainEvent) {
        self.events.lock().push(event);
    }
}

/// In-memory user store that records inserts.
#[derive(Debug, Default)]
pub struct RecordingUserStore {
    taken: Mutex<HashSet<String>>,
    inserted: Mutex<Vec<User>>,
    fail: bool,
}

impl RecordingUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose inserts always fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Mark a username as already registered.
    pub fn with_username(self, username: &str) -> Self {
        self.taken.lock().insert(username.to_string());
        self
    }

    /// Number of insert calls that succeeded.
    pub fn insert_count(&self) -> usize {
        self.inserted.lock().len()
    }

    /// Users inserted so far.
    pub fn inserted(&self) -> Vec<User> {
        self.inserted.lock().clone()
    }
}

#[async_trait]
impl UserStore for RecordingUserStore {
    async fn insert(&self, user: &User) -> anyhow::Result<Uuid> {
        if self.fail {
            anyhow::bail!("user store unavailable");
        }
        self.taken.lock().insert(user.username.clone());
        self.inserted.lock().push(user.clone());
        Ok(Uuid::now_v7())
    }

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool> {
        Ok(self.taken.lock().contains(username))
    }
}

/// What a [`StubCensor`] answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CensorMode {
    Pass,
    Hold,
    Reject(String),
}

/// Censor with a fixed answer that records every check.
#[derive(Debug)]
pub struct StubCensor {
    mode: CensorMode,
    checked: Mutex<Vec<(String, String)>>,
}

impl StubCensor {
    pub fn new(mode: CensorMode) -> Self {
        Self {
            mode,
            checked: Mutex::new(Vec::new()),
        }
    }

    pub fn pass() -> Self {
        Self::new(CensorMode::Pass)
    }

    pub fn hold() -> Self {
        Self::new(CensorMode::Hold)
    }

    pub fn reject(phrase: &str) -> Self {
        Self::new(CensorMode::Reject(phrase.to_string()))
    }

    /// `(text, field)` pairs checked so far.
    pub fn checked(&self) -> Vec<(String, String)> {
        self.checked.lock().clone()
    }
}

impl CensorshipService for StubCensor {
    fn check_text(&self, text: &str, field: &str) -> Result<CensorVerdict, CensorshipViolation> {
        self.checked
            .lock()
            .push((text.to_string(), field.to_string()));
        match &self.mode {
            CensorMode::Pass => Ok(CensorVerdict::pass()),
            CensorMode::Hold => Ok(CensorVerdict::hold()),
            CensorMode::Reject(phrase) => Err(CensorshipViolation {
                field: field.to_string(),
                phrase: phrase.clone(),
            }),
        }
    }
}

/// Validator that records payloads and answers with a fixed result.
#[derive(Debug, Default)]
pub struct RecordingValidator {
    payloads: Mutex<Vec<ValidationPayload>>,
    failure: Option<ValidationFailure>,
}

impl RecordingValidator {
    /// A validator that accepts everything.
    pub fn accepting() -> Self {
        Self::default()
    }

    /// A validator that always fails with `failure`.
    pub fn failing(failure: ValidationFailure) -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            failure: Some(failure),
        }
    }

    /// The most recent payload, if any.
    pub fn last_payload(&self) -> Option<ValidationPayload> {
        self.payloads.lock().last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.payloads.lock().len()
    }
}

#[async_trait]
impl Validator for RecordingValidator {
    async fn validate(&self, payload: &ValidationPayload) -> Result<(), ValidationFailure> {
        self.payloads.lock().push(payload.clone());
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

/// Assertion helpers for rendered content.
pub mod assert {
    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{needle}'\nActual: {haystack}"
        );
    }

    /// Assert a string's length in characters.
    pub fn char_len(s: &str, expected: usize) {
        let actual = s.chars().count();
        assert_eq!(actual, expected, "Expected {expected} characters, got {actual}: {s}");
    }
}
