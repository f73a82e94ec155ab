//! Post model and lifecycle.
//!
//! A post's body lives in its stored (parsed) form. Callers never touch the
//! stored form directly: writes go through [`ContentPipeline::set_content`]
//! and reads through `get_content` / `render_content`, so the raw and stored
//! representations cannot drift apart.
//!
//! [`ContentPipeline::set_content`]: crate::content::ContentPipeline::set_content

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentPipeline;
use crate::error::ContentResult;
use crate::models::{Actor, Classification, DomainEvent, Outbox};

/// Moderation state of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
pub enum Approval {
    Unapproved = 0,
    #[default]
    Approved = 1,
    Ignored = 2,
}

/// Soft-deletion marker. Time and actor are one value so they can only be
/// set or cleared together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub at: DateTime<Utc>,
    pub user_id: Uuid,
}

/// Input for [`Post::reply`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyInput {
    pub thread_id: Uuid,
    pub content: String,
    pub user_id: Option<Uuid>,
    pub ip: String,
    pub port: u16,
    pub reply_post_id: Option<Uuid>,
    pub reply_user_id: Option<Uuid>,
    pub is_first: bool,
    pub is_comment: bool,
    pub latitude: f64,
    pub longitude: f64,
}

/// Post record.
#[derive(Debug, Clone)]
pub struct Post {
    /// Assigned by the store; `None` until persisted.
    pub id: Option<Uuid>,
    pub thread_id: Uuid,
    pub user_id: Option<Uuid>,
    pub ip: String,
    pub port: u16,
    pub reply_post_id: Option<Uuid>,
    pub reply_user_id: Option<Uuid>,
    pub is_first: bool,
    pub is_comment: bool,
    pub approval: Approval,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,

    /// Parsed content. `None` marks explicitly empty content.
    content: Option<String>,
    deletion: Option<Deletion>,
    outbox: Outbox,
}

impl Post {
    /// Create a new post in reply to a thread.
    ///
    /// Content is set last: formatters may read the other fields while
    /// parsing.
    pub fn reply(
        pipeline: &ContentPipeline,
        classification: Classification,
        input: ReplyInput,
    ) -> ContentResult<Self> {
        let mut post = Self {
            id: None,
            thread_id: input.thread_id,
            user_id: input.user_id,
            ip: input.ip,
            port: input.port,
            reply_post_id: input.reply_post_id,
            reply_user_id: input.reply_user_id,
            is_first: input.is_first,
            is_comment: input.is_comment,
            approval: Approval::default(),
            latitude: input.latitude,
            longitude: input.longitude,
            created_at: Utc::now(),
            content: None,
            deletion: None,
            outbox: Outbox::new(),
        };

        pipeline.set_content(&mut post, classification, &input.content)?;

        Ok(post)
    }

    /// Replace the content, raising `PostRevised` only if it changed.
    ///
    /// Returns whether the content changed.
    pub fn revise(
        &mut self,
        pipeline: &ContentPipeline,
        classification: Classification,
        content: &str,
        actor: &Actor,
    ) -> ContentResult<bool> {
        if pipeline.is_unchanged(self, classification, content)? {
            return Ok(false);
        }

        pipeline.set_content(self, classification, content)?;
        self.raise(DomainEvent::PostRevised {
            post_id: self.id,
            thread_id: self.thread_id,
            actor_id: actor.id,
        });

        Ok(true)
    }

    /// Soft-delete the post. No-op if already hidden.
    pub fn hide(&mut self, actor: &Actor, options: serde_json::Value) -> bool {
        if self.deletion.is_some() {
            return false;
        }

        self.deletion = Some(Deletion {
            at: Utc::now(),
            user_id: actor.id,
        });
        self.raise(DomainEvent::PostHidden {
            post_id: self.id,
            thread_id: self.thread_id,
            actor_id: actor.id,
            options,
        });

        true
    }

    /// Undo a soft-delete. No-op if not hidden.
    pub fn restore(&mut self, actor: &Actor, options: serde_json::Value) -> bool {
        if self.deletion.is_none() {
            return false;
        }

        self.deletion = None;
        self.raise(DomainEvent::PostRestored {
            post_id: self.id,
            thread_id: self.thread_id,
            actor_id: actor.id,
            options,
        });

        true
    }

    pub fn is_hidden(&self) -> bool {
        self.deletion.is_some()
    }

    pub fn deletion(&self) -> Option<Deletion> {
        self.deletion
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deletion.map(|d| d.at)
    }

    pub fn deleted_user_id(&self) -> Option<Uuid> {
        self.deletion.map(|d| d.user_id)
    }

    /// Whether this post replies to another post inside the thread.
    pub fn is_nested_reply(&self) -> bool {
        self.reply_post_id.is_some()
    }

    pub fn set_approval(&mut self, approval: Approval) {
        self.approval = approval;
    }

    pub fn is_approved(&self) -> bool {
        self.approval == Approval::Approved
    }

    /// Queue an event for dispatch after the post is saved.
    pub fn raise(&mut self, event: DomainEvent) {
        self.outbox.raise(event);
    }

    /// Drain pending events, oldest first.
    pub fn release_events(&mut self) -> Vec<DomainEvent> {
        self.outbox.release()
    }

    pub fn pending_events(&self) -> usize {
        self.outbox.len()
    }

    pub(crate) fn stored_content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub(crate) fn set_stored_content(&mut self, stored: Option<String>) {
        self.content = stored;
    }
}
