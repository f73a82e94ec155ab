//! Censorship collaborator contract.
//!
//! The sensitive-word engine lives outside the kernel; the kernel only needs
//! a verdict per checked text.

use serde::{Deserialize, Serialize};

use crate::error::CensorshipViolation;

/// Outcome of a successful censorship check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensorVerdict {
    /// The text passed, but a moderator must approve it.
    pub held_for_review: bool,
}

impl CensorVerdict {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn hold() -> Self {
        Self {
            held_for_review: true,
        }
    }
}

/// Checks user-supplied text against the site's content policy.
pub trait CensorshipService: Send + Sync {
    /// Check `text` submitted under `field`.
    fn check_text(&self, text: &str, field: &str) -> Result<CensorVerdict, CensorshipViolation>;
}

/// Censor that accepts everything. Used when no word list is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllCensor;

impl CensorshipService for AllowAllCensor {
    fn check_text(&self, _text: &str, _field: &str) -> Result<CensorVerdict, CensorshipViolation> {
        Ok(CensorVerdict::pass())
    }
}
