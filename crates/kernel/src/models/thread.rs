//! Thread model (the subset the content pipeline needs).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Thread classification; selects the formatter for the opening post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Regular thread, inline formatter.
    #[default]
    Standard,
    /// Long-form article thread, markdown formatter.
    LongForm,
}

impl Classification {
    pub fn is_long_form(self) -> bool {
        self == Classification::LongForm
    }
}

/// Thread record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub classification: Classification,
    /// Title; only long-form threads carry a meaningful one.
    pub title: String,
}

impl Thread {
    /// Create a standard thread.
    pub fn standard(id: Uuid) -> Self {
        Self {
            id,
            classification: Classification::Standard,
            title: String::new(),
        }
    }

    /// Create a long-form thread with a title.
    pub fn long_form(id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id,
            classification: Classification::LongForm,
            title: title.into(),
        }
    }
}
