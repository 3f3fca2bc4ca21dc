//! Session state types

use crate::transport::{Citation, HistoryEntry, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, never-reused turn identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(String);

impl TurnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

impl From<Author> for Role {
    fn from(author: Author) -> Self {
        match author {
            Author::User => Role::User,
            Author::Assistant => Role::Assistant,
        }
    }
}

/// One conversational entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// True while an assistant turn is still receiving deltas
    pub in_progress: bool,
    /// Classification tag, set at most once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Cited sources, set at most once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl Turn {
    pub fn user(id: TurnId, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            author: Author::User,
            text: text.into(),
            created_at,
            in_progress: false,
            mode: None,
            citations: None,
        }
    }

    /// Empty assistant turn awaiting deltas
    pub fn assistant_placeholder(id: TurnId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            author: Author::Assistant,
            text: String::new(),
            created_at,
            in_progress: true,
            mode: None,
            citations: None,
        }
    }

    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.author.into(),
            content: self.text.clone(),
        }
    }
}

/// The whole conversation as seen by observers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Conversation order; never reordered
    pub turns: Vec<Turn>,
    /// True between send acceptance and its terminal resolution
    pub busy: bool,
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turn(&self, id: &TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| &t.id == id)
    }

    pub(crate) fn turn_mut(&mut self, id: &TurnId) -> Option<&mut Turn> {
        self.turns.iter_mut().find(|t| &t.id == id)
    }

    /// The assistant turn currently receiving deltas, if any
    pub fn in_progress_turn(&self) -> Option<&Turn> {
        self.turns.iter().find(|t| t.in_progress)
    }

    /// Role/content projection of every turn, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.turns.iter().map(Turn::to_history_entry).collect()
    }

    pub fn is_idle(&self) -> bool {
        !self.busy
    }
}
