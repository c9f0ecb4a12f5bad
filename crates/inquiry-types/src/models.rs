use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle stage of a thread.
///
/// Every thread starts out `Pending`. An administrator moves it to exactly one
/// of the two terminal states; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreadStatus {
    Pending,
    Approved,
    Rejected,
}

impl ThreadStatus {
    pub const ALL: [ThreadStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether an administrator may move a thread from `self` to `next`.
    /// Staying in the same state is not a transition and is handled by the caller.
    pub fn can_transition_to(self, next: ThreadStatus) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// Status filter for the admin list: anything missing or unrecognised
    /// falls back to `Pending`.
    pub fn from_query(raw: Option<&str>) -> ThreadStatus {
        raw.and_then(|s| s.trim().parse().ok())
            .unwrap_or(Self::Pending)
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown thread status: {s}"))
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageAuthor {
    Visitor,
    Admin,
}

impl MessageAuthor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visitor => "VISITOR",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for MessageAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageAuthor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VISITOR" => Ok(Self::Visitor),
            "ADMIN" => Ok(Self::Admin),
            other => Err(format!("unknown message author: {other}")),
        }
    }
}

/// One visitor inquiry together with its conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub email: String,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    /// Oldest first.
    pub messages: Vec<Message>,
}

/// Messages are immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author: MessageAuthor,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
