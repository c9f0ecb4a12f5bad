//! Database row types. These map directly to SQLite rows and are converted to
//! the inquiry-types domain models on the way out of the crate.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use inquiry_types::models::{Message, Thread};

pub struct ThreadRow {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub email: String,
    pub status: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub thread_id: String,
    pub author: String,
    pub body: String,
    pub created_at: String,
}

impl ThreadRow {
    pub fn into_thread(self, messages: Vec<Message>) -> Result<Thread> {
        Ok(Thread {
            id: parse_uuid(&self.id).with_context(|| format!("corrupt thread id '{}'", self.id))?,
            status: self
                .status
                .parse()
                .map_err(|e: String| anyhow::anyhow!("thread '{}': {}", self.id, e))?,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("corrupt created_at on thread '{}'", self.id))?,
            slug: self.slug,
            name: self.name,
            email: self.email,
            messages,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: parse_uuid(&self.id).with_context(|| format!("corrupt message id '{}'", self.id))?,
            thread_id: parse_uuid(&self.thread_id)
                .with_context(|| format!("corrupt thread_id on message '{}'", self.id))?,
            author: self
                .author
                .parse()
                .map_err(|e: String| anyhow::anyhow!("message '{}': {}", self.id, e))?,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("corrupt created_at on message '{}'", self.id))?,
            body: self.body,
        })
    }
}

/// Fixed-width RFC3339 with microseconds, so string order is time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through sqlite3 use datetime('now'), which has no timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| anyhow::anyhow!("invalid timestamp '{}': {}", raw, e))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Ok(raw.parse::<Uuid>()?)
}
