use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use inquiry_db::Database;
use inquiry_db::models::{MessageRow, ThreadRow, format_timestamp};
use inquiry_db::queries::ThreadKey;
use inquiry_types::models::{MessageAuthor, Thread, ThreadStatus};

use crate::error::InquiryError;
use crate::slug::SlugGenerator;

pub const MAX_NAME_CHARS: usize = 200;
pub const MAX_EMAIL_CHARS: usize = 320;
pub const MAX_BODY_CHARS: usize = 10_000;

/// Attempts at finding an unused slug before giving up.
const MAX_SLUG_ATTEMPTS: usize = 5;

/// Which thread an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRef<'a> {
    /// Internal id, used on admin routes.
    Id(&'a str),
    /// Public slug, used on visitor routes.
    Slug(&'a str),
}

impl<'a> ThreadRef<'a> {
    /// Map to a database key. Admin ids that are not UUIDs cannot exist, so
    /// they resolve to `None` and the caller reports the thread as missing.
    pub(crate) fn to_key(self) -> Option<ThreadKey<'a>> {
        match self {
            ThreadRef::Id(id) => id.parse::<Uuid>().ok().map(|_| ThreadKey::Id(id)),
            ThreadRef::Slug(slug) => Some(ThreadKey::Slug(slug)),
        }
    }
}

/// Trim `value` and require it to be non-empty and at most `max_chars` long.
pub(crate) fn require_text(
    field: &str,
    value: &str,
    max_chars: usize,
) -> Result<String, InquiryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InquiryError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(InquiryError::Validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Creates threads, lists and loads them, and moves them through
/// PENDING -> APPROVED | REJECTED.
#[derive(Clone)]
pub struct ThreadLifecycle {
    db: Arc<Database>,
    slugs: SlugGenerator,
}

impl ThreadLifecycle {
    pub fn new(db: Arc<Database>, slugs: SlugGenerator) -> Self {
        Self { db, slugs }
    }

    /// Store a new PENDING thread with the visitor's first message and return
    /// its public slug.
    pub fn create_thread(
        &self,
        name: &str,
        email: &str,
        body: &str,
    ) -> Result<String, InquiryError> {
        let slugs = self.slugs;
        self.create_thread_with(name, email, body, || slugs.generate())
    }

    fn create_thread_with(
        &self,
        name: &str,
        email: &str,
        body: &str,
        mut next_slug: impl FnMut() -> String,
    ) -> Result<String, InquiryError> {
        let name = require_text("name", name, MAX_NAME_CHARS)?;
        let email = require_text("email", email, MAX_EMAIL_CHARS)?;
        let body = require_text("body", body, MAX_BODY_CHARS)?;

        let thread_id = Uuid::new_v4().to_string();
        let created_at = format_timestamp(Utc::now());

        let first_message = MessageRow {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.clone(),
            author: MessageAuthor::Visitor.as_str().to_string(),
            body,
            created_at: created_at.clone(),
        };

        let mut thread = ThreadRow {
            id: thread_id,
            slug: String::new(),
            name,
            email,
            status: ThreadStatus::Pending.as_str().to_string(),
            created_at,
        };

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            thread.slug = next_slug();
            if self.db.insert_thread(&thread, &first_message)? {
                info!("Thread {} created with slug {}", thread.id, thread.slug);
                return Ok(thread.slug);
            }
            warn!(
                "Slug collision on '{}' (attempt {}/{})",
                thread.slug, attempt, MAX_SLUG_ATTEMPTS
            );
        }

        Err(InquiryError::Internal(anyhow::anyhow!(
            "no unused slug found after {} attempts",
            MAX_SLUG_ATTEMPTS
        )))
    }

    pub fn list_threads(&self, status: ThreadStatus) -> Result<Vec<Thread>, InquiryError> {
        Ok(self.db.list_threads(status)?)
    }

    pub fn get_thread(&self, thread: ThreadRef<'_>) -> Result<Thread, InquiryError> {
        let key = thread.to_key().ok_or_else(InquiryError::thread_not_found)?;
        self.db
            .get_thread(key)?
            .ok_or_else(InquiryError::thread_not_found)
    }

    /// Approve or reject a thread. `new_status` is the raw value from the
    /// request; only APPROVED and REJECTED are accepted.
    ///
    /// Terminal states are final: asking for the status a thread already has
    /// succeeds without writing, any other change out of APPROVED/REJECTED is
    /// an [`InquiryError::InvalidTransition`].
    pub fn update_status(
        &self,
        id: &str,
        new_status: Option<&str>,
    ) -> Result<Thread, InquiryError> {
        let raw = new_status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| InquiryError::Validation("newStatus is required".into()))?;

        let next = match raw.parse::<ThreadStatus>() {
            Ok(status @ (ThreadStatus::Approved | ThreadStatus::Rejected)) => status,
            _ => return Err(InquiryError::InvalidStatus(raw.to_string())),
        };

        let current = self.get_thread(ThreadRef::Id(id))?;
        if current.status == next {
            return Ok(current);
        }
        if !current.status.can_transition_to(next) {
            return Err(InquiryError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        if !self.db.update_thread_status(id, current.status, next)? {
            // Someone else changed (or removed) the thread between our read and write.
            let latest = self.get_thread(ThreadRef::Id(id))?;
            return settle_lost_update(latest, next);
        }

        info!("Thread {} moved {} -> {}", id, current.status, next);
        self.get_thread(ThreadRef::Id(id))
    }
}

/// Outcome of a status update whose compare-and-set lost to a concurrent
/// writer: fine if the winner already set `next`, a conflict otherwise.
fn settle_lost_update(latest: Thread, next: ThreadStatus) -> Result<Thread, InquiryError> {
    if latest.status == next {
        Ok(latest)
    } else {
        Err(InquiryError::InvalidTransition {
            from: latest.status,
            to: next,
        })
    }
}
