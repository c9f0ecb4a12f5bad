use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use inquiry_db::Database;
use inquiry_db::models::{MessageRow, format_timestamp};
use inquiry_types::models::{Message, MessageAuthor};

use crate::error::InquiryError;
use crate::lifecycle::{MAX_BODY_CHARS, ThreadRef, require_text};

/// Appends chat turns to existing threads.
///
/// There is no access control here: whoever knows a slug may post as the
/// visitor, and whoever reaches the admin routes may post as the admin.
/// Posting does not depend on the thread's status.
#[derive(Clone)]
pub struct Messaging {
    db: Arc<Database>,
}

impl Messaging {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn post_message(
        &self,
        thread: ThreadRef<'_>,
        author: MessageAuthor,
        body: &str,
    ) -> Result<Message, InquiryError> {
        // Validate before touching the database so a bad body never resolves the thread.
        let body = require_text("body", body, MAX_BODY_CHARS)?;

        let key = thread.to_key().ok_or_else(InquiryError::thread_not_found)?;
        let thread_id = self
            .db
            .find_thread_id(key)?
            .ok_or_else(InquiryError::thread_not_found)?;

        let created_at = Utc::now();
        let row = MessageRow {
            id: Uuid::new_v4().to_string(),
            thread_id,
            author: author.as_str().to_string(),
            body,
            created_at: format_timestamp(created_at),
        };
        self.db.insert_message(&row)?;

        debug!("{} message {} added to thread {}", author, row.id, row.thread_id);
        Ok(row.into_message()?)
    }

    /// Visitor reply, addressed by the thread's public slug.
    pub fn post_visitor_message(&self, slug: &str, body: &str) -> Result<Message, InquiryError> {
        self.post_message(ThreadRef::Slug(slug), MessageAuthor::Visitor, body)
    }

    /// Administrator reply, addressed by the thread's internal id.
    pub fn post_admin_message(&self, id: &str, body: &str) -> Result<Message, InquiryError> {
        self.post_message(ThreadRef::Id(id), MessageAuthor::Admin, body)
    }
}
