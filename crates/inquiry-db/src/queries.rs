use std::collections::HashMap;

use crate::models::{MessageRow, ThreadRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

use inquiry_types::models::{Message, Thread, ThreadStatus};

/// How a thread is looked up: admins use the internal id, visitors the public slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadKey<'a> {
    Id(&'a str),
    Slug(&'a str),
}

impl ThreadKey<'_> {
    fn column(&self) -> &'static str {
        match self {
            ThreadKey::Id(_) => "id",
            ThreadKey::Slug(_) => "slug",
        }
    }

    fn value(&self) -> &str {
        match self {
            ThreadKey::Id(v) | ThreadKey::Slug(v) => *v,
        }
    }
}

const THREAD_COLUMNS: &str = "id, slug, name, email, status, created_at";
const MESSAGE_COLUMNS: &str = "id, thread_id, author, body, created_at";

impl Database {
    // -- Threads --

    /// Insert a thread together with its first message in one transaction.
    /// Returns `false` (and writes nothing) when the slug is already taken.
    pub fn insert_thread(&self, thread: &ThreadRow, first_message: &MessageRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT INTO threads (id, slug, name, email, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    thread.id,
                    thread.slug,
                    thread.name,
                    thread.email,
                    thread.status,
                    thread.created_at
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_slug_conflict(&e) => {
                    debug!("Slug '{}' already taken", thread.slug);
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            }

            execute_insert_message(&tx, first_message)?;
            tx.commit()?;
            Ok(true)
        })
    }

    pub fn get_thread(&self, key: ThreadKey<'_>) -> Result<Option<Thread>> {
        self.with_conn(|conn| {
            let Some(row) = query_thread_row(conn, key)? else {
                return Ok(None);
            };
            let messages = query_messages(conn, &row.id)?;
            Ok(Some(row.into_thread(messages)?))
        })
    }

    /// Resolve a lookup key to the internal thread id without loading messages.
    pub fn find_thread_id(&self, key: ThreadKey<'_>) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT id FROM threads WHERE {} = ?1", key.column());
            let id = conn
                .query_row(&sql, [key.value()], |row| row.get(0))
                .optional()?;
            Ok(id)
        })
    }

    /// Threads with the given status, newest first, each with messages oldest first.
    pub fn list_threads(&self, status: ThreadStatus) -> Result<Vec<Thread>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads
                 WHERE status = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([status.as_str()], map_thread_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut by_thread = query_messages_with_status(conn, status)?;

            rows.into_iter()
                .map(|row| {
                    let messages = by_thread.remove(&row.id).unwrap_or_default();
                    row.into_thread(messages)
                })
                .collect()
        })
    }

    /// Compare-and-set on the status column. Returns `false` when the thread is
    /// missing or its status is no longer `expected`.
    pub fn update_thread_status(
        &self,
        id: &str,
        expected: ThreadStatus,
        next: ThreadStatus,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE threads SET status = ?1 WHERE id = ?2 AND status = ?3",
                rusqlite::params![next.as_str(), id, expected.as_str()],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| execute_insert_message(conn, message))
    }
}

fn execute_insert_message(conn: &Connection, message: &MessageRow) -> Result<()> {
    conn.execute(
        "INSERT INTO messages (id, thread_id, author, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            message.id,
            message.thread_id,
            message.author,
            message.body,
            message.created_at
        ],
    )?;
    Ok(())
}

fn query_thread_row(conn: &Connection, key: ThreadKey<'_>) -> Result<Option<ThreadRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {THREAD_COLUMNS} FROM threads WHERE {} = ?1",
        key.column()
    ))?;

    let row = stmt.query_row([key.value()], map_thread_row).optional()?;
    Ok(row)
}

fn query_messages(conn: &Connection, thread_id: &str) -> Result<Vec<Message>> {
    // rowid breaks ties between messages stored within the same microsecond
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE thread_id = ?1
         ORDER BY created_at ASC, rowid ASC"
    ))?;

    let rows = stmt
        .query_map([thread_id], map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(MessageRow::into_message).collect()
}

/// Batch-fetch the messages of every thread with the given status, grouped by
/// thread id. The filter stays in SQL so the statement size does not grow with
/// the number of threads.
fn query_messages_with_status(
    conn: &Connection,
    status: ThreadStatus,
) -> Result<HashMap<String, Vec<Message>>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE thread_id IN (SELECT id FROM threads WHERE status = ?1)
         ORDER BY created_at ASC, rowid ASC"
    ))?;

    let rows = stmt
        .query_map([status.as_str()], map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grouped: HashMap<String, Vec<Message>> = HashMap::new();
    for row in rows {
        grouped.entry(row.thread_id.clone()).or_default().push(row.into_message()?);
    }

    Ok(grouped)
}

fn map_thread_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadRow> {
    Ok(ThreadRow {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        author: row.get(2)?,
        body: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn is_slug_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == ErrorCode::ConstraintViolation && msg.contains("threads.slug")
        }
        _ => false,
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format_timestamp;
    use chrono::{Duration, Utc};
    use inquiry_types::models::MessageAuthor;
    use uuid::Uuid;

    fn thread_row(slug: &str, offset_secs: i64) -> ThreadRow {
        ThreadRow {
            id: Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            name: "Alice".into(),
            email: "a@x.com".into(),
            status: ThreadStatus::Pending.as_str().into(),
            created_at: format_timestamp(Utc::now() + Duration::seconds(offset_secs)),
        }
    }

    fn message_row(
        thread_id: &str,
        author: MessageAuthor,
        body: &str,
        at: chrono::DateTime<Utc>,
    ) -> MessageRow {
        MessageRow {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            author: author.as_str().into(),
            body: body.into(),
            created_at: format_timestamp(at),
        }
    }

    fn bodies(db: &Database, thread_id: &str) -> Vec<String> {
        db.get_thread(ThreadKey::Id(thread_id))
            .unwrap()
            .map(|t| t.messages.into_iter().map(|m| m.body).collect())
            .unwrap_or_default()
    }

    fn seed(db: &Database, slug: &str, offset_secs: i64) -> ThreadRow {
        let thread = thread_row(slug, offset_secs);
        let first = message_row(&thread.id, MessageAuthor::Visitor, "Hi", Utc::now());
        assert!(db.insert_thread(&thread, &first).unwrap());
        thread
    }

    #[test]
    fn insert_and_fetch_by_id_and_slug() {
        let db = Database::open_in_memory().unwrap();
        let row = seed(&db, "abc123", 0);

        let by_id = db.get_thread(ThreadKey::Id(&row.id)).unwrap().unwrap();
        let by_slug = db.get_thread(ThreadKey::Slug("abc123")).unwrap().unwrap();

        assert_eq!(by_id.id, by_slug.id);
        assert_eq!(by_id.status, ThreadStatus::Pending);
        assert_eq!(by_id.messages.len(), 1);
        assert_eq!(by_id.messages[0].body, "Hi");
        assert!(db.get_thread(ThreadKey::Slug("missing")).unwrap().is_none());
    }

    #[test]
    fn duplicate_slug_reports_conflict_and_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        seed(&db, "dup", 0);

        let second = thread_row("dup", 1);
        let first_msg = message_row(&second.id, MessageAuthor::Visitor, "Hello", Utc::now());
        assert!(!db.insert_thread(&second, &first_msg).unwrap());

        assert!(db.get_thread(ThreadKey::Id(&second.id)).unwrap().is_none());
        let orphaned: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM messages WHERE thread_id = ?1",
                    [&second.id],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(orphaned, 0);
    }

    #[test]
    fn list_filters_by_status_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let older = seed(&db, "older", -10);
        let newer = seed(&db, "newer", 0);
        let approved = seed(&db, "approved", 5);
        assert!(db
            .update_thread_status(&approved.id, ThreadStatus::Pending, ThreadStatus::Approved)
            .unwrap());

        let pending = db.list_threads(ThreadStatus::Pending).unwrap();
        let slugs: Vec<&str> = pending.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec![newer.slug.as_str(), older.slug.as_str()]);
        assert!(pending.iter().all(|t| t.messages.len() == 1));

        let approved_list = db.list_threads(ThreadStatus::Approved).unwrap();
        assert_eq!(approved_list.len(), 1);
        assert_eq!(approved_list[0].slug, "approved");
        assert!(db.list_threads(ThreadStatus::Rejected).unwrap().is_empty());
    }

    #[test]
    fn messages_come_back_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        let thread = seed(&db, "order", 0);
        let now = Utc::now();

        // Inserted out of order on purpose.
        let third_at = now + Duration::seconds(20);
        let second_at = now + Duration::seconds(10);
        let third = message_row(&thread.id, MessageAuthor::Admin, "third", third_at);
        let second = message_row(&thread.id, MessageAuthor::Visitor, "second", second_at);
        db.insert_message(&third).unwrap();
        db.insert_message(&second).unwrap();

        assert_eq!(bodies(&db, &thread.id), vec!["Hi", "second", "third"]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let thread = seed(&db, "ties", -60);
        let at = Utc::now();

        for body in ["first", "second", "third"] {
            db.insert_message(&message_row(&thread.id, MessageAuthor::Admin, body, at))
                .unwrap();
        }

        assert_eq!(bodies(&db, &thread.id), vec!["Hi", "first", "second", "third"]);

        let listed = db.list_threads(ThreadStatus::Pending).unwrap();
        let listed: Vec<&str> = listed[0].messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(listed, vec!["Hi", "first", "second", "third"]);
    }

    #[test]
    fn list_handles_more_threads_than_sqlite_bind_parameters() {
        const THREADS: usize = 33_000;
        let db = Database::open_in_memory().unwrap();
        let created_at = format_timestamp(Utc::now());

        db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut thread_stmt = tx.prepare(
                    "INSERT INTO threads (id, slug, name, email, status, created_at)
                     VALUES (?1, ?2, 'n', 'e', 'PENDING', ?3)",
                )?;
                let mut message_stmt = tx.prepare(
                    "INSERT INTO messages (id, thread_id, author, body, created_at)
                     VALUES (?1, ?2, 'VISITOR', 'Hi', ?3)",
                )?;
                for i in 0..THREADS {
                    let id = Uuid::new_v4().to_string();
                    thread_stmt.execute(rusqlite::params![id, format!("s{i}"), created_at])?;
                    message_stmt.execute(rusqlite::params![
                        Uuid::new_v4().to_string(),
                        id,
                        created_at
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .unwrap();

        let pending = db.list_threads(ThreadStatus::Pending).unwrap();
        assert_eq!(pending.len(), THREADS);
        assert!(pending.iter().all(|t| t.messages.len() == 1));
    }

    #[test]
    fn status_update_is_compare_and_set() {
        let db = Database::open_in_memory().unwrap();
        let thread = seed(&db, "cas", 0);

        assert!(db
            .update_thread_status(&thread.id, ThreadStatus::Pending, ThreadStatus::Rejected)
            .unwrap());
        // Stale expectation no longer matches.
        assert!(!db
            .update_thread_status(&thread.id, ThreadStatus::Pending, ThreadStatus::Approved)
            .unwrap());
        assert!(!db
            .update_thread_status("missing", ThreadStatus::Pending, ThreadStatus::Approved)
            .unwrap());

        let stored = db.get_thread(ThreadKey::Id(&thread.id)).unwrap().unwrap();
        assert_eq!(stored.status, ThreadStatus::Rejected);
    }

    #[test]
    fn find_thread_id_resolves_both_keys() {
        let db = Database::open_in_memory().unwrap();
        let thread = seed(&db, "resolve", 0);

        assert_eq!(
            db.find_thread_id(ThreadKey::Slug("resolve")).unwrap(),
            Some(thread.id.clone())
        );
        assert_eq!(
            db.find_thread_id(ThreadKey::Id(&thread.id)).unwrap(),
            Some(thread.id.clone())
        );
        assert_eq!(db.find_thread_id(ThreadKey::Slug("nope")).unwrap(), None);
    }

    #[test]
    fn message_for_unknown_thread_is_rejected_by_foreign_key() {
        let db = Database::open_in_memory().unwrap();
        let orphan = message_row("no-such-thread", MessageAuthor::Admin, "hello", Utc::now());
        assert!(db.insert_message(&orphan).is_err());
    }
}
