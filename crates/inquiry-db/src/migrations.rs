use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version = current_version(conn)?;

    if version < 1 {
        info!("Running migration v1 (threads + messages)");
        conn.execute_batch(
            "
            CREATE TABLE threads (
                id          TEXT PRIMARY KEY,
                slug        TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'PENDING'
                            CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_threads_status
                ON threads(status, created_at);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                thread_id   TEXT NOT NULL REFERENCES threads(id),
                author      TEXT NOT NULL CHECK (author IN ('VISITOR', 'ADMIN')),
                body        TEXT NOT NULL CHECK (length(trim(body)) > 0),
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_thread
                ON messages(thread_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", current_version(conn)?);
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;
    Ok(version)
}
