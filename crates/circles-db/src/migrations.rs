use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT UNIQUE,
            full_name   TEXT,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Opaque session tokens, one row per live session
        CREATE TABLE IF NOT EXISTS sessions (
            token       TEXT PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            expires_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS circles (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            description TEXT,
            owner_id    INTEGER NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS circle_members (
            circle_id   INTEGER NOT NULL REFERENCES circles(id) ON DELETE CASCADE,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            role        TEXT NOT NULL DEFAULT 'member',
            joined_at   TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (circle_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_members_user
            ON circle_members(user_id);

        CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            author_id   INTEGER NOT NULL REFERENCES users(id),
            circle_id   INTEGER REFERENCES circles(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_posts_circle
            ON posts(circle_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
