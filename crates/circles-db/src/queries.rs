use crate::Database;
use crate::models::{CircleRow, MemberRow, PostRow, SessionRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        full_name: Option<&str>,
        password_hash: &str,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, full_name, password) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![username, email, full_name, password_hash],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", rusqlite::params![username]))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", rusqlite::params![id]))
    }

    /// Search candidates to add to a circle: username substring match,
    /// excluding the requester and anyone already on the roster.
    pub fn search_users(&self, query: &str, circle_id: i64, exclude_user_id: i64) -> Result<Vec<UserRow>> {
        let pattern = format!("%{}%", query);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, full_name, password, created_at
                 FROM users
                 WHERE id != ?1
                   AND username LIKE ?2
                   AND id NOT IN (SELECT user_id FROM circle_members WHERE circle_id = ?3)
                 ORDER BY username
                 LIMIT 20",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![exclude_user_id, pattern, circle_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Sessions --

    pub fn create_session(
        &self,
        token: &str,
        user_id: i64,
        created_at: &str,
        expires_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![token, user_id, created_at, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, token: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?1",
            )?;
            let row = stmt
                .query_row([token], |row| {
                    Ok(SessionRow {
                        token: row.get(0)?,
                        user_id: row.get(1)?,
                        created_at: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(())
        })
    }

    // -- Circles --

    /// Creates a circle and its owner membership in one transaction, so a
    /// circle never exists without exactly one owner row.
    pub fn create_circle(&self, name: &str, description: Option<&str>, owner_id: i64) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO circles (name, description, owner_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![name, description, owner_id],
            )?;
            let circle_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO circle_members (circle_id, user_id, role) VALUES (?1, ?2, 'owner')",
                rusqlite::params![circle_id, owner_id],
            )?;
            tx.commit()?;
            Ok(circle_id)
        })
    }

    pub fn get_circle(&self, id: i64) -> Result<Option<CircleRow>> {
        self.with_conn(|conn| query_circle(conn, "c.id = ?1", rusqlite::params![id]))
    }

    pub fn get_circle_by_name(&self, name: &str) -> Result<Option<CircleRow>> {
        self.with_conn(|conn| query_circle(conn, "c.name = ?1", rusqlite::params![name]))
    }

    pub fn circles_for_user(&self, user_id: i64) -> Result<Vec<CircleRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.description, c.owner_id, u.username, c.created_at
                 FROM circles c
                 JOIN circle_members m ON c.id = m.circle_id
                 LEFT JOIN users u ON c.owner_id = u.id
                 WHERE m.user_id = ?1
                 ORDER BY c.created_at DESC, c.id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], circle_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_circle(&self, id: i64, name: &str, description: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE circles SET name = ?1, description = ?2 WHERE id = ?3",
                rusqlite::params![name, description, id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_circle_name(&self, id: i64, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE circles SET name = ?1 WHERE id = ?2",
                rusqlite::params![name, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Members and circle-scoped posts go with the circle via FK cascade.
    pub fn delete_circle(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM circles WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Membership --

    pub fn get_member(&self, circle_id: i64, user_id: i64) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.circle_id, m.user_id, u.username, m.role, m.joined_at
                 FROM circle_members m
                 JOIN users u ON m.user_id = u.id
                 WHERE m.circle_id = ?1 AND m.user_id = ?2",
            )?;
            let row = stmt
                .query_row(rusqlite::params![circle_id, user_id], member_from_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn circle_members(&self, circle_id: i64) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.circle_id, m.user_id, u.username, m.role, m.joined_at
                 FROM circle_members m
                 JOIN users u ON m.user_id = u.id
                 WHERE m.circle_id = ?1
                 ORDER BY m.joined_at, m.user_id",
            )?;
            let rows = stmt
                .query_map([circle_id], member_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn add_member(&self, circle_id: i64, user_id: i64, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO circle_members (circle_id, user_id, role) VALUES (?1, ?2, ?3)",
                rusqlite::params![circle_id, user_id, role],
            )?;
            Ok(())
        })
    }

    pub fn remove_member(&self, circle_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM circle_members WHERE circle_id = ?1 AND user_id = ?2",
                rusqlite::params![circle_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_member_role(&self, circle_id: i64, user_id: i64, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE circle_members SET role = ?1 WHERE circle_id = ?2 AND user_id = ?3",
                rusqlite::params![role, circle_id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        title: &str,
        content: &str,
        author_id: i64,
        circle_id: Option<i64>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (title, content, author_id, circle_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![title, content, author_id, circle_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, author_id, circle_id, created_at, updated_at
                 FROM posts WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], post_from_row).optional()?;
            Ok(row)
        })
    }

    /// Feed: posts from the circles the user belongs to, newest first.
    /// Secondary id ordering keeps same-second inserts deterministic.
    pub fn feed_posts(&self, user_id: i64, limit: u32, offset: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, author_id, circle_id, created_at, updated_at
                 FROM posts
                 WHERE circle_id IN (SELECT circle_id FROM circle_members WHERE user_id = ?1)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit, offset], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, filter: &str, params: &[&dyn rusqlite::types::ToSql]) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, full_name, password, created_at FROM users WHERE {}",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row(params, user_from_row).optional()?;
    Ok(row)
}

fn query_circle(conn: &Connection, filter: &str, params: &[&dyn rusqlite::types::ToSql]) -> Result<Option<CircleRow>> {
    let sql = format!(
        "SELECT c.id, c.name, c.description, c.owner_id, u.username, c.created_at
         FROM circles c
         LEFT JOIN users u ON c.owner_id = u.id
         WHERE {}",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row(params, circle_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn circle_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<CircleRow, rusqlite::Error> {
    Ok(CircleRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
        owner_name: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn member_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<MemberRow, rusqlite::Error> {
    Ok(MemberRow {
        circle_id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        role: row.get(3)?,
        joined_at: row.get(4)?,
    })
}

fn post_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        circle_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
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
