/// Database row types; these map directly to SQLite rows.
/// Distinct from circles-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub token: String,
    pub user_id: i64,
    pub created_at: String,
    pub expires_at: String,
}

pub struct CircleRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub owner_name: Option<String>,
    pub created_at: String,
}

pub struct MemberRow {
    pub circle_id: i64,
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub joined_at: String,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub circle_id: Option<i64>,
    pub created_at: String,
    pub updated_at: Option<String>,
}
