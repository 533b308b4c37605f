//! Row-to-API-model conversion.
//!
//! Timestamps come back from SQLite either as RFC 3339 (written by Rust)
//! or as "YYYY-MM-DD HH:MM:SS" (written by `datetime('now')` defaults);
//! both parse here. Corrupt values are logged and defaulted rather than
//! failing the whole response.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use circles_db::models::{CircleRow, MemberRow, PostRow, UserRow};
use circles_types::models::{Circle, CircleMember, Post, Role, UserProfile};

pub(crate) fn parse_db_time(value: &str, context: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", value, context, e);
            DateTime::default()
        })
}

pub(crate) fn user_profile(row: UserRow) -> UserProfile {
    let created_at = parse_db_time(&row.created_at, "user");
    UserProfile {
        id: row.id,
        username: row.username,
        email: row.email,
        full_name: row.full_name,
        created_at,
    }
}

pub(crate) fn circle_member(row: MemberRow) -> CircleMember {
    // An unknown role string in the database degrades to the least
    // privileged role rather than rejecting the roster.
    let role = Role::parse(&row.role).unwrap_or_else(|| {
        warn!("Unknown role '{}' for user {} in circle {}", row.role, row.user_id, row.circle_id);
        Role::Member
    });
    let joined_at = parse_db_time(&row.joined_at, "membership");
    CircleMember {
        circle_id: row.circle_id,
        user_id: row.user_id,
        username: row.username,
        role,
        joined_at,
    }
}

pub(crate) fn circle(row: CircleRow, members: Vec<MemberRow>) -> Circle {
    let created_at = parse_db_time(&row.created_at, "circle");
    let members: Vec<CircleMember> = members.into_iter().map(circle_member).collect();
    Circle {
        id: row.id,
        name: row.name,
        description: row.description,
        owner_id: row.owner_id,
        owner_name: row.owner_name,
        member_count: members.len(),
        members,
        created_at,
    }
}

pub(crate) fn post(row: PostRow) -> Post {
    let created_at = parse_db_time(&row.created_at, "post");
    let updated_at = row.updated_at.as_deref().map(|v| parse_db_time(v, "post"));
    Post {
        id: row.id,
        title: row.title,
        content: row.content,
        author_id: row.author_id,
        circle_id: row.circle_id,
        created_at,
        updated_at,
    }
}
