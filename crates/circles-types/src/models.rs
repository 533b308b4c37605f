use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Membership role within a circle, ranked owner > moderator > member.
///
/// Invalid role strings are a parse-time error, never a silent mismatch
/// in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Moderator,
    Member,
}

impl Role {
    /// String form used on the wire and in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Moderator => "moderator",
            Self::Member => "member",
        }
    }

    /// Parses from the wire/database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "moderator" => Some(Self::Moderator),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// A role that can be assigned through the role-change path.
///
/// Owner is deliberately unrepresentable here: ownership never moves
/// through member management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignableRole {
    Moderator,
    Member,
}

impl AssignableRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Moderator => "moderator",
            Self::Member => "member",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "moderator" => Some(Self::Moderator),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

impl From<AssignableRole> for Role {
    fn from(role: AssignableRole) -> Self {
        match role {
            AssignableRole::Moderator => Self::Moderator,
            AssignableRole::Member => Self::Member,
        }
    }
}

/// A user's public profile. The credential hash never leaves the server,
/// so it has no field here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of a circle's roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleMember {
    pub circle_id: i64,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// A circle with its embedded roster, as served by the API.
///
/// Treated as an immutable snapshot by consumers: membership mutations
/// produce a fresh snapshot rather than editing `members` in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub owner_name: Option<String>,
    pub members: Vec<CircleMember>,
    pub member_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Circle {
    /// The requesting user's roster row, if any.
    #[must_use]
    pub fn member(&self, user_id: i64) -> Option<&CircleMember> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// New snapshot with an extra roster row.
    #[must_use]
    pub fn with_member(&self, member: CircleMember) -> Self {
        let mut next = self.clone();
        next.members.push(member);
        next.member_count = next.members.len();
        next
    }

    /// New snapshot with one member's role replaced.
    #[must_use]
    pub fn with_member_role(&self, user_id: i64, role: Role) -> Self {
        let mut next = self.clone();
        for member in &mut next.members {
            if member.user_id == user_id {
                member.role = role;
            }
        }
        next
    }

    /// New snapshot without the given member.
    #[must_use]
    pub fn without_member(&self, user_id: i64) -> Self {
        let mut next = self.clone();
        next.members.retain(|m| m.user_id != user_id);
        next.member_count = next.members.len();
        next
    }
}

/// A post, optionally scoped to a circle (`circle_id: None` ⇒ public).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub circle_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
