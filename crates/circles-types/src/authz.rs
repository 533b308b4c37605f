//! Circle authorization engine.
//!
//! Pure functions from (circle roster, requesting user) to a capability
//! set. The server uses these to decide 403s; the client uses the same
//! functions to gate management controls, so the two sides share one
//! rule set. Absent context resolves to no capabilities.

use crate::models::{Circle, Role, UserProfile};

/// Derived permissions for one (circle, user) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub is_owner: bool,
    pub is_moderator: bool,
    pub is_member: bool,
    pub can_moderate: bool,
    pub can_manage_members: bool,
    pub can_change_roles: bool,
    pub can_delete_circle: bool,
    pub can_change_settings: bool,
}

impl Capabilities {
    /// The fail-closed default: no membership, no capabilities.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            is_owner: false,
            is_moderator: false,
            is_member: false,
            can_moderate: false,
            can_manage_members: false,
            can_change_roles: false,
            can_delete_circle: false,
            can_change_settings: false,
        }
    }

    /// Capabilities granted by holding `role` in a circle.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        let is_owner = matches!(role, Role::Owner);
        let is_moderator = matches!(role, Role::Moderator);
        Self {
            is_owner,
            is_moderator,
            is_member: true,
            can_moderate: is_owner || is_moderator,
            can_manage_members: is_owner || is_moderator,
            can_change_roles: is_owner,
            can_delete_circle: is_owner,
            can_change_settings: is_owner,
        }
    }
}

/// Computes the capability set for `user` within `circle`.
///
/// Missing circle, missing user, or no roster row all yield
/// [`Capabilities::none`].
#[must_use]
pub fn compute_capabilities(circle: Option<&Circle>, user: Option<&UserProfile>) -> Capabilities {
    let (Some(circle), Some(user)) = (circle, user) else {
        return Capabilities::none();
    };
    match circle.member(user.id) {
        Some(member) => Capabilities::for_role(member.role),
        None => Capabilities::none(),
    }
}

/// Row-level management rule: may `requester` act on a roster row held
/// by `target` (change its role, remove it)?
///
/// The owner row is immutable through this path. Owners manage everyone
/// else; moderators manage plain members only.
#[must_use]
pub const fn can_manage_target(requester: Role, target: Role) -> bool {
    if matches!(target, Role::Owner) {
        return false;
    }
    match requester {
        Role::Owner => true,
        Role::Moderator => matches!(target, Role::Member),
        Role::Member => false,
    }
}
