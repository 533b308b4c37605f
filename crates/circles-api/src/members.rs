use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use circles_db::Database;
use circles_types::api::{AddMemberRequest, MemberActionResponse, UpdateRoleRequest};
use circles_types::authz;
use circles_types::models::{AssignableRole, Role};

use crate::auth::AppState;
use crate::circles::capabilities_of;
use crate::convert;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::run_blocking;

fn require_circle(db: &Database, circle_id: i64) -> Result<(), ApiError> {
    if db.get_circle(circle_id)?.is_none() {
        return Err(ApiError::NotFound("Circle not found".into()));
    }
    Ok(())
}

/// The requester's parsed role, or 403 when they hold no roster row.
fn requester_role(db: &Database, circle_id: i64, user_id: i64) -> Result<Role, ApiError> {
    db.get_member(circle_id, user_id)?
        .and_then(|m| Role::parse(&m.role))
        .ok_or_else(|| ApiError::Forbidden("You are not a member of this circle".into()))
}

/// Add a user to a circle. Owner/moderator only; new members always join
/// with the `member` role.
pub async fn add_member(
    State(state): State<AppState>,
    Path(circle_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let member = run_blocking(move || {
        require_circle(&db.db, circle_id)?;

        if !capabilities_of(&db.db, circle_id, current.id)?.can_manage_members {
            return Err(ApiError::Forbidden(
                "Only circle owners and moderators can add members".into(),
            ));
        }

        if db.db.get_user_by_id(req.user_id)?.is_none() {
            return Err(ApiError::NotFound("User not found".into()));
        }

        if db.db.get_member(circle_id, req.user_id)?.is_some() {
            return Err(ApiError::BadRequest(
                "User is already a member of this circle".into(),
            ));
        }

        db.db.add_member(circle_id, req.user_id, Role::Member.as_str())?;
        db.db
            .get_member(circle_id, req.user_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("membership vanished after insert")))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MemberActionResponse {
            success: true,
            message: "Member added successfully".into(),
            member: Some(convert::circle_member(member)),
        }),
    ))
}

/// Remove a member. The row-level rule decides: the owner row is
/// untouchable, owners manage everyone else, moderators manage plain
/// members only.
pub async fn remove_member(
    State(state): State<AppState>,
    Path((circle_id, user_id)): Path<(i64, i64)>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<MemberActionResponse>, ApiError> {
    let db = state.clone();
    let username = run_blocking(move || {
        require_circle(&db.db, circle_id)?;

        let target = db
            .db
            .get_member(circle_id, user_id)?
            .ok_or_else(|| ApiError::NotFound("Member not found in this circle".into()))?;
        let target_role = Role::parse(&target.role).unwrap_or(Role::Member);

        let requester = requester_role(&db.db, circle_id, current.id)?;

        if !authz::can_manage_target(requester, target_role) {
            let detail = match (requester, target_role) {
                (_, Role::Owner) => "Cannot remove the circle owner",
                (Role::Moderator, Role::Moderator) => "Moderators cannot remove other moderators",
                _ => "Only owners and moderators can remove members",
            };
            return Err(ApiError::Forbidden(detail.into()));
        }

        db.db.remove_member(circle_id, user_id)?;
        Ok(target.username)
    })
    .await?;

    Ok(Json(MemberActionResponse {
        success: true,
        message: format!("Member {} removed successfully", username),
        member: None,
    }))
}

/// Change a member's role. Owner only; the owner's own role is immutable
/// and `owner` is never an assignable target value.
pub async fn update_member_role(
    State(state): State<AppState>,
    Path((circle_id, user_id)): Path<(i64, i64)>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<MemberActionResponse>, ApiError> {
    // The wire keeps the role as a string so an invalid value is a 400
    // with a message, not a framework rejection.
    let new_role = AssignableRole::parse(&req.role)
        .ok_or_else(|| ApiError::BadRequest("Invalid role".into()))?;

    let db = state.clone();
    let (member, old_role) = run_blocking(move || {
        require_circle(&db.db, circle_id)?;

        if !capabilities_of(&db.db, circle_id, current.id)?.can_change_roles {
            return Err(ApiError::Forbidden("Only the circle owner can change roles".into()));
        }

        let target = db
            .db
            .get_member(circle_id, user_id)?
            .ok_or_else(|| ApiError::NotFound("Member not found in this circle".into()))?;

        if Role::parse(&target.role) == Some(Role::Owner) {
            return Err(ApiError::Forbidden("Cannot change the circle owner's role".into()));
        }

        db.db.update_member_role(circle_id, user_id, Role::from(new_role).as_str())?;
        let updated = db
            .db
            .get_member(circle_id, user_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("membership vanished after update")))?;
        Ok((updated, target.role))
    })
    .await?;

    Ok(Json(MemberActionResponse {
        success: true,
        message: format!("Role changed from {} to {}", old_role, new_role.as_str()),
        member: Some(convert::circle_member(member)),
    }))
}
