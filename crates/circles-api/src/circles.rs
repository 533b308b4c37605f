use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use circles_db::Database;
use circles_types::api::{CreateCircleRequest, RenameCircleRequest};
use circles_types::authz::Capabilities;
use circles_types::models::{Circle, Role};
use circles_types::validate;

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::run_blocking;

/// Loads a circle with its full roster, or 404.
fn load_circle(db: &Database, circle_id: i64) -> Result<Circle, ApiError> {
    let row = db
        .get_circle(circle_id)?
        .ok_or_else(|| ApiError::NotFound("Circle not found".into()))?;
    let members = db.circle_members(circle_id)?;
    Ok(convert::circle(row, members))
}

/// The requester's capabilities in a circle, fail-closed when they hold
/// no roster row.
pub(crate) fn capabilities_of(db: &Database, circle_id: i64, user_id: i64) -> Result<Capabilities, ApiError> {
    let caps = db
        .get_member(circle_id, user_id)?
        .and_then(|m| Role::parse(&m.role))
        .map(Capabilities::for_role)
        .unwrap_or(Capabilities::none());
    Ok(caps)
}

pub async fn create_circle(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateCircleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::circle_name(&req.name).map_err(ApiError::BadRequest)?;
    if let Some(description) = &req.description {
        validate::description(description).map_err(ApiError::BadRequest)?;
    }

    let db = state.clone();
    let circle = run_blocking(move || {
        if db.db.get_circle_by_name(&req.name)?.is_some() {
            return Err(ApiError::BadRequest(
                "A circle with this name already exists".into(),
            ));
        }
        // Creator becomes the sole owner-member atomically.
        let circle_id = db.db.create_circle(&req.name, req.description.as_deref(), current.id)?;
        load_circle(&db.db, circle_id)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(circle)))
}

/// Circles where the requester is a member, newest first.
pub async fn my_circles(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Circle>>, ApiError> {
    let db = state.clone();
    let circles = run_blocking(move || {
        let rows = db.db.circles_for_user(current.id)?;
        let mut circles = Vec::with_capacity(rows.len());
        for row in rows {
            let members = db.db.circle_members(row.id)?;
            circles.push(convert::circle(row, members));
        }
        Ok(circles)
    })
    .await?;
    Ok(Json(circles))
}

/// Members only: non-members get 403, unknown circles 404.
pub async fn get_circle(
    State(state): State<AppState>,
    Path(circle_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Circle>, ApiError> {
    let db = state.clone();
    let circle = run_blocking(move || {
        let circle = load_circle(&db.db, circle_id)?;
        if circle.member(current.id).is_none() {
            return Err(ApiError::Forbidden(
                "You are not a member of this circle".into(),
            ));
        }
        Ok(circle)
    })
    .await?;
    Ok(Json(circle))
}

pub async fn update_circle(
    State(state): State<AppState>,
    Path(circle_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateCircleRequest>,
) -> Result<Json<Circle>, ApiError> {
    validate::circle_name(&req.name).map_err(ApiError::BadRequest)?;
    if let Some(description) = &req.description {
        validate::description(description).map_err(ApiError::BadRequest)?;
    }

    let db = state.clone();
    let circle = run_blocking(move || {
        if db.db.get_circle(circle_id)?.is_none() {
            return Err(ApiError::NotFound("Circle not found".into()));
        }
        if !capabilities_of(&db.db, circle_id, current.id)?.can_change_settings {
            return Err(ApiError::Forbidden("Only the circle owner can update it".into()));
        }
        db.db.update_circle(circle_id, &req.name, req.description.as_deref())?;
        load_circle(&db.db, circle_id)
    })
    .await?;
    Ok(Json(circle))
}

pub async fn rename_circle(
    State(state): State<AppState>,
    Path(circle_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RenameCircleRequest>,
) -> Result<Json<Circle>, ApiError> {
    validate::circle_name(&req.name).map_err(ApiError::BadRequest)?;

    let db = state.clone();
    let circle = run_blocking(move || {
        if db.db.get_circle(circle_id)?.is_none() {
            return Err(ApiError::NotFound("Circle not found".into()));
        }
        if !capabilities_of(&db.db, circle_id, current.id)?.can_change_settings {
            return Err(ApiError::Forbidden(
                "Only the circle owner can rename the circle".into(),
            ));
        }
        db.db.update_circle_name(circle_id, &req.name)?;
        load_circle(&db.db, circle_id)
    })
    .await?;
    Ok(Json(circle))
}

pub async fn delete_circle(
    State(state): State<AppState>,
    Path(circle_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    run_blocking(move || {
        if db.db.get_circle(circle_id)?.is_none() {
            return Err(ApiError::NotFound("Circle not found".into()));
        }
        if !capabilities_of(&db.db, circle_id, current.id)?.can_delete_circle {
            return Err(ApiError::Forbidden("Only the circle owner can delete it".into()));
        }
        db.db.delete_circle(circle_id)?;
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
