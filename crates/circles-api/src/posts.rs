use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use circles_types::api::CreatePostRequest;
use circles_types::models::Post;
use circles_types::validate;

use crate::auth::AppState;
use crate::circles::capabilities_of;
use crate::convert;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::run_blocking;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

/// Recent posts from the requester's circles, newest first.
pub async fn get_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let limit = query.limit.min(100);
    let offset = query.offset;

    let db = state.clone();
    let posts = run_blocking(move || {
        let rows = db.db.feed_posts(current.id, limit, offset)?;
        Ok(rows.into_iter().map(convert::post).collect::<Vec<_>>())
    })
    .await?;
    Ok(Json(posts))
}

/// Create a post, either public (`circle_id: None`) or inside a circle
/// the requester belongs to.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::post_title(&req.title).map_err(ApiError::BadRequest)?;
    validate::post_content(&req.content).map_err(ApiError::BadRequest)?;

    let db = state.clone();
    let post = run_blocking(move || {
        if let Some(circle_id) = req.circle_id {
            if db.db.get_member(circle_id, current.id)?.is_none() {
                return Err(ApiError::Forbidden(
                    "You are not a member of this circle".into(),
                ));
            }
        }

        let post_id = db.db.insert_post(&req.title, &req.content, current.id, req.circle_id)?;
        db.db
            .get_post(post_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("created post {} not found", post_id)))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::post(post))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Post>, ApiError> {
    let db = state.clone();
    let post = run_blocking(move || {
        let post = db
            .db
            .get_post(post_id)?
            .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

        // Circle posts are visible to members only.
        if let Some(circle_id) = post.circle_id {
            if db.db.get_member(circle_id, current.id)?.is_none() {
                return Err(ApiError::Forbidden("You don't have access to this post".into()));
            }
        }
        Ok(post)
    })
    .await?;
    Ok(Json(convert::post(post)))
}

/// Deletion is allowed to the author, or to the circle's owner/moderators
/// for circle posts.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    run_blocking(move || {
        let post = db
            .db
            .get_post(post_id)?
            .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

        let mut can_delete = post.author_id == current.id;
        if !can_delete {
            if let Some(circle_id) = post.circle_id {
                can_delete = capabilities_of(&db.db, circle_id, current.id)?.can_moderate;
            }
        }

        if !can_delete {
            return Err(ApiError::Forbidden(
                "You don't have permission to delete this post".into(),
            ));
        }

        db.db.delete_post(post_id)?;
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
