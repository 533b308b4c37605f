use axum::{Extension, Json, extract::{Query, State}};
use serde::Deserialize;

use circles_types::api::UserSearchResult;

use crate::auth::AppState;
use crate::circles::capabilities_of;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::run_blocking;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub circle_id: i64,
}

/// Candidate search for the add-member flow. Owner/moderator only;
/// the requester and existing roster members never appear.
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<UserSearchResult>>, ApiError> {
    let db = state.clone();
    let results = run_blocking(move || {
        if !capabilities_of(&db.db, params.circle_id, current.id)?.can_manage_members {
            return Err(ApiError::Forbidden(
                "Only circle owners and moderators can search for new members".into(),
            ));
        }

        let query = params.query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let rows = db.db.search_users(query, params.circle_id, current.id)?;
        Ok(rows
            .into_iter()
            .map(|u| UserSearchResult {
                id: u.id,
                username: u.username,
                email: u.email,
            })
            .collect())
    })
    .await?;
    Ok(Json(results))
}
