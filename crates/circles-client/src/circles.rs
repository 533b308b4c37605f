//! Circle and membership operations.
//!
//! Every mutation returns fresh data for the caller to fold into a new
//! roster snapshot; nothing here edits a `Circle` in place. A 403 from
//! the server is authoritative: it surfaces as `ClientError::Forbidden`
//! and no local state should be applied.

use std::sync::Arc;

use circles_types::api::{
    AddMemberRequest, CreateCircleRequest, CreatePostRequest, MemberActionResponse,
    RenameCircleRequest, UpdateRoleRequest, UserSearchResult,
};
use circles_types::authz::Capabilities;
use circles_types::models::{AssignableRole, Circle, CircleMember, Post, Role};
use circles_types::validate;

use crate::api::ApiClient;
use crate::error::ClientError;

/// Outcome of a removal attempt that passed through the confirmation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The user declined the prompt; no request was sent.
    Cancelled,
    Removed,
}

/// Outcome of a rename request.
#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    /// New name equals the current one; no request was sent.
    Unchanged,
    Renamed(Circle),
}

pub struct CircleClient {
    api: Arc<ApiClient>,
}

impl CircleClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, circle_id: i64) -> Result<Circle, ClientError> {
        self.api
            .get_json(&format!("/circles/{}", circle_id), "Failed to load circle")
            .await
    }

    pub async fn my_circles(&self) -> Result<Vec<Circle>, ClientError> {
        self.api.get_json("/circles/my", "Failed to load circles").await
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Circle, ClientError> {
        validate::circle_name(name).map_err(ClientError::Invalid)?;
        if let Some(description) = description {
            validate::description(description).map_err(ClientError::Invalid)?;
        }
        let body = CreateCircleRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        self.api.post_json("/circles", &body, "Failed to create circle").await
    }

    /// Candidate search for the add-member flow.
    pub async fn search_candidates(
        &self,
        circle_id: i64,
        query: &str,
    ) -> Result<Vec<UserSearchResult>, ClientError> {
        self.api
            .get_json(
                &format!("/users/search?query={}&circle_id={}", query, circle_id),
                "Search failed",
            )
            .await
    }

    pub async fn add_member(
        &self,
        circle_id: i64,
        user_id: i64,
    ) -> Result<CircleMember, ClientError> {
        let body = AddMemberRequest { user_id };
        let resp: MemberActionResponse = self
            .api
            .post_json(
                &format!("/circles/{}/members", circle_id),
                &body,
                "Failed to add member",
            )
            .await?;
        resp.member
            .ok_or_else(|| ClientError::Payload("Server returned no membership".into()))
    }

    /// Removes a member after an explicit yes/no confirmation. The prompt
    /// is a UX safety gate, not a security boundary; declining sends
    /// nothing. The owner row is never a valid target.
    pub async fn remove_member<F>(
        &self,
        circle_id: i64,
        member: &CircleMember,
        confirm: F,
    ) -> Result<RemovalOutcome, ClientError>
    where
        F: FnOnce(&str) -> bool,
    {
        if member.role == Role::Owner {
            return Err(ClientError::Forbidden("Cannot remove the circle owner".into()));
        }
        let prompt = format!("Remove {} from circle?", member.username);
        if !confirm(&prompt) {
            return Ok(RemovalOutcome::Cancelled);
        }

        let _: MemberActionResponse = self
            .api
            .delete_json(
                &format!("/circles/{}/members/{}", circle_id, member.user_id),
                "Failed to remove member",
            )
            .await?;
        Ok(RemovalOutcome::Removed)
    }

    /// Changes a member's role. Owner is not an assignable value by
    /// construction; on success the caller folds the returned row into a
    /// new roster snapshot.
    pub async fn change_role(
        &self,
        circle_id: i64,
        user_id: i64,
        new_role: AssignableRole,
    ) -> Result<CircleMember, ClientError> {
        let body = UpdateRoleRequest {
            role: new_role.as_str().to_string(),
        };
        let resp: MemberActionResponse = self
            .api
            .put_json(
                &format!("/circles/{}/members/{}/role", circle_id, user_id),
                &body,
                "Failed to change role",
            )
            .await?;
        resp.member
            .ok_or_else(|| ClientError::Payload("Server returned no membership".into()))
    }

    /// Renames a circle. Short-circuits without a network call when the
    /// name is unchanged, and refuses locally when the capability set
    /// does not allow settings changes.
    pub async fn rename(
        &self,
        circle: &Circle,
        caps: &Capabilities,
        new_name: &str,
    ) -> Result<RenameOutcome, ClientError> {
        if new_name == circle.name {
            return Ok(RenameOutcome::Unchanged);
        }
        if !caps.can_change_settings {
            return Err(ClientError::Forbidden(
                "Only the circle owner can rename the circle".into(),
            ));
        }
        validate::circle_name(new_name).map_err(ClientError::Invalid)?;

        let body = RenameCircleRequest {
            name: new_name.to_string(),
        };
        let updated: Circle = self
            .api
            .put_json(
                &format!("/circles/{}/name", circle.id),
                &body,
                "Failed to rename circle",
            )
            .await?;
        Ok(RenameOutcome::Renamed(updated))
    }

    pub async fn delete(&self, circle_id: i64) -> Result<(), ClientError> {
        self.api
            .delete_empty(&format!("/circles/{}", circle_id), "Failed to delete circle")
            .await
    }

    // -- Posts --

    pub async fn feed(&self, limit: u32, offset: u32) -> Result<Vec<Post>, ClientError> {
        self.api
            .get_json(
                &format!("/posts/feed?limit={}&offset={}", limit, offset),
                "Failed to load feed",
            )
            .await
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        circle_id: Option<i64>,
    ) -> Result<Post, ClientError> {
        validate::post_title(title).map_err(ClientError::Invalid)?;
        validate::post_content(content).map_err(ClientError::Invalid)?;
        let body = CreatePostRequest {
            title: title.to_string(),
            content: content.to_string(),
            circle_id,
        };
        self.api.post_json("/posts", &body, "Failed to create post").await
    }

    pub async fn delete_post(&self, post_id: i64) -> Result<(), ClientError> {
        self.api
            .delete_empty(&format!("/posts/{}", post_id), "Failed to delete post")
            .await
    }
}
