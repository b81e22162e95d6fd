use crate::error::{AppError, AppResult};
use crate::middleware::auth::parse_user_id;
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::models::VoteKind;
use crate::response::ApiResponse;
use crate::services::vote::{VoteService, VoteStats, Voter};
use axum::http::StatusCode;
use axum::{extract::Path, response::IntoResponse, Extension, Json};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CastVoteRequest {
    /// "upvote" or "downvote"
    pub vote_kind: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteStatsResponse {
    pub target_id: i32,
    pub upvotes: u64,
    pub downvotes: u64,
    /// The requesting user's current vote, when authenticated and present.
    pub user_vote: Option<VoteKind>,
}

impl VoteStatsResponse {
    fn from_stats(target_id: i32, stats: VoteStats) -> Self {
        Self {
            target_id,
            upvotes: stats.upvotes,
            downvotes: stats.downvotes,
            user_vote: stats.user_vote,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoterResponse {
    pub user_id: i32,
    pub username: String,
    pub voted_at: String,
}

impl From<Voter> for VoterResponse {
    fn from(v: Voter) -> Self {
        Self {
            user_id: v.user.id,
            username: v.user.username,
            voted_at: v.voted_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VotersResponse {
    pub upvoters: Vec<VoterResponse>,
    pub downvoters: Vec<VoterResponse>,
}

#[utoipa::path(
    post,
    path = "/api/v1/votes/{target_id}",
    security(("jwt_token" = [])),
    params(("target_id" = i32, Path, description = "Location ID")),
    request_body = CastVoteRequest,
    responses(
        (status = 201, description = "Vote recorded", body = VoteStatsResponse),
        (status = 400, description = "Invalid input", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
        (status = 404, description = "Target not found", body = AppError),
    ),
    tag = "votes"
)]
pub async fn cast_vote(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(target_id): Path<i32>,
    Json(payload): Json<CastVoteRequest>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;
    let kind: VoteKind = payload.vote_kind.parse().map_err(AppError::Validation)?;

    let service = VoteService::new(db);
    service.cast_vote(user_id, target_id, kind).await?;
    let stats = service.get_stats(target_id, Some(user_id)).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(VoteStatsResponse::from_stats(target_id, stats)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/votes/{target_id}",
    security(("jwt_token" = [])),
    params(("target_id" = i32, Path, description = "Location ID")),
    responses(
        (status = 204, description = "Vote removed"),
        (status = 400, description = "No vote to remove", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "votes"
)]
pub async fn remove_vote(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(target_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let user_id = parse_user_id(&auth_user)?;

    let service = VoteService::new(db);
    service.remove_vote(user_id, target_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/votes/{target_id}/stats",
    params(("target_id" = i32, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Vote statistics", body = VoteStatsResponse),
    ),
    tag = "votes"
)]
pub async fn get_vote_stats(
    Extension(db): Extension<DatabaseConnection>,
    OptionalAuthUser(auth_user): OptionalAuthUser,
    Path(target_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let requesting_user_id = auth_user.as_ref().and_then(|u| u.user_id.parse::<i32>().ok());

    let service = VoteService::new(db);
    let stats = service.get_stats(target_id, requesting_user_id).await?;

    Ok(ApiResponse::ok(VoteStatsResponse::from_stats(
        target_id, stats,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/votes/{target_id}/voters",
    params(("target_id" = i32, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Voters by polarity, most recent first", body = VotersResponse),
    ),
    tag = "votes"
)]
pub async fn list_voters(
    Extension(db): Extension<DatabaseConnection>,
    Path(target_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let service = VoteService::new(db);
    let (upvoters, downvoters) = service.list_voters(target_id).await?;

    Ok(ApiResponse::ok(VotersResponse {
        upvoters: upvoters.into_iter().map(VoterResponse::from).collect(),
        downvoters: downvoters.into_iter().map(VoterResponse::from).collect(),
    }))
}
