//! Poll endpoints.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use pollbox_common::AppResult;
use pollbox_core::PollResults;
use pollbox_db::entities::{poll, poll_vote};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{ApiJson, MaybeIdentity},
    middleware::AppState,
    response::{ApiResponse, no_content},
};

/// Poll response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    /// Poll ID.
    pub id: String,
    /// Creator of the poll.
    pub owner_id: String,
    /// Question text.
    pub question: String,
    /// Option texts, in display order.
    pub options: Vec<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<poll::Model> for PollResponse {
    fn from(poll: poll::Model) -> Self {
        Self {
            id: poll.id,
            owner_id: poll.owner_id,
            question: poll.question,
            options: poll.options.0,
            created_at: poll.created_at.to_rfc3339(),
        }
    }
}

/// Poll results response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResultsResponse {
    /// The poll being tallied.
    pub poll: PollResponse,
    /// One entry per option, in display order.
    pub options: Vec<PollOptionResponse>,
    /// Votes counted across all options.
    pub total_votes: u64,
}

/// Per-option tally.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResponse {
    /// Option text.
    pub text: String,
    /// Votes for this option.
    pub votes: u64,
    /// Whether the caller chose this option.
    pub is_voted: bool,
}

impl From<PollResults> for PollResultsResponse {
    fn from(results: PollResults) -> Self {
        let voted = results
            .voted_option
            .and_then(|i| usize::try_from(i).ok());

        let options = results
            .poll
            .options
            .0
            .iter()
            .zip(&results.counts)
            .enumerate()
            .map(|(i, (text, votes))| PollOptionResponse {
                text: text.clone(),
                votes: *votes,
                is_voted: voted == Some(i),
            })
            .collect();

        Self {
            poll: results.poll.into(),
            options,
            total_votes: results.total_votes,
        }
    }
}

/// Vote response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    /// Vote ID.
    pub id: String,
    /// Poll voted on.
    pub poll_id: String,
    /// Chosen option.
    pub option_index: i32,
}

impl From<poll_vote::Model> for VoteResponse {
    fn from(vote: poll_vote::Model) -> Self {
        Self {
            id: vote.id,
            poll_id: vote.poll_id,
            option_index: vote.option_index,
        }
    }
}

/// Create or replace poll content.
///
/// Length and count limits are applied by the service after the caller is
/// authorized.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollContentRequest {
    /// Question text.
    pub question: String,
    /// Option texts, in display order.
    pub options: Vec<String>,
}

/// Vote request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// Zero-based index into the poll's options.
    pub option_index: i32,
}

/// Create a poll.
async fn create_poll(
    identity: MaybeIdentity,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PollContentRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .poll_service
        .create_poll(identity.identity(), &req.question, req.options)
        .await?;

    Ok(ApiResponse::created(poll.into()))
}

/// Get a poll.
async fn show_poll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state.poll_service.get_poll(&id).await?;
    Ok(ApiResponse::ok(poll.into()))
}

/// Polls created by the caller.
async fn my_polls(
    identity: MaybeIdentity,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    let polls = state.poll_service.list_own_polls(identity.identity()).await?;
    Ok(ApiResponse::ok(polls.into_iter().map(Into::into).collect()))
}

/// Every poll (admin).
async fn all_polls(
    identity: MaybeIdentity,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    let polls = state.poll_service.list_all_polls(identity.identity()).await?;
    Ok(ApiResponse::ok(polls.into_iter().map(Into::into).collect()))
}

/// Replace question and options.
async fn update_poll(
    identity: MaybeIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<PollContentRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .poll_service
        .update_poll(identity.identity(), &id, &req.question, req.options)
        .await?;

    Ok(ApiResponse::ok(poll.into()))
}

/// Delete a poll.
async fn delete_poll(
    identity: MaybeIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .poll_service
        .delete_poll(identity.identity(), &id)
        .await?;
    Ok(no_content())
}

/// Vote on a poll.
async fn vote(
    identity: MaybeIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> AppResult<ApiResponse<VoteResponse>> {
    let vote = state
        .poll_service
        .submit_vote(identity.identity(), &id, req.option_index)
        .await?;
    Ok(ApiResponse::created(vote.into()))
}

/// Vote tally.
async fn results(
    identity: MaybeIdentity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PollResultsResponse>> {
    let results = state
        .poll_service
        .get_results(identity.identity(), &id)
        .await?;
    Ok(ApiResponse::ok(results.into()))
}

/// Routes mounted under `/polls`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_poll))
        .route("/mine", get(my_polls))
        .route("/all", get(all_polls))
        .route("/{id}", get(show_poll).patch(update_poll).delete(delete_poll))
        .route("/{id}/results", get(results))
        .route("/{id}/votes", post(vote))
}
