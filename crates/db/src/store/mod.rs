//! Poll store abstraction.
//!
//! Services talk to storage through [`PollStore`] so the authorization logic
//! can run against Postgres ([`DbPollStore`]) or an in-process map
//! ([`MemoryPollStore`]) with identical constraint semantics:
//!
//! - at most one vote per `(poll_id, voter_id)` when `voter_id` is set; the
//!   losing insert fails with [`AppError::Conflict`](pollbox_common::AppError::Conflict)
//! - mutations are scoped to the `id` **and** `owner_id` of the target row
//! - deleting a poll deletes its votes

mod memory;

pub use memory::MemoryPollStore;

use std::sync::Arc;

use async_trait::async_trait;
use pollbox_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, Set};

use crate::entities::{poll, poll_vote};
use crate::repositories::{PollRepository, PollVoteRepository};

/// Which polls to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFilter<'a> {
    /// Polls created by the given identity.
    OwnedBy(&'a str),
    /// Every poll.
    All,
}

/// New content for an existing poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollChanges {
    /// Replacement question.
    pub question: String,
    /// Replacement options.
    pub options: poll::PollOptions,
}

/// Storage operations needed by the poll service.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Fetch a poll by ID.
    async fn get_poll(&self, id: &str) -> AppResult<Option<poll::Model>>;

    /// Persist a new poll.
    async fn insert_poll(&self, poll: poll::Model) -> AppResult<poll::Model>;

    /// List polls, newest first.
    async fn list_polls(&self, filter: PollFilter<'_>) -> AppResult<Vec<poll::Model>>;

    /// Replace question and options of `target`.
    ///
    /// The write is filtered by `target.id` and `target.owner_id`; if no row
    /// matches any more the call fails with `NotFound`.
    async fn update_poll(
        &self,
        target: &poll::Model,
        changes: PollChanges,
    ) -> AppResult<poll::Model>;

    /// Delete `target` and its votes, filtered like [`PollStore::update_poll`].
    async fn delete_poll(&self, target: &poll::Model) -> AppResult<()>;

    /// The vote `voter_id` cast on `poll_id`, if any.
    async fn find_vote(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<poll_vote::Model>>;

    /// Persist a vote; `Conflict` if the voter already voted on the poll.
    async fn insert_vote(&self, vote: poll_vote::Model) -> AppResult<poll_vote::Model>;

    /// All votes on a poll.
    async fn votes_for_poll(&self, poll_id: &str) -> AppResult<Vec<poll_vote::Model>>;
}

/// [`PollStore`] backed by the sea-orm repositories.
#[derive(Clone)]
pub struct DbPollStore {
    polls: PollRepository,
    votes: PollVoteRepository,
}

impl DbPollStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            polls: PollRepository::new(Arc::clone(&db)),
            votes: PollVoteRepository::new(db),
        }
    }
}

#[async_trait]
impl PollStore for DbPollStore {
    async fn get_poll(&self, id: &str) -> AppResult<Option<poll::Model>> {
        self.polls.find_by_id(id).await
    }

    async fn insert_poll(&self, poll: poll::Model) -> AppResult<poll::Model> {
        let model = poll::ActiveModel {
            id: Set(poll.id),
            owner_id: Set(poll.owner_id),
            question: Set(poll.question),
            options: Set(poll.options),
            created_at: Set(poll.created_at),
        };
        self.polls.create(model).await
    }

    async fn list_polls(&self, filter: PollFilter<'_>) -> AppResult<Vec<poll::Model>> {
        match filter {
            PollFilter::OwnedBy(owner_id) => self.polls.find_by_owner(owner_id).await,
            PollFilter::All => self.polls.find_all().await,
        }
    }

    async fn update_poll(
        &self,
        target: &poll::Model,
        changes: PollChanges,
    ) -> AppResult<poll::Model> {
        let updated = self
            .polls
            .update_content(
                &target.id,
                &target.owner_id,
                changes.question.clone(),
                changes.options.clone(),
            )
            .await?;

        if updated == 0 {
            return Err(AppError::NotFound(format!("Poll not found: {}", target.id)));
        }

        Ok(poll::Model {
            question: changes.question,
            options: changes.options,
            ..target.clone()
        })
    }

    async fn delete_poll(&self, target: &poll::Model) -> AppResult<()> {
        let deleted = self.polls.delete(&target.id, &target.owner_id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("Poll not found: {}", target.id)));
        }
        Ok(())
    }

    async fn find_vote(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<poll_vote::Model>> {
        self.votes.find_by_poll_and_voter(poll_id, voter_id).await
    }

    async fn insert_vote(&self, vote: poll_vote::Model) -> AppResult<poll_vote::Model> {
        let model = poll_vote::ActiveModel {
            id: Set(vote.id),
            poll_id: Set(vote.poll_id),
            voter_id: Set(vote.voter_id),
            option_index: Set(vote.option_index),
            created_at: Set(vote.created_at),
        };
        self.votes.create(model).await
    }

    async fn votes_for_poll(&self, poll_id: &str) -> AppResult<Vec<poll_vote::Model>> {
        self.votes.find_by_poll(poll_id).await
    }
}
