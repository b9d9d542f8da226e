//! Poll repository.

use std::sync::Arc;

use super::map_db_err;
use crate::entities::{Poll, PollVote, poll, poll_vote};
use pollbox_common::AppResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create a new poll.
    pub async fn create(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// Polls owned by a user, newest first.
    pub async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(poll::Column::OwnerId.eq(owner_id))
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Every poll, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .order_by_desc(poll::Column::CreatedAt)
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Replace question and options of the poll matching both `id` and `owner_id`.
    ///
    /// Returns the number of rows updated (0 if the poll is gone).
    pub async fn update_content(
        &self,
        id: &str,
        owner_id: &str,
        question: String,
        options: poll::PollOptions,
    ) -> AppResult<u64> {
        let changes = poll::ActiveModel {
            question: Set(question),
            options: Set(options),
            ..Default::default()
        };

        let result = Poll::update_many()
            .set(changes)
            .filter(poll::Column::Id.eq(id))
            .filter(poll::Column::OwnerId.eq(owner_id))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected)
    }

    /// Delete the poll matching both `id` and `owner_id`. Votes cascade.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete(&self, id: &str, owner_id: &str) -> AppResult<u64> {
        let result = Poll::delete_many()
            .filter(poll::Column::Id.eq(id))
            .filter(poll::Column::OwnerId.eq(owner_id))
            .exec(self.db.as_ref())
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected)
    }
}

/// Poll vote repository for database operations.
#[derive(Clone)]
pub struct PollVoteRepository {
    db: Arc<DatabaseConnection>,
}

impl PollVoteRepository {
    /// Create a new poll vote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the vote a voter cast on a poll.
    pub async fn find_by_poll_and_voter(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .filter(poll_vote::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }

    /// Create a new vote.
    ///
    /// Fails with [`AppError::Conflict`](pollbox_common::AppError::Conflict) when the voter already has a vote on the poll.
    pub async fn create(&self, model: poll_vote::ActiveModel) -> AppResult<poll_vote::Model> {
        model.insert(self.db.as_ref()).await.map_err(map_db_err)
    }

    /// All votes on a poll.
    pub async fn find_by_poll(&self, poll_id: &str) -> AppResult<Vec<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .order_by_asc(poll_vote::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(map_db_err)
    }
}
