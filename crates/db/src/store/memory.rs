//! In-process poll store.

use std::collections::HashMap;

use async_trait::async_trait;
use pollbox_common::{AppError, AppResult};
use tokio::sync::RwLock;

use super::{PollChanges, PollFilter, PollStore};
use crate::entities::{poll, poll_vote};

#[derive(Default)]
struct State {
    polls: HashMap<String, poll::Model>,
    votes: Vec<poll_vote::Model>,
}

/// [`PollStore`] kept in memory, mirroring the database constraints.
///
/// Used by tests and local runs without Postgres. Every operation takes the
/// lock once, so the vote uniqueness check and the insert are atomic.
#[derive(Default)]
pub struct MemoryPollStore {
    state: RwLock<State>,
}

impl MemoryPollStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored votes on a poll cast by `voter_id` (`None` counts anonymous votes).
    pub async fn count_votes(&self, poll_id: &str, voter_id: Option<&str>) -> usize {
        let state = self.state.read().await;
        state
            .votes
            .iter()
            .filter(|v| v.poll_id == poll_id && v.voter_id.as_deref() == voter_id)
            .count()
    }
}

fn newest_first(polls: &mut [poll::Model]) {
    polls.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn get_poll(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Ok(self.state.read().await.polls.get(id).cloned())
    }

    async fn insert_poll(&self, poll: poll::Model) -> AppResult<poll::Model> {
        let mut state = self.state.write().await;
        if state.polls.contains_key(&poll.id) {
            return Err(AppError::Conflict(format!("Poll already exists: {}", poll.id)));
        }
        state.polls.insert(poll.id.clone(), poll.clone());
        Ok(poll)
    }

    async fn list_polls(&self, filter: PollFilter<'_>) -> AppResult<Vec<poll::Model>> {
        let state = self.state.read().await;
        let mut polls: Vec<poll::Model> = state
            .polls
            .values()
            .filter(|p| match filter {
                PollFilter::OwnedBy(owner_id) => p.owner_id == owner_id,
                PollFilter::All => true,
            })
            .cloned()
            .collect();
        newest_first(&mut polls);
        Ok(polls)
    }

    async fn update_poll(
        &self,
        target: &poll::Model,
        changes: PollChanges,
    ) -> AppResult<poll::Model> {
        let mut state = self.state.write().await;
        let stored = state
            .polls
            .get_mut(&target.id)
            .filter(|p| p.owner_id == target.owner_id)
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {}", target.id)))?;

        stored.question = changes.question;
        stored.options = changes.options;
        Ok(stored.clone())
    }

    async fn delete_poll(&self, target: &poll::Model) -> AppResult<()> {
        let mut state = self.state.write().await;
        let owned = state
            .polls
            .get(&target.id)
            .is_some_and(|p| p.owner_id == target.owner_id);
        if !owned {
            return Err(AppError::NotFound(format!("Poll not found: {}", target.id)));
        }

        state.polls.remove(&target.id);
        state.votes.retain(|v| v.poll_id != target.id);
        Ok(())
    }

    async fn find_vote(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> AppResult<Option<poll_vote::Model>> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .iter()
            .find(|v| v.poll_id == poll_id && v.voter_id.as_deref() == Some(voter_id))
            .cloned())
    }

    async fn insert_vote(&self, vote: poll_vote::Model) -> AppResult<poll_vote::Model> {
        let mut state = self.state.write().await;

        if !state.polls.contains_key(&vote.poll_id) {
            return Err(AppError::NotFound(format!("Poll not found: {}", vote.poll_id)));
        }

        if let Some(voter_id) = vote.voter_id.as_deref() {
            let taken = state
                .votes
                .iter()
                .any(|v| v.poll_id == vote.poll_id && v.voter_id.as_deref() == Some(voter_id));
            if taken {
                return Err(AppError::Conflict(format!(
                    "duplicate key (poll_id, voter_id)=({}, {voter_id})",
                    vote.poll_id
                )));
            }
        }

        state.votes.push(vote.clone());
        Ok(vote)
    }

    async fn votes_for_poll(&self, poll_id: &str) -> AppResult<Vec<poll_vote::Model>> {
        let state = self.state.read().await;
        Ok(state
            .votes
            .iter()
            .filter(|v| v.poll_id == poll_id)
            .cloned()
            .collect())
    }
}
