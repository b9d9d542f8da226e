//! Poll service.

use std::sync::Arc;

use chrono::Utc;
use pollbox_common::{AppError, AppResult, IdGenerator, config::PollsConfig};
use pollbox_db::{
    PollChanges, PollFilter, PollStore,
    entities::{poll, poll_vote},
};
use tracing::{debug, info, warn};

use crate::identity::Identity;
use crate::policy::{Decision, DenyReason, PollPolicy};

/// Size limits applied to poll content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollLimits {
    /// Most options a poll may have after blank ones are dropped.
    pub max_options: usize,
    /// Longest option, in characters.
    pub max_option_length: usize,
    /// Longest question, in characters.
    pub max_question_length: usize,
}

impl Default for PollLimits {
    fn default() -> Self {
        Self::from_config(&PollsConfig::default())
    }
}

impl PollLimits {
    /// Limits from the `[polls]` configuration section.
    #[must_use]
    pub const fn from_config(config: &PollsConfig) -> Self {
        Self {
            max_options: config.max_options,
            max_option_length: config.max_option_length,
            max_question_length: config.max_question_length,
        }
    }
}

/// Vote tally for a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResults {
    /// The poll being tallied.
    pub poll: poll::Model,
    /// Votes per option, indexed like `poll.options`.
    pub counts: Vec<u64>,
    /// Sum of `counts`.
    pub total_votes: u64,
    /// The caller's own choice, when they have voted.
    pub voted_option: Option<i32>,
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn PollStore>,
    policy: PollPolicy,
    limits: PollLimits,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub fn new(store: Arc<dyn PollStore>, policy: PollPolicy) -> Self {
        Self {
            store,
            policy,
            limits: PollLimits::default(),
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll service with policy and limits taken from configuration.
    #[must_use]
    pub fn from_config(store: Arc<dyn PollStore>, config: &PollsConfig) -> Self {
        Self::new(store, PollPolicy::from_config(config)).with_limits(PollLimits::from_config(config))
    }

    /// Override the content limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: PollLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Create a poll owned by the caller.
    pub async fn create_poll(
        &self,
        identity: Option<&Identity>,
        question: &str,
        options: Vec<String>,
    ) -> AppResult<poll::Model> {
        let identity = identity.ok_or(AppError::Unauthenticated)?;
        let (question, options) = self.normalize_content(question, options)?;

        let model = poll::Model {
            id: self.id_gen.generate(),
            owner_id: identity.id.clone(),
            question,
            options,
            created_at: Utc::now().into(),
        };

        let poll = self.store.insert_poll(model).await?;
        info!(poll_id = %poll.id, owner_id = %poll.owner_id, options = poll.option_count(), "Poll created");
        Ok(poll)
    }

    /// Get a poll by ID. Public.
    pub async fn get_poll(&self, id: &str) -> AppResult<poll::Model> {
        self.store
            .get_poll(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {id}")))
    }

    /// Polls created by the caller, newest first.
    pub async fn list_own_polls(&self, identity: Option<&Identity>) -> AppResult<Vec<poll::Model>> {
        let identity = identity.ok_or(AppError::Unauthenticated)?;
        self.store.list_polls(PollFilter::OwnedBy(&identity.id)).await
    }

    /// Every poll, newest first. Admin only.
    pub async fn list_all_polls(&self, identity: Option<&Identity>) -> AppResult<Vec<poll::Model>> {
        enforce(self.policy.can_list_all(identity), identity, None)?;
        self.store.list_polls(PollFilter::All).await
    }

    /// Replace the question and options of a poll.
    ///
    /// `id`, `owner_id` and `created_at` never change. The write is scoped to
    /// the row that passed the authorization check.
    pub async fn update_poll(
        &self,
        identity: Option<&Identity>,
        id: &str,
        question: &str,
        options: Vec<String>,
    ) -> AppResult<poll::Model> {
        let target = self.get_poll(id).await?;
        enforce(self.policy.can_write(identity, &target), identity, Some(&target))?;

        let (question, options) = self.normalize_content(question, options)?;
        let poll = self
            .store
            .update_poll(&target, PollChanges { question, options })
            .await?;

        info!(
            poll_id = %poll.id,
            actor = identity.map(|i| i.id.as_str()),
            "Poll updated"
        );
        Ok(poll)
    }

    /// Delete a poll and its votes.
    pub async fn delete_poll(&self, identity: Option<&Identity>, id: &str) -> AppResult<()> {
        let target = self.get_poll(id).await?;
        enforce(self.policy.can_delete(identity, &target), identity, Some(&target))?;

        self.store.delete_poll(&target).await?;

        info!(
            poll_id = %target.id,
            actor = identity.map(|i| i.id.as_str()),
            "Poll deleted"
        );
        Ok(())
    }

    /// Record a vote.
    ///
    /// The existing-vote lookup is only a fast path: two concurrent requests
    /// can both pass it, and the store's uniqueness constraint rejects the
    /// second insert. That rejection is reported as a duplicate vote too.
    pub async fn submit_vote(
        &self,
        identity: Option<&Identity>,
        poll_id: &str,
        option_index: i32,
    ) -> AppResult<poll_vote::Model> {
        let poll = self.get_poll(poll_id).await?;

        let existing = match identity {
            Some(identity) => self.store.find_vote(&poll.id, &identity.id).await?,
            None => None,
        };

        enforce(
            self.policy
                .can_vote(identity, &poll, option_index, existing.as_ref()),
            identity,
            Some(&poll),
        )?;

        let vote = poll_vote::Model {
            id: self.id_gen.generate(),
            poll_id: poll.id.clone(),
            voter_id: identity.map(|i| i.id.clone()),
            option_index,
            created_at: Utc::now().into(),
        };

        match self.store.insert_vote(vote).await {
            Ok(vote) => {
                info!(poll_id = %vote.poll_id, voter_id = ?vote.voter_id, option_index, "Vote recorded");
                Ok(vote)
            }
            Err(AppError::Conflict(detail)) => {
                warn!(poll_id = %poll.id, detail = %detail, "Concurrent duplicate vote rejected by store");
                Err(duplicate_vote(&poll))
            }
            Err(e) => Err(e),
        }
    }

    /// Vote counts per option, plus the caller's own choice. Public.
    pub async fn get_results(
        &self,
        identity: Option<&Identity>,
        poll_id: &str,
    ) -> AppResult<PollResults> {
        let poll = self.get_poll(poll_id).await?;
        enforce(self.policy.can_read(identity, &poll), identity, Some(&poll))?;

        let votes = self.store.votes_for_poll(&poll.id).await?;

        // Options may have been edited since; votes pointing past the end are not counted.
        let mut counts = vec![0u64; poll.option_count()];
        for vote in &votes {
            if let Some(slot) = usize::try_from(vote.option_index)
                .ok()
                .and_then(|i| counts.get_mut(i))
            {
                *slot += 1;
            }
        }

        let voted_option = identity.and_then(|identity| {
            votes
                .iter()
                .find(|v| v.voter_id.as_deref() == Some(identity.id.as_str()))
                .map(|v| v.option_index)
        });

        Ok(PollResults {
            total_votes: counts.iter().sum(),
            counts,
            voted_option,
            poll,
        })
    }

    /// Trim, drop blank options and check limits.
    fn normalize_content(
        &self,
        question: &str,
        options: Vec<String>,
    ) -> AppResult<(String, poll::PollOptions)> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput(
                "Poll question cannot be empty".to_string(),
            ));
        }
        if question.chars().count() > self.limits.max_question_length {
            return Err(AppError::InvalidInput(format!(
                "Poll question is too long (max {} chars)",
                self.limits.max_question_length
            )));
        }

        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if options.len() < 2 {
            return Err(AppError::InvalidInput(
                "Poll must have at least 2 options".to_string(),
            ));
        }
        if options.len() > self.limits.max_options {
            return Err(AppError::InvalidInput(format!(
                "Poll cannot have more than {} options",
                self.limits.max_options
            )));
        }
        if options
            .iter()
            .any(|o| o.chars().count() > self.limits.max_option_length)
        {
            return Err(AppError::InvalidInput(format!(
                "Poll option is too long (max {} chars)",
                self.limits.max_option_length
            )));
        }

        Ok((question.to_string(), poll::PollOptions(options)))
    }
}

fn duplicate_vote(poll: &poll::Model) -> AppError {
    AppError::DuplicateVote(format!("Already voted on poll {}", poll.id))
}

/// Turn a policy decision into a service result.
fn enforce(
    decision: Decision,
    identity: Option<&Identity>,
    poll: Option<&poll::Model>,
) -> AppResult<()> {
    let Decision::Deny(reason) = decision else {
        return Ok(());
    };

    let poll_id = poll.map(|p| p.id.as_str());
    debug!(
        ?reason,
        poll_id,
        actor = identity.map(|i| i.id.as_str()),
        "Policy denied request"
    );

    Err(match reason {
        DenyReason::NotAuthenticated => AppError::Unauthenticated,
        DenyReason::NotOwner => AppError::Forbidden("Not the poll owner".to_string()),
        DenyReason::NotAdmin => AppError::Forbidden("Admin role required".to_string()),
        DenyReason::InvalidOption => AppError::InvalidInput("Invalid option index".to_string()),
        DenyReason::DuplicateVote => match poll {
            Some(poll) => duplicate_vote(poll),
            None => AppError::DuplicateVote("Already voted".to_string()),
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use doubles::FailingStore;
    use pollbox_db::MemoryPollStore;

    fn create_service(store: Arc<MemoryPollStore>, require_auth_to_vote: bool) -> PollService {
        PollService::new(store, PollPolicy::new(require_auth_to_vote))
    }

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_create_poll_sets_owner_and_keeps_order() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let user = Identity::member("user-u");

        let poll = service
            .create_poll(Some(&user), "Best color?", options(&["Red", "Blue"]))
            .await
            .unwrap();

        assert_eq!(poll.owner_id, "user-u");
        assert_eq!(poll.question, "Best color?");
        assert_eq!(poll.options.0, vec!["Red", "Blue"]);
    }

    #[tokio::test]
    async fn test_create_poll_requires_two_options() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store.clone(), false);
        let user = Identity::member("user-u");

        let result = service
            .create_poll(Some(&user), "Best color?", options(&["OnlyOne"]))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = service
            .create_poll(Some(&user), "Best color?", options(&["Red", "   ", ""]))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        assert!(store.list_polls(PollFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_poll_discards_blank_options() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let user = Identity::member("user-u");

        let poll = service
            .create_poll(Some(&user), "  Lunch?  ", options(&[" Pizza ", "", "Sushi", "  "]))
            .await
            .unwrap();

        assert_eq!(poll.question, "Lunch?");
        assert_eq!(poll.options.0, vec!["Pizza", "Sushi"]);
    }

    #[tokio::test]
    async fn test_create_poll_rejects_empty_question() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let user = Identity::member("user-u");

        let result = service
            .create_poll(Some(&user), "   ", options(&["a", "b"]))
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_poll_enforces_limits() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false).with_limits(PollLimits {
            max_options: 3,
            max_option_length: 5,
            max_question_length: 10,
        });
        let user = Identity::member("user-u");

        let too_many = service
            .create_poll(Some(&user), "Q", options(&["a", "b", "c", "d"]))
            .await;
        assert!(matches!(too_many, Err(AppError::InvalidInput(_))));

        let too_long = service
            .create_poll(Some(&user), "Q", options(&["a", "abcdef"]))
            .await;
        assert!(matches!(too_long, Err(AppError::InvalidInput(_))));

        let long_question = service
            .create_poll(Some(&user), "What is best?", options(&["a", "b"]))
            .await;
        assert!(matches!(long_question, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_poll_requires_identity() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);

        let result = service
            .create_poll(None, "Best color?", options(&["Red", "Blue"]))
            .await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_get_poll_is_idempotent() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let user = Identity::member("user-u");
        let created = service
            .create_poll(Some(&user), "Best color?", options(&["Red", "Blue"]))
            .await
            .unwrap();

        let first = service.get_poll(&created.id).await.unwrap();
        let second = service.get_poll(&created.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, created);
    }

    #[tokio::test]
    async fn test_get_poll_not_found() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);

        let result = service.get_poll("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_own_polls() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let u = Identity::member("user-u");
        let v = Identity::member("user-v");

        let first = service
            .create_poll(Some(&u), "First?", options(&["a", "b"]))
            .await
            .unwrap();
        let second = service
            .create_poll(Some(&u), "Second?", options(&["a", "b"]))
            .await
            .unwrap();
        service
            .create_poll(Some(&v), "Other?", options(&["a", "b"]))
            .await
            .unwrap();

        let own = service.list_own_polls(Some(&u)).await.unwrap();
        let ids: Vec<&str> = own.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);

        assert!(matches!(
            service.list_own_polls(None).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_list_all_polls_admin_only() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let u = Identity::member("user-u");
        let v = Identity::member("user-v");
        service
            .create_poll(Some(&u), "One?", options(&["a", "b"]))
            .await
            .unwrap();
        service
            .create_poll(Some(&v), "Two?", options(&["a", "b"]))
            .await
            .unwrap();

        let all = service
            .list_all_polls(Some(&Identity::admin("admin-a")))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        assert!(matches!(
            service.list_all_polls(Some(&u)).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.list_all_polls(None).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_update_poll_by_stranger_is_forbidden() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let u = Identity::member("user-u");
        let v = Identity::member("user-v");
        let poll = service
            .create_poll(Some(&u), "Best color?", options(&["Red", "Blue"]))
            .await
            .unwrap();

        let result = service
            .update_poll(Some(&v), &poll.id, "Hijacked?", options(&["x", "y"]))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let unchanged = service.get_poll(&poll.id).await.unwrap();
        assert_eq!(unchanged, poll);
    }

    #[tokio::test]
    async fn test_update_poll_by_owner_and_admin() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let u = Identity::member("user-u");
        let poll = service
            .create_poll(Some(&u), "Best color?", options(&["Red", "Blue"]))
            .await
            .unwrap();

        let updated = service
            .update_poll(Some(&u), &poll.id, "Best colour?", options(&["Red", "Green"]))
            .await
            .unwrap();
        assert_eq!(updated.question, "Best colour?");
        assert_eq!(updated.options.0, vec!["Red", "Green"]);
        assert_eq!(updated.owner_id, poll.owner_id);
        assert_eq!(updated.created_at, poll.created_at);

        let admin = Identity::admin("admin-a");
        let updated = service
            .update_poll(Some(&admin), &poll.id, "Moderated?", options(&["Yes", "No"]))
            .await
            .unwrap();
        assert_eq!(updated.question, "Moderated?");
        assert_eq!(updated.owner_id, "user-u");
    }

    #[tokio::test]
    async fn test_update_poll_validates_after_authorization() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let u = Identity::member("user-u");
        let poll = service
            .create_poll(Some(&u), "Best color?", options(&["Red", "Blue"]))
            .await
            .unwrap();

        let invalid = service
            .update_poll(Some(&u), &poll.id, "Best color?", options(&["Red"]))
            .await;
        assert!(matches!(invalid, Err(AppError::InvalidInput(_))));

        let anonymous = service
            .update_poll(None, &poll.id, "Best color?", options(&["Red"]))
            .await;
        assert!(matches!(anonymous, Err(AppError::Unauthenticated)));

        let missing = service
            .update_poll(Some(&u), "missing", "Q?", options(&["a", "b"]))
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_delete_then_not_found() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let u = Identity::member("user-u");
        let poll = service
            .create_poll(Some(&u), "Best color?", options(&["Red", "Blue"]))
            .await
            .unwrap();

        service
            .delete_poll(Some(&Identity::admin("admin-a")), &poll.id)
            .await
            .unwrap();

        assert!(matches!(
            service.get_poll(&poll.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_poll_by_stranger_is_forbidden() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let poll = service
            .create_poll(
                Some(&Identity::member("user-u")),
                "Best color?",
                options(&["Red", "Blue"]),
            )
            .await
            .unwrap();

        let result = service
            .delete_poll(Some(&Identity::member("user-v")), &poll.id)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(service.get_poll(&poll.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_vote_is_duplicate() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store.clone(), false);
        let u = Identity::member("user-u");
        let poll = service
            .create_poll(Some(&u), "Best color?", options(&["Red", "Blue"]))
            .await
            .unwrap();

        service.submit_vote(Some(&u), &poll.id, 0).await.unwrap();
        let second = service.submit_vote(Some(&u), &poll.id, 1).await;

        assert!(matches!(second, Err(AppError::DuplicateVote(_))));
        assert_eq!(store.count_votes(&poll.id, Some("user-u")).await, 1);
    }

    #[tokio::test]
    async fn test_vote_option_bounds() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let owner = Identity::member("owner");
        let poll = service
            .create_poll(Some(&owner), "Pick", options(&["a", "b", "c"]))
            .await
            .unwrap();

        for index in [-1, 3, 42] {
            let voter = Identity::member(format!("voter{index}"));
            let result = service.submit_vote(Some(&voter), &poll.id, index).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))), "index={index}");
        }
        for index in 0..3 {
            let voter = Identity::member(format!("voter{index}"));
            assert!(service.submit_vote(Some(&voter), &poll.id, index).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_anonymous_votes_are_not_deduplicated() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store.clone(), false);
        let poll = service
            .create_poll(
                Some(&Identity::member("owner")),
                "Best color?",
                options(&["Red", "Blue"]),
            )
            .await
            .unwrap();

        service.submit_vote(None, &poll.id, 0).await.unwrap();
        service.submit_vote(None, &poll.id, 1).await.unwrap();

        assert_eq!(store.count_votes(&poll.id, None).await, 2);
    }

    #[tokio::test]
    async fn test_anonymous_vote_rejected_when_auth_required() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, true);
        let poll = service
            .create_poll(
                Some(&Identity::member("owner")),
                "Best color?",
                options(&["Red", "Blue"]),
            )
            .await
            .unwrap();

        let result = service.submit_vote(None, &poll.id, 0).await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_vote_on_missing_poll() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);

        let result = service
            .submit_vote(Some(&Identity::member("u")), "missing", 0)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_votes_store_at_most_one() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store.clone(), false);
        let poll = service
            .create_poll(
                Some(&Identity::member("owner")),
                "Best color?",
                options(&["Red", "Blue"]),
            )
            .await
            .unwrap();

        let attempts = (0..20).map(|i| {
            let service = service.clone();
            let poll_id = poll.id.clone();
            tokio::spawn(async move {
                let voter = Identity::member("racer");
                service.submit_vote(Some(&voter), &poll_id, i % 2).await
            })
        });
        let results: Vec<_> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(AppError::DuplicateVote(_))))
        );
        assert_eq!(store.count_votes(&poll.id, Some("racer")).await, 1);
    }

    #[tokio::test]
    async fn test_store_conflict_maps_to_duplicate_vote() {
        let service = PollService::new(Arc::new(FailingStore::conflicting()), PollPolicy::default());

        let result = service
            .submit_vote(Some(&Identity::member("u")), "p1", 0)
            .await;
        assert!(matches!(result, Err(AppError::DuplicateVote(_))));
    }

    #[tokio::test]
    async fn test_store_unavailable_propagates() {
        let service = PollService::new(Arc::new(FailingStore::unavailable()), PollPolicy::default());

        let result = service
            .submit_vote(Some(&Identity::member("u")), "p1", 0)
            .await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_results_count_votes_and_own_choice() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let owner = Identity::member("owner");
        let poll = service
            .create_poll(Some(&owner), "Best color?", options(&["Red", "Blue", "Green"]))
            .await
            .unwrap();

        service.submit_vote(Some(&owner), &poll.id, 2).await.unwrap();
        service
            .submit_vote(Some(&Identity::member("v1")), &poll.id, 0)
            .await
            .unwrap();
        service.submit_vote(None, &poll.id, 2).await.unwrap();

        let results = service.get_results(Some(&owner), &poll.id).await.unwrap();
        assert_eq!(results.counts, vec![1, 0, 2]);
        assert_eq!(results.total_votes, 3);
        assert_eq!(results.voted_option, Some(2));

        let anonymous = service.get_results(None, &poll.id).await.unwrap();
        assert_eq!(anonymous.voted_option, None);
    }

    #[tokio::test]
    async fn test_results_ignore_votes_past_shrunk_options() {
        let store = Arc::new(MemoryPollStore::new());
        let service = create_service(store, false);
        let owner = Identity::member("owner");
        let poll = service
            .create_poll(Some(&owner), "Pick", options(&["a", "b", "c"]))
            .await
            .unwrap();
        service
            .submit_vote(Some(&Identity::member("v1")), &poll.id, 2)
            .await
            .unwrap();

        service
            .update_poll(Some(&owner), &poll.id, "Pick", options(&["a", "b"]))
            .await
            .unwrap();

        let results = service.get_results(None, &poll.id).await.unwrap();
        assert_eq!(results.counts, vec![0, 0]);
        assert_eq!(results.total_votes, 0);
    }

    /// Store doubles that fail vote inserts in a fixed way.
    mod doubles {
        use super::*;
        use chrono::Utc;

        pub struct FailingStore {
            insert_error: fn() -> AppError,
        }

        impl FailingStore {
            pub fn conflicting() -> Self {
                Self {
                    insert_error: || AppError::Conflict("duplicate key".to_string()),
                }
            }

            pub fn unavailable() -> Self {
                Self {
                    insert_error: || AppError::Unavailable("pool timed out".to_string()),
                }
            }

            fn poll() -> poll::Model {
                poll::Model {
                    id: "p1".to_string(),
                    owner_id: "owner".to_string(),
                    question: "Q".to_string(),
                    options: poll::PollOptions(vec!["a".to_string(), "b".to_string()]),
                    created_at: Utc::now().into(),
                }
            }
        }

        #[async_trait::async_trait]
        impl PollStore for FailingStore {
            async fn get_poll(&self, _id: &str) -> AppResult<Option<poll::Model>> {
                Ok(Some(Self::poll()))
            }

            async fn insert_poll(&self, poll: poll::Model) -> AppResult<poll::Model> {
                Ok(poll)
            }

            async fn list_polls(&self, _filter: PollFilter<'_>) -> AppResult<Vec<poll::Model>> {
                Ok(vec![])
            }

            async fn update_poll(
                &self,
                target: &poll::Model,
                _changes: PollChanges,
            ) -> AppResult<poll::Model> {
                Ok(target.clone())
            }

            async fn delete_poll(&self, _target: &poll::Model) -> AppResult<()> {
                Ok(())
            }

            async fn find_vote(
                &self,
                _poll_id: &str,
                _voter_id: &str,
            ) -> AppResult<Option<poll_vote::Model>> {
                // The fast path sees nothing, as in a lost race.
                Ok(None)
            }

            async fn insert_vote(&self, _vote: poll_vote::Model) -> AppResult<poll_vote::Model> {
                Err((self.insert_error)())
            }

            async fn votes_for_poll(&self, _poll_id: &str) -> AppResult<Vec<poll_vote::Model>> {
                Ok(vec![])
            }
        }
    }
}
