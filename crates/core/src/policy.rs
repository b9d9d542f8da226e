//! Authorization and voting-integrity policy.
//!
//! Every check is a pure function of its inputs: no storage access, no
//! ambient "current user". Callers fetch the poll (and the caller's existing
//! vote, when voting) and hand them in; the policy only answers
//! [`Decision::Allow`] or [`Decision::Deny`] with a reason.

use pollbox_common::config::PollsConfig;
use pollbox_db::entities::{poll, poll_vote};

use crate::identity::{Identity, Role};

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The action needs an identity and none was supplied.
    NotAuthenticated,
    /// The caller neither owns the poll nor is an admin.
    NotOwner,
    /// The action is reserved for admins.
    NotAdmin,
    /// The option index does not refer to an option of the poll.
    InvalidOption,
    /// The caller already voted on the poll.
    DuplicateVote,
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action must not proceed.
    Deny(DenyReason),
}

impl Decision {
    /// Whether the decision allows the action.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Poll authorization rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollPolicy {
    /// Reject votes from callers without an identity.
    pub require_auth_to_vote: bool,
}

impl PollPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(require_auth_to_vote: bool) -> Self {
        Self {
            require_auth_to_vote,
        }
    }

    /// Build the policy from the `[polls]` configuration section.
    #[must_use]
    pub const fn from_config(config: &PollsConfig) -> Self {
        Self::new(config.require_auth_to_vote)
    }

    /// Polls and their results are public.
    pub const fn can_read(&self, _identity: Option<&Identity>, _poll: &poll::Model) -> Decision {
        Decision::Allow
    }

    /// Owner or admin may change a poll's question and options.
    pub fn can_write(&self, identity: Option<&Identity>, poll: &poll::Model) -> Decision {
        let Some(identity) = identity else {
            return Decision::Deny(DenyReason::NotAuthenticated);
        };

        let is_owner = identity.id == poll.owner_id;
        let is_admin = identity.role == Role::Admin;

        if is_owner | is_admin {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::NotOwner)
        }
    }

    /// Same rule as [`PollPolicy::can_write`].
    pub fn can_delete(&self, identity: Option<&Identity>, poll: &poll::Model) -> Decision {
        self.can_write(identity, poll)
    }

    /// Whether a vote for `option_index` may be recorded.
    ///
    /// `existing_vote` is the caller's current vote on the poll, looked up by
    /// the caller when an identity is present. Anonymous votes are never
    /// deduplicated.
    pub fn can_vote(
        &self,
        identity: Option<&Identity>,
        poll: &poll::Model,
        option_index: i32,
        existing_vote: Option<&poll_vote::Model>,
    ) -> Decision {
        if identity.is_none() && self.require_auth_to_vote {
            return Decision::Deny(DenyReason::NotAuthenticated);
        }

        if !poll.options.contains_index(option_index) {
            return Decision::Deny(DenyReason::InvalidOption);
        }

        if identity.is_some() && existing_vote.is_some() {
            return Decision::Deny(DenyReason::DuplicateVote);
        }

        Decision::Allow
    }

    /// Listing every poll is reserved for admins.
    pub fn can_list_all(&self, identity: Option<&Identity>) -> Decision {
        match identity {
            None => Decision::Deny(DenyReason::NotAuthenticated),
            Some(identity) if identity.is_admin() => Decision::Allow,
            Some(_) => Decision::Deny(DenyReason::NotAdmin),
        }
    }
}
