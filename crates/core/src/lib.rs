//! Core business logic for pollbox.
//!
//! - [`identity`]: the caller identity handed in by the transport layer
//! - [`policy`]: pure authorization and voting-integrity decisions
//! - [`services`]: orchestration of policy decisions with storage calls

pub mod identity;
pub mod policy;
pub mod services;

pub use identity::{Identity, Role};
pub use policy::{Decision, DenyReason, PollPolicy};
pub use services::*;
