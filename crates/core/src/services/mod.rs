//! Business logic services.

pub mod poll;

pub use poll::{PollLimits, PollResults, PollService};
