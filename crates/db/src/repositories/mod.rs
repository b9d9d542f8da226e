//! Repositories over the sea-orm entities.

mod poll;

pub use poll::{PollRepository, PollVoteRepository};

use pollbox_common::AppError;
use sea_orm::{DbErr, RuntimeErr, SqlErr, sqlx};

/// Classify a driver error into the storage error kinds the services understand.
pub(crate) fn map_db_err(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => return AppError::Conflict(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => return AppError::NotFound(msg),
        _ => {}
    }

    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => AppError::Unavailable(err.to_string()),
        DbErr::Query(ref runtime) | DbErr::Exec(ref runtime) if is_transient(runtime) => {
            AppError::Unavailable(err.to_string())
        }
        DbErr::RecordNotFound(msg) => AppError::NotFound(msg),
        other => AppError::Database(other.to_string()),
    }
}

/// Driver failures that say nothing about the statement itself: the
/// connection dropped or the pool could not serve it.
fn is_transient(err: &RuntimeErr) -> bool {
    matches!(
        err,
        RuntimeErr::SqlxError(
            sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed
        )
    )
}
