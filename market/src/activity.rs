//! Best-effort user activity logging.
//!
//! Activity entries are diagnostics, not records: a failure to log must
//! never abort the operation it accompanies. Callers go through
//! [`record_best_effort`], which downgrades any sink error to a warning.

use chrono::{DateTime, Utc};
use cineswap_core::types::UserId;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Kinds of user activity worth an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAction {
    /// The user signed in.
    Login,
    /// The user signed out.
    Logout,
    /// The user completed a purchase.
    Purchase,
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Logout => write!(f, "logout"),
            Self::Purchase => write!(f, "purchase"),
        }
    }
}

/// An activity entry as handed to the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityEntry {
    /// The user performing the action.
    pub user_id: UserId,
    /// What they did.
    pub action: UserAction,
    /// When they did it.
    pub timestamp: DateTime<Utc>,
}

/// Sink for activity entries.
pub trait ActivityLog: Send + Sync {
    /// Record one entry.
    ///
    /// # Errors
    ///
    /// Returns a description of the sink failure; callers treat this as
    /// non-fatal.
    fn record(
        &self,
        entry: ActivityEntry,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>>;
}

/// Activity sink that emits structured tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(
        &self,
        entry: ActivityEntry,
    ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(
                user_id = %entry.user_id,
                action = %entry.action,
                timestamp = %entry.timestamp,
                "user activity"
            );
            Ok(())
        })
    }
}

/// Record an entry, swallowing sink failures with a warning.
pub async fn record_best_effort(log: &dyn ActivityLog, entry: ActivityEntry) {
    if let Err(reason) = log.record(entry).await {
        tracing::warn!(
            user_id = %entry.user_id,
            action = %entry.action,
            reason,
            "activity logging failed; continuing"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct FailingLog;

    impl ActivityLog for FailingLog {
        fn record(
            &self,
            _entry: ActivityEntry,
        ) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send + '_>> {
            Box::pin(async { Err("sink unavailable".to_string()) })
        }
    }

    #[tokio::test]
    async fn sink_failure_does_not_propagate() {
        let entry = ActivityEntry {
            user_id: UserId::new(),
            action: UserAction::Purchase,
            timestamp: Utc::now(),
        };
        // Must not panic or return an error to the caller.
        record_best_effort(&FailingLog, entry).await;
    }

    #[tokio::test]
    async fn tracing_sink_accepts_entries() {
        let entry = ActivityEntry {
            user_id: UserId::new(),
            action: UserAction::Login,
            timestamp: Utc::now(),
        };
        TracingActivityLog.record(entry).await.unwrap();
    }
}
