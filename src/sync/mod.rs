//! Replace-by-day synchronization of a snapshot to the remote tracker.
//!
//! The remote side keeps one daily record per `(user, date)` with account
//! rows under it and fixed-deposit rows under each account. A sync makes
//! the remote day an exact copy of the local snapshot: existing child rows
//! are dropped and the snapshot is written again, as one atomic step.

mod memory;
mod supabase;

pub use memory::{AccountRow, DailyRecordRow, FixedDepositRow, MemoryBackend};
pub use supabase::{ReplaceMode, SupabaseBackend, DEFAULT_RPC_FUNCTION};

use std::sync::Arc;

use chrono::NaiveDate;
use secrecy::SecretString;

use crate::models::{AccountEntry, DailySnapshot};

/// Failure talking to the remote backend.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Sign-in was rejected. Nothing was changed remotely.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A request failed or returned an unexpected response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

/// Sign-in for the remote backend.
#[derive(Debug)]
pub struct RemoteCredentials {
    pub email: String,
    pub password: SecretString,
}

/// An authenticated remote identity.
#[derive(Debug)]
pub struct RemoteUser {
    pub id: String,
    pub access_token: SecretString,
}

/// Remote store for daily records.
#[async_trait::async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn sign_in(&self, credentials: &RemoteCredentials) -> Result<RemoteUser, SyncError>;

    /// Make the remote `(user, date)` record hold exactly `accounts` and
    /// their FDs. Returns the number of accounts written.
    async fn replace_day(
        &self,
        user: &RemoteUser,
        date: NaiveDate,
        accounts: &[AccountEntry],
    ) -> Result<usize, SyncError>;
}

/// Pushes finished snapshots to a [`RemoteBackend`].
#[derive(Clone)]
pub struct SyncEngine {
    backend: Arc<dyn RemoteBackend>,
}

impl SyncEngine {
    pub fn new(backend: Arc<dyn RemoteBackend>) -> Self {
        Self { backend }
    }

    /// Authenticate, then replace the remote day with `snapshot`.
    pub async fn sync(
        &self,
        snapshot: &DailySnapshot,
        credentials: &RemoteCredentials,
    ) -> Result<usize, SyncError> {
        tracing::info!(email = %credentials.email, "Signing in to remote backend");
        let user = self.backend.sign_in(credentials).await?;

        tracing::info!(
            date = %snapshot.date,
            accounts = snapshot.len(),
            "Replacing remote daily record"
        );
        let count = self
            .backend
            .replace_day(&user, snapshot.date, snapshot.accounts())
            .await?;

        tracing::info!(date = %snapshot.date, accounts = count, "Remote sync complete");
        Ok(count)
    }
}
