use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::AccountEntry;
use crate::normalize::is_iso_date;

use super::{RemoteBackend, RemoteCredentials, RemoteUser, SyncError};

pub const DEFAULT_RPC_FUNCTION: &str = "replace_daily_record";

/// How a day is replaced on the remote side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// One call to a database function that deletes and reinserts the day
    /// inside a transaction.
    #[default]
    Rpc,
    /// Row-by-row table calls. A failure part way through can leave the
    /// day with its accounts deleted and not reinserted.
    Tables,
}

/// Supabase (PostgREST + GoTrue) backend.
pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    service_key: SecretString,
    mode: ReplaceMode,
    rpc_function: String,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
}

#[derive(Deserialize)]
struct RowId {
    id: Value,
}

#[derive(Serialize)]
struct RpcFixedDeposit<'a> {
    principal: u64,
    maturity_date: Option<&'a str>,
}

#[derive(Serialize)]
struct RpcAccount<'a> {
    holder_name: &'a str,
    bank_name: &'a str,
    account_number: &'a str,
    balance: u64,
    fds: Vec<RpcFixedDeposit<'a>>,
}

#[derive(Serialize)]
struct RpcArgs<'a> {
    p_record_date: String,
    p_accounts: Vec<RpcAccount<'a>>,
}

/// Only ISO dates fit the remote `date` column; anything else is stored as
/// NULL.
pub(crate) fn maturity_value(date: &str) -> Option<&str> {
    if is_iso_date(date) {
        Some(date)
    } else {
        None
    }
}

impl SupabaseBackend {
    pub fn new(base_url: impl Into<String>, service_key: SecretString) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            mode: ReplaceMode::default(),
            rpc_function: DEFAULT_RPC_FUNCTION.to_string(),
        }
    }

    pub fn with_mode(mut self, mode: ReplaceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_rpc_function(mut self, function: impl Into<String>) -> Self {
        self.rpc_function = function.into();
        self
    }

    pub fn mode(&self) -> ReplaceMode {
        self.mode
    }

    fn rest(&self, method: Method, path: &str, user: &RemoteUser) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, path))
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(user.access_token.expose_secret())
    }

    async fn check(response: Response, what: &str) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::Transport(format!("{what} failed ({status}): {body}")))
    }

    async fn rows(response: Response, what: &str) -> Result<Vec<RowId>, SyncError> {
        let response = Self::check(response, what).await?;
        response
            .json::<Vec<RowId>>()
            .await
            .map_err(|e| SyncError::Transport(format!("{what} returned unexpected body: {e}")))
    }

    async fn replace_via_rpc(
        &self,
        user: &RemoteUser,
        date: NaiveDate,
        accounts: &[AccountEntry],
    ) -> Result<usize, SyncError> {
        let args = RpcArgs {
            p_record_date: date.to_string(),
            p_accounts: accounts
                .iter()
                .map(|entry| RpcAccount {
                    holder_name: &entry.holder_name,
                    bank_name: &entry.bank_name,
                    account_number: &entry.account_number,
                    balance: entry.balance,
                    fds: entry
                        .fds
                        .iter()
                        .map(|fd| RpcFixedDeposit {
                            principal: fd.principal,
                            maturity_date: maturity_value(&fd.maturity_date),
                        })
                        .collect(),
                })
                .collect(),
        };

        let path = format!("rpc/{}", self.rpc_function);
        let response = self.rest(Method::POST, &path, user).json(&args).send().await?;
        let response = Self::check(response, &path).await?;

        // The function returns the inserted count; fall back to what was sent
        // when it returns nothing useful.
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok(body
            .as_u64()
            .map(|count| count as usize)
            .unwrap_or(accounts.len()))
    }

    async fn replace_via_tables(
        &self,
        user: &RemoteUser,
        date: NaiveDate,
        accounts: &[AccountEntry],
    ) -> Result<usize, SyncError> {
        let record_date = date.to_string();

        let existing = self
            .rest(Method::GET, "daily_records", user)
            .query(&[
                ("select", "id".to_string()),
                ("user_id", format!("eq.{}", user.id)),
                ("record_date", format!("eq.{record_date}")),
            ])
            .send()
            .await?;
        let existing = Self::rows(existing, "select daily_records").await?;

        let record_id = match existing.into_iter().next() {
            Some(row) => {
                tracing::debug!(record = %row.id, "Clearing existing daily record");
                let response = self
                    .rest(Method::DELETE, "accounts", user)
                    .query(&[("daily_record_id", format!("eq.{}", filter_value(&row.id)))])
                    .send()
                    .await?;
                Self::check(response, "delete accounts").await?;
                row.id
            }
            None => {
                let response = self
                    .rest(Method::POST, "daily_records", user)
                    .header("Prefer", "return=representation")
                    .json(&serde_json::json!({
                        "user_id": user.id,
                        "record_date": record_date,
                    }))
                    .send()
                    .await?;
                first_id(Self::rows(response, "insert daily_records").await?)?
            }
        };

        for entry in accounts {
            let response = self
                .rest(Method::POST, "accounts", user)
                .header("Prefer", "return=representation")
                .json(&serde_json::json!({
                    "daily_record_id": record_id,
                    "user_id": user.id,
                    "holder_name": entry.holder_name,
                    "bank_name": entry.bank_name,
                    "account_number": entry.account_number,
                    "balance": entry.balance,
                }))
                .send()
                .await?;
            let account_id = first_id(Self::rows(response, "insert accounts").await?)?;

            if entry.fds.is_empty() {
                continue;
            }
            let fds: Vec<Value> = entry
                .fds
                .iter()
                .map(|fd| {
                    serde_json::json!({
                        "account_id": account_id,
                        "user_id": user.id,
                        "principal": fd.principal,
                        "maturity_date": maturity_value(&fd.maturity_date),
                    })
                })
                .collect();
            let response = self
                .rest(Method::POST, "fixed_deposits", user)
                .json(&fds)
                .send()
                .await?;
            Self::check(response, "insert fixed_deposits").await?;
        }

        Ok(accounts.len())
    }
}

fn first_id(rows: Vec<RowId>) -> Result<Value, SyncError> {
    rows.into_iter()
        .next()
        .map(|row| row.id)
        .ok_or_else(|| SyncError::Transport("insert returned no rows".to_string()))
}

/// PostgREST filter text for a row id (numeric or uuid).
fn filter_value(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait::async_trait]
impl RemoteBackend for SupabaseBackend {
    async fn sign_in(&self, credentials: &RemoteCredentials) -> Result<RemoteUser, SyncError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", self.service_key.expose_secret())
            .json(&PasswordGrant {
                email: &credentials.email,
                password: credentials.password.expose_secret(),
            })
            .send()
            .await?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST
                | StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Authentication(format!("{status}: {body}")));
        }
        let response = Self::check(response, "sign in").await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Transport(format!("sign in returned unexpected body: {e}")))?;

        Ok(RemoteUser {
            id: token.user.id,
            access_token: SecretString::from(token.access_token),
        })
    }

    async fn replace_day(
        &self,
        user: &RemoteUser,
        date: NaiveDate,
        accounts: &[AccountEntry],
    ) -> Result<usize, SyncError> {
        match self.mode {
            ReplaceMode::Rpc => self.replace_via_rpc(user, date, accounts).await,
            ReplaceMode::Tables => self.replace_via_tables(user, date, accounts).await,
        }
    }
}
