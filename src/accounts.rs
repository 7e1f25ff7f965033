//! Accounts, roles and sessions
//!
//! A flat allow-list, not a security boundary: credentials are compared as
//! stored. New `User` registrations wait for administrator approval; the
//! guest identity never touches the store.

use crate::dataset::Dataset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identity used by guest logins
pub const GUEST_ID: &str = "Guest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "User",
            Role::Admin => "Admin",
        })
    }
}

impl FromStr for Role {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(AccountError::UnknownRole(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
}

/// A stored account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub credential: String,
    pub role: Role,
    pub status: Status,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("User ID and password must not be empty")]
    EmptyField,

    #[error("User ID '{0}' is already taken")]
    DuplicateId(String),

    #[error("Wrong user ID or password")]
    InvalidCredentials,

    #[error("Account '{0}' is awaiting administrator approval")]
    PendingApproval(String),

    #[error("Account '{0}' does not exist")]
    UnknownAccount(String),

    #[error("Administrators cannot delete their own account")]
    SelfDeletion,

    #[error("This action requires the Admin role")]
    NotAuthorized,

    #[error("Unknown role '{0}' (expected User or Admin)")]
    UnknownRole(String),
}

/// Key-value capability holding accounts
pub trait AccountStore {
    fn account(&self, id: &str) -> Option<Account>;

    /// Insert or replace an account
    fn put_account(&mut self, account: Account);

    /// Remove an account, returning whether it existed
    fn remove_account(&mut self, id: &str) -> bool;

    /// All accounts, ordered by id
    fn accounts(&self) -> Vec<Account>;
}

/// Register a new account. Users start pending, admins approved.
pub fn register(
    store: &mut dyn AccountStore,
    id: &str,
    credential: &str,
    role: Role,
) -> Result<Account, AccountError> {
    if id.trim().is_empty() || credential.is_empty() {
        return Err(AccountError::EmptyField);
    }
    if store.account(id).is_some() {
        return Err(AccountError::DuplicateId(id.to_string()));
    }
    let status = match role {
        Role::User => Status::Pending,
        Role::Admin => Status::Approved,
    };
    let account = Account {
        id: id.to_string(),
        credential: credential.to_string(),
        role,
        status,
    };
    store.put_account(account.clone());
    tracing::info!(id, %role, "account registered");
    Ok(account)
}

/// Authenticated (or guest) session with its working dataset
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    pub dataset: Option<Dataset>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_guest(&self) -> bool {
        self.user_id == GUEST_ID
    }

    /// Replace the working dataset wholesale
    pub fn load_dataset(&mut self, dataset: Dataset) {
        self.dataset = Some(dataset);
    }

    /// End the session; the working dataset is discarded
    pub fn logout(mut self) {
        self.dataset = None;
        tracing::debug!(user = %self.user_id, "logged out");
    }

    fn require_admin(&self) -> Result<(), AccountError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AccountError::NotAuthorized)
        }
    }

    /// Approve a pending account
    pub fn approve(&self, store: &mut dyn AccountStore, id: &str) -> Result<(), AccountError> {
        self.require_admin()?;
        let mut account = store
            .account(id)
            .ok_or_else(|| AccountError::UnknownAccount(id.to_string()))?;
        account.status = Status::Approved;
        store.put_account(account);
        tracing::info!(id, by = %self.user_id, "account approved");
        Ok(())
    }

    /// Change an account's role
    pub fn set_role(
        &self,
        store: &mut dyn AccountStore,
        id: &str,
        role: Role,
    ) -> Result<(), AccountError> {
        self.require_admin()?;
        let mut account = store
            .account(id)
            .ok_or_else(|| AccountError::UnknownAccount(id.to_string()))?;
        account.role = role;
        store.put_account(account);
        tracing::info!(id, %role, by = %self.user_id, "role changed");
        Ok(())
    }

    /// Delete an account; an admin cannot delete themself
    pub fn delete(&self, store: &mut dyn AccountStore, id: &str) -> Result<(), AccountError> {
        self.require_admin()?;
        if id == self.user_id {
            return Err(AccountError::SelfDeletion);
        }
        if !store.remove_account(id) {
            return Err(AccountError::UnknownAccount(id.to_string()));
        }
        tracing::info!(id, by = %self.user_id, "account deleted");
        Ok(())
    }

    /// Accounts awaiting approval
    pub fn pending(&self, store: &dyn AccountStore) -> Result<Vec<Account>, AccountError> {
        self.require_admin()?;
        Ok(store
            .accounts()
            .into_iter()
            .filter(|a| a.status == Status::Pending)
            .collect())
    }
}

/// Log in with stored credentials; only approved accounts succeed
pub fn login(
    store: &dyn AccountStore,
    id: &str,
    credential: &str,
) -> Result<Session, AccountError> {
    let account = store
        .account(id)
        .filter(|a| a.credential == credential)
        .ok_or(AccountError::InvalidCredentials)?;

    match account.status {
        Status::Approved => Ok(Session {
            user_id: account.id,
            role: account.role,
            dataset: None,
        }),
        Status::Pending => Err(AccountError::PendingApproval(account.id)),
    }
}

/// Guest login: always succeeds with the User role
pub fn login_guest() -> Session {
    Session {
        user_id: GUEST_ID.to_string(),
        role: Role::User,
        dataset: None,
    }
}
