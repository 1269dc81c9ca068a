use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::users::repo_types::{CreatedUser, NewUser, User};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgUserStore;

/// Columns guarded by a uniqueness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    ReferralCode,
    MobileNumber,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniqueField::Email => "email",
            UniqueField::ReferralCode => "referral_code",
            UniqueField::MobileNumber => "mobile_number",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    Conflict(UniqueField),
    #[error("referrer does not exist")]
    MissingReferrer,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistent identity store. Users are only ever inserted, never updated.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users in insertion order.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, StoreError>;

    async fn mobile_number_taken(&self, mobile_number: &str) -> Result<bool, StoreError>;

    /// Insert the user and, when `referred_by` is set, its referral edge as
    /// one unit. Either both rows become visible or neither does.
    async fn create_user(
        &self,
        new_user: &NewUser,
        unique_mobile_number: bool,
    ) -> Result<CreatedUser, StoreError>;

    /// Users whose `referred_by` is `referrer_id`, in insertion order.
    async fn list_referees(&self, referrer_id: Uuid) -> Result<Vec<User>, StoreError>;
}
