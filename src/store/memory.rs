use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{StoreError, UniqueField, UserStore};
use crate::users::repo_types::{CreatedUser, NewUser, Referral, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    referrals: Vec<Referral>,
    // Deleted rows a stale referral-code read can still return.
    forgotten: Vec<User>,
}

/// In-process store with the same uniqueness and atomicity rules as the
/// Postgres schema.
#[derive(Default)]
pub struct MemoryUserStore {
    tables: Mutex<Tables>,
    // Email and mobile lookups miss, so only the insert-time checks catch
    // duplicates. Mimics a concurrent registration winning the race.
    blind_lookups: bool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blind_lookups() -> Self {
        Self {
            blind_lookups: true,
            ..Self::default()
        }
    }

    pub fn referrals(&self) -> Vec<Referral> {
        self.tables.lock().expect("store lock").referrals.clone()
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().expect("store lock").users.len()
    }

    /// Delete a user and its referral edges. Referral-code lookups keep
    /// finding the old row, like a read that raced the delete.
    pub fn forget_user(&self, id: Uuid) {
        let mut tables = self.tables.lock().expect("store lock");
        if let Some(pos) = tables.users.iter().position(|u| u.id == id) {
            let user = tables.users.remove(pos);
            tables.forgotten.push(user);
        }
        tables
            .referrals
            .retain(|r| r.referrer_id != id && r.referee_id != id);
        for u in tables.users.iter_mut() {
            if u.referred_by == Some(id) {
                u.referred_by = None;
            }
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.lock().expect("store lock").users.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().expect("store lock");
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        if self.blind_lookups {
            return Ok(None);
        }
        let tables = self.tables.lock().expect("store lock");
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().expect("store lock");
        Ok(tables
            .users
            .iter()
            .chain(tables.forgotten.iter())
            .find(|u| u.referral_code == code)
            .cloned())
    }

    async fn mobile_number_taken(&self, mobile_number: &str) -> Result<bool, StoreError> {
        if self.blind_lookups {
            return Ok(false);
        }
        let tables = self.tables.lock().expect("store lock");
        Ok(tables.users.iter().any(|u| u.mobile_number == mobile_number))
    }

    async fn create_user(
        &self,
        new_user: &NewUser,
        unique_mobile_number: bool,
    ) -> Result<CreatedUser, StoreError> {
        let mut tables = self.tables.lock().expect("store lock");

        if unique_mobile_number
            && tables
                .users
                .iter()
                .any(|u| u.mobile_number == new_user.mobile_number)
        {
            return Err(StoreError::Conflict(UniqueField::MobileNumber));
        }
        if tables.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict(UniqueField::Email));
        }
        if tables
            .users
            .iter()
            .any(|u| u.referral_code == new_user.referral_code)
        {
            return Err(StoreError::Conflict(UniqueField::ReferralCode));
        }
        if let Some(referrer_id) = new_user.referred_by {
            if !tables.users.iter().any(|u| u.id == referrer_id) {
                return Err(StoreError::MissingReferrer);
            }
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            mobile_number: new_user.mobile_number.clone(),
            city: new_user.city.clone(),
            password_hash: new_user.password_hash.clone(),
            referral_code: new_user.referral_code.clone(),
            referred_by: new_user.referred_by,
            created_at: now,
        };
        let referral = new_user.referred_by.map(|referrer_id| Referral {
            id: Uuid::new_v4(),
            referrer_id,
            referee_id: user.id,
            created_at: now,
        });

        tables.users.push(user.clone());
        if let Some(r) = &referral {
            tables.referrals.push(r.clone());
        }

        Ok(CreatedUser { user, referral })
    }

    async fn list_referees(&self, referrer_id: Uuid) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.lock().expect("store lock");
        Ok(tables
            .users
            .iter()
            .filter(|u| u.referred_by == Some(referrer_id))
            .cloned()
            .collect())
    }
}
