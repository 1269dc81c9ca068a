use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::User;

/// Request body for user registration.
///
/// Missing fields deserialize as empty so they fail field validation
/// instead of the JSON extractor.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
    /// Code of the user who referred the registrant.
    #[serde(default)]
    pub referral_code: Option<String>,
    /// Alternate name for `referral_code`.
    #[serde(default)]
    pub referrer_code: Option<String>,
}

impl RegisterRequest {
    /// The submitted referrer code, with the field name the client used.
    pub fn referrer(&self) -> Option<(&'static str, &str)> {
        non_blank(&self.referrer_code)
            .map(|code| ("referrer_code", code))
            .or_else(|| non_blank(&self.referral_code).map(|code| ("referral_code", code)))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub referral_code: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
}

/// Public view of a user; the password hash is never part of it.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub mobile_number: String,
    pub city: String,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            mobile_number: u.mobile_number,
            city: u.city,
            referral_code: u.referral_code,
            referred_by: u.referred_by,
            created_at: u.created_at,
        }
    }
}

/// One entry of a referrer's referral list.
#[derive(Debug, Serialize)]
pub struct RefereeView {
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for RefereeView {
    fn from(u: User) -> Self {
        Self {
            name: u.name,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyReferralRequest {
    #[serde(default)]
    pub referral_code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyReferralResponse {
    pub referral_code: String,
    pub valid: bool,
}
