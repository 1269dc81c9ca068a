use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    dto::RegisterRequest,
    password::{hash_password, verify_password},
    referral_code::{is_well_formed, ReferralCodeGenerator},
    repo_types::{CreatedUser, NewUser, User},
    validation::{
        check_confirm_password, check_mobile_number, check_password_strength, check_required,
        is_valid_email, normalize_email,
    },
};
use crate::{
    config::ReferralConfig,
    error::ApiError,
    store::{StoreError, UniqueField, UserStore},
};

const EMAIL_TAKEN: &str = "Email already registered";
const MOBILE_TAKEN: &str = "Mobile number already registered";
const INVALID_REFERRAL_CODE: &str = "Invalid referral code";
const USER_NOT_FOUND: &str = "User not found";

/// Validate a registration, resolve the referrer and persist the user.
///
/// Checks run in a fixed order and the first failure is returned. The user
/// row and its referral edge are written in one store call, so a failure
/// leaves nothing behind. Conflicts the store reports at insert time map to
/// the same errors as the up-front checks.
pub async fn register(
    store: &dyn UserStore,
    codes: &dyn ReferralCodeGenerator,
    policy: &ReferralConfig,
    req: RegisterRequest,
) -> Result<CreatedUser, ApiError> {
    check_required(&req)?;

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::validation("email", "Invalid email format"));
    }
    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::validation("email", EMAIL_TAKEN));
    }

    let mobile_number = req.mobile_number.trim();
    check_mobile_number(mobile_number)?;
    if policy.unique_mobile_number && store.mobile_number_taken(mobile_number).await? {
        warn!("mobile number already registered");
        return Err(ApiError::validation("mobile_number", MOBILE_TAKEN));
    }

    check_password_strength(&req.password)?;
    check_confirm_password(&req.password, req.confirm_password.as_deref())?;

    let referrer = match req.referrer() {
        Some((field, code)) => match lookup_referral_code(store, code).await? {
            Some(referrer) => Some((field, referrer)),
            None => {
                warn!(referral_code = %code, "unknown referral code");
                return Err(ApiError::validation(field, INVALID_REFERRAL_CODE));
            }
        },
        None => None,
    };
    let referrer_field = referrer.as_ref().map(|(field, _)| *field);

    let password_hash = hash_password(&req.password)?;

    let mut new_user = NewUser {
        email,
        name: req.name.trim().to_string(),
        mobile_number: mobile_number.to_string(),
        city: req.city.trim().to_string(),
        password_hash,
        referral_code: String::new(),
        referred_by: referrer.map(|(_, u)| u.id),
    };

    for attempt in 1..=policy.code_max_attempts {
        new_user.referral_code = codes.generate();
        match store.create_user(&new_user, policy.unique_mobile_number).await {
            Ok(created) => {
                info!(
                    user_id = %created.user.id,
                    email = %created.user.email,
                    referred_by = ?created.user.referred_by,
                    referral_id = ?created.referral.as_ref().map(|r| r.id),
                    "user registered"
                );
                if let Some(r) = &created.referral {
                    debug!(
                        referral_id = %r.id,
                        referrer_id = %r.referrer_id,
                        referee_id = %r.referee_id,
                        created_at = %r.created_at,
                        "referral recorded"
                    );
                }
                return Ok(created);
            }
            Err(StoreError::Conflict(UniqueField::ReferralCode)) => {
                debug!(attempt, "referral code collision, regenerating");
            }
            Err(StoreError::Conflict(UniqueField::Email)) => {
                warn!(email = %new_user.email, "email registered concurrently");
                return Err(ApiError::validation("email", EMAIL_TAKEN));
            }
            Err(StoreError::Conflict(UniqueField::MobileNumber)) => {
                warn!("mobile number registered concurrently");
                return Err(ApiError::validation("mobile_number", MOBILE_TAKEN));
            }
            Err(StoreError::MissingReferrer) => {
                let field = referrer_field.unwrap_or("referral_code");
                warn!("referrer vanished before insert");
                return Err(ApiError::validation(field, INVALID_REFERRAL_CODE));
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Internal(anyhow::anyhow!(
        "no unique referral code after {} attempts",
        policy.code_max_attempts
    )))
}

/// Check an email/password pair. Every failure looks the same to the caller.
pub async fn authenticate(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(email = %email, "login with malformed email");
        return Err(ApiError::AuthenticationFailed);
    }

    let Some(user) = store.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(ApiError::AuthenticationFailed);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::AuthenticationFailed);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(user)
}

/// Users referred by `user_id`, oldest first.
pub async fn referrals_of(store: &dyn UserStore, user_id: Uuid) -> Result<Vec<User>, ApiError> {
    if store.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::NotFound(USER_NOT_FOUND));
    }
    Ok(store.list_referees(user_id).await?)
}

pub async fn list_users(store: &dyn UserStore) -> Result<Vec<User>, ApiError> {
    Ok(store.list_users().await?)
}

/// Resolve a referral code to the user who owns it.
pub async fn verify_referral_code(store: &dyn UserStore, code: &str) -> Result<User, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ApiError::validation("referral_code", "Referral code cannot be empty"));
    }
    lookup_referral_code(store, code)
        .await?
        .ok_or_else(|| ApiError::validation("referral_code", INVALID_REFERRAL_CODE))
}

/// A code that could never have been issued is not worth a query.
async fn lookup_referral_code(store: &dyn UserStore, code: &str) -> Result<Option<User>, ApiError> {
    if !is_well_formed(code) {
        return Ok(None);
    }
    Ok(store.find_by_referral_code(code).await?)
}
