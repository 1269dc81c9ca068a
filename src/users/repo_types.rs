use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,              // lower-cased, unique
    pub name: String,
    pub mobile_number: String,
    pub city: String,
    pub password_hash: String,      // Argon2 PHC string, never serialized
    pub referral_code: String,      // 8 chars, [A-Z0-9]
    pub referred_by: Option<Uuid>,  // cleared if the referrer is removed
    pub created_at: OffsetDateTime,
}

/// Referrer -> referee edge, written alongside the referee.
#[derive(Debug, Clone, FromRow)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referee_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Everything the store needs to insert a user. Already validated.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub mobile_number: String,
    pub city: String,
    pub password_hash: String,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreatedUser {
    pub user: User,
    pub referral: Option<Referral>,
}
