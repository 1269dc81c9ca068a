use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{StoreError, UniqueField, UserStore};
use crate::users::repo_types::{CreatedUser, NewUser, Referral, User};

const EMAIL_KEY: &str = "users_email_key";
const REFERRAL_CODE_KEY: &str = "users_referral_code_key";
const MOBILE_TAKEN_SQL: &str = "SELECT EXISTS (SELECT 1 FROM users WHERE mobile_number = $1)";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, mobile_number, city, password_hash,
                   referral_code, referred_by, created_at
              FROM users
             ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, mobile_number, city, password_hash,
                   referral_code, referred_by, created_at
              FROM users
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, mobile_number, city, password_hash,
                   referral_code, referred_by, created_at
              FROM users
             WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, mobile_number, city, password_hash,
                   referral_code, referred_by, created_at
              FROM users
             WHERE referral_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await
        .context("find user by referral code")?;
        Ok(user)
    }

    async fn mobile_number_taken(&self, mobile_number: &str) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(MOBILE_TAKEN_SQL)
            .bind(mobile_number)
            .fetch_one(&self.db)
            .await
            .context("check mobile number")?;
        Ok(taken)
    }

    async fn create_user(
        &self,
        new_user: &NewUser,
        unique_mobile_number: bool,
    ) -> Result<CreatedUser, StoreError> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        if unique_mobile_number {
            claim_mobile_number(&mut tx, &new_user.mobile_number).await?;
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, mobile_number, city, password_hash,
                               referral_code, referred_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, name, mobile_number, city, password_hash,
                      referral_code, referred_by, created_at
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.mobile_number)
        .bind(&new_user.city)
        .bind(&new_user.password_hash)
        .bind(&new_user.referral_code)
        .bind(new_user.referred_by) // Option<Uuid> → NULL allowed
        .fetch_one(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        let referral = match user.referred_by {
            Some(referrer_id) => Some(
                sqlx::query_as::<_, Referral>(
                    r#"
                    INSERT INTO referrals (referrer_id, referee_id)
                    VALUES ($1, $2)
                    RETURNING id, referrer_id, referee_id, created_at
                    "#,
                )
                .bind(referrer_id)
                .bind(user.id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_insert_error)?,
            ),
            None => None,
        };

        tx.commit().await.context("commit tx")?;
        debug!(user_id = %user.id, "user row committed");

        Ok(CreatedUser { user, referral })
    }

    async fn list_referees(&self, referrer_id: Uuid) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, mobile_number, city, password_hash,
                   referral_code, referred_by, created_at
              FROM users
             WHERE referred_by = $1
             ORDER BY seq ASC, created_at ASC
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.db)
        .await
        .context("list referees")?;
        Ok(users)
    }
}

/// Serializes registrations on the same mobile number for the rest of the
/// transaction, then checks it is still free.
async fn claim_mobile_number(
    tx: &mut Transaction<'_, Postgres>,
    mobile_number: &str,
) -> Result<(), StoreError> {
    sqlx::query(r#"SELECT pg_advisory_xact_lock(hashtext($1))"#)
        .bind(mobile_number)
        .execute(&mut **tx)
        .await
        .context("lock mobile number")?;

    let taken = sqlx::query_scalar::<_, bool>(MOBILE_TAKEN_SQL)
        .bind(mobile_number)
        .fetch_one(&mut **tx)
        .await
        .context("check mobile number")?;

    if taken {
        return Err(StoreError::Conflict(UniqueField::MobileNumber));
    }
    Ok(())
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(EMAIL_KEY) => return StoreError::Conflict(UniqueField::Email),
                Some(REFERRAL_CODE_KEY) => {
                    return StoreError::Conflict(UniqueField::ReferralCode)
                }
                _ => {}
            }
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::MissingReferrer;
        }
    }
    StoreError::Backend(anyhow::Error::new(e).context("insert user"))
}

#[cfg(test)]
mod tests {
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("constraint violated")]
    struct ConstraintError {
        foreign_key: bool,
        constraint: &'static str,
    }

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.constraint)
        }

        fn kind(&self) -> ErrorKind {
            if self.foreign_key {
                ErrorKind::ForeignKeyViolation
            } else {
                ErrorKind::UniqueViolation
            }
        }
    }

    fn unique(constraint: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ConstraintError {
            foreign_key: false,
            constraint,
        }))
    }

    #[test]
    fn unique_violations_map_by_constraint_name() {
        let err = map_insert_error(unique(EMAIL_KEY));
        assert!(matches!(err, StoreError::Conflict(UniqueField::Email)));

        let err = map_insert_error(unique(REFERRAL_CODE_KEY));
        assert!(matches!(err, StoreError::Conflict(UniqueField::ReferralCode)));

        let err = map_insert_error(unique("referrals_referee_key"));
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn foreign_key_violation_is_a_missing_referrer() {
        let err = map_insert_error(sqlx::Error::Database(Box::new(ConstraintError {
            foreign_key: true,
            constraint: "users_referred_by_fkey",
        })));
        assert!(matches!(err, StoreError::MissingReferrer));
    }

    #[test]
    fn non_database_errors_stay_backend_errors() {
        let err = map_insert_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Backend(_)));
        assert!(err.to_string().contains("insert user"));
    }
}
