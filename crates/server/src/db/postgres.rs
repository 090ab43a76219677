//! `PostgreSQL` implementation of [`AccountStore`].
//!
//! Statements are checked at runtime (`sqlx::query_as`) so the crate builds
//! without a live database or an offline query cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use tourvisto_core::{
    AccountId, ElevationRequest, ElevationRequestId, Email, Profile, ProfileId, ProfileStatus,
    RequestStatus,
};

use super::{AccountStore, ProfileWrite, RepositoryError};

const PROFILE_COLUMNS: &str =
    "id, account_id, email, name, image_url, joined_at, status, request_status";

const REQUEST_COLUMNS: &str = "id, account_id, email, name, req_status, created_at, decided_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i32,
    account_id: String,
    email: String,
    name: String,
    image_url: Option<String>,
    joined_at: DateTime<Utc>,
    status: ProfileStatus,
    request_status: RequestStatus,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(r: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProfileId::new(r.id),
            account_id: parse_account_id(&r.account_id)?,
            email: parse_email(&r.email)?,
            name: r.name,
            image_url: r.image_url,
            joined_at: r.joined_at,
            status: r.status,
            request_status: r.request_status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ElevationRequestRow {
    id: i32,
    account_id: String,
    email: String,
    name: String,
    req_status: RequestStatus,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<ElevationRequestRow> for ElevationRequest {
    type Error = RepositoryError;

    fn try_from(r: ElevationRequestRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ElevationRequestId::new(r.id),
            account_id: parse_account_id(&r.account_id)?,
            email: parse_email(&r.email)?,
            name: r.name,
            req_status: r.req_status,
            created_at: r.created_at,
            decided_at: r.decided_at,
        })
    }
}

fn parse_account_id(raw: &str) -> Result<AccountId, RepositoryError> {
    AccountId::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid account id in database: {e}")))
}

fn parse_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

/// Account store backed by the `profiles` and `elevation_requests` tables.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Turn an empty `UPDATE … WHERE req_status = 'pending'` into the right error.
    async fn explain_missed_transition(
        &self,
        account_id: &AccountId,
    ) -> Result<RepositoryError, RepositoryError> {
        let existing = self.get_elevation_request(account_id).await?;
        Ok(match existing {
            None => RepositoryError::NotFound,
            Some(request) => RepositoryError::Conflict(format!(
                "elevation request already {}",
                request.req_status
            )),
        })
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_profile(&self, account_id: &AccountId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE account_id = $1"
        ))
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn upsert_profile(&self, write: &ProfileWrite) -> Result<Profile, RepositoryError> {
        // Role merge evaluated against the row as it is at write time; keep in
        // step with RoleResolution::for_sign_in.
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            r"
            INSERT INTO profiles (account_id, email, name, image_url, status, request_status)
            VALUES (
                $1, $2, $3, $4, 'user',
                CASE WHEN $5::text = 'admin' THEN 'pending'::request_status
                     ELSE 'approved'::request_status END
            )
            ON CONFLICT (account_id) DO UPDATE SET
                email = EXCLUDED.email,
                name = COALESCE(NULLIF(EXCLUDED.name, ''), profiles.name),
                image_url = COALESCE(EXCLUDED.image_url, profiles.image_url),
                status = CASE WHEN profiles.status = 'admin' THEN 'admin'::profile_status
                              ELSE 'user'::profile_status END,
                request_status = CASE
                    WHEN profiles.status = 'admin' THEN 'approved'::request_status
                    WHEN $5::text = 'admin' THEN 'pending'::request_status
                    ELSE profiles.request_status END,
                updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "
        ))
        .bind(write.account_id.as_str())
        .bind(write.email.as_str())
        .bind(&write.name)
        .bind(write.image_url.as_deref())
        .bind(write.desired_role.as_str())
        .fetch_one(&self.pool)
        .await?;

        Profile::try_from(row)
    }

    async fn get_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, ElevationRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM elevation_requests WHERE account_id = $1"
        ))
        .bind(account_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ElevationRequest::try_from).transpose()
    }

    async fn insert_elevation_request_if_absent(
        &self,
        account_id: &AccountId,
        email: &Email,
        name: &str,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, ElevationRequestRow>(&format!(
            r"
            INSERT INTO elevation_requests (account_id, email, name, req_status)
            VALUES ($1, $2, $3, 'pending')
            ON CONFLICT (account_id) DO NOTHING
            RETURNING {REQUEST_COLUMNS}
            "
        ))
        .bind(account_id.as_str())
        .bind(email.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("no profile for account".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.map(ElevationRequest::try_from).transpose()
    }

    async fn approve_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ElevationRequestRow>(&format!(
            r"
            UPDATE elevation_requests
            SET req_status = 'approved', decided_at = now()
            WHERE account_id = $1 AND req_status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "
        ))
        .bind(account_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(self.explain_missed_transition(account_id).await?);
        };

        sqlx::query(
            r"
            UPDATE profiles
            SET status = 'admin', request_status = 'approved', updated_at = now()
            WHERE account_id = $1
            ",
        )
        .bind(account_id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        ElevationRequest::try_from(row)
    }

    async fn reject_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ElevationRequestRow>(&format!(
            r"
            UPDATE elevation_requests
            SET req_status = 'rejected', decided_at = now()
            WHERE account_id = $1 AND req_status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "
        ))
        .bind(account_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(self.explain_missed_transition(account_id).await?);
        };

        sqlx::query(
            r"
            UPDATE profiles
            SET request_status = 'rejected', updated_at = now()
            WHERE account_id = $1 AND status = 'user'
            ",
        )
        .bind(account_id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        ElevationRequest::try_from(row)
    }

    async fn list_elevation_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ElevationRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, ElevationRequestRow>(&format!(
            r"
            SELECT {REQUEST_COLUMNS}
            FROM elevation_requests
            WHERE $1::request_status IS NULL OR req_status = $1
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ElevationRequest::try_from).collect()
    }

    async fn list_profiles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            r"
            SELECT {PROFILE_COLUMNS}
            FROM profiles
            ORDER BY joined_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;

        let profiles = rows
            .into_iter()
            .map(Profile::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((profiles, total))
    }
}
