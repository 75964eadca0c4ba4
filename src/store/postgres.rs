//! PostgreSQL mirror store implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use crate::domain::{Fingerprint, InvoiceStatus, MirrorRecord, TxRef};

use super::{RecordStore, StoreError, UserRecord, UserStore};

/// PostgreSQL-backed invoice mirror.
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create from connection string.
    pub async fn from_url(url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct InvoiceRow {
    id: Uuid,
    owner: String,
    fingerprint: String,
    status: String,
    tx_ref: String,
    created_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_record(self) -> Result<MirrorRecord, StoreError> {
        let fingerprint = Fingerprint::from_hex(&self.fingerprint)
            .ok_or_else(|| StoreError::Unavailable(sqlx::Error::Decode(
                format!("invalid fingerprint hex in row {}", self.id).into(),
            )))?;
        let tx_ref = TxRef::from_hex(&self.tx_ref)
            .ok_or_else(|| StoreError::Unavailable(sqlx::Error::Decode(
                format!("invalid tx_ref hex in row {}", self.id).into(),
            )))?;
        let status = InvoiceStatus::from_str(&self.status)
            .ok_or_else(|| StoreError::Unavailable(sqlx::Error::Decode(
                format!("unknown invoice status {:?} in row {}", self.status, self.id).into(),
            )))?;

        Ok(MirrorRecord {
            id: self.id,
            owner: self.owner,
            fingerprint,
            status,
            tx_ref,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_if_absent(
        &self,
        fingerprint: &Fingerprint,
        owner: &str,
        tx_ref: &TxRef,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (owner, fingerprint, status, tx_ref)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (fingerprint) DO NOTHING
            "#,
        )
        .bind(owner)
        .bind(fingerprint.to_hex())
        .bind(InvoiceStatus::Valid.as_str())
        .bind(tx_ref.to_hex())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_paid(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET status = $1 WHERE fingerprint = $2
            "#,
        )
        .bind(InvoiceStatus::Paid.as_str())
        .bind(fingerprint.to_hex())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, fingerprint: &Fingerprint) -> Result<Option<MirrorRecord>, StoreError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT id, owner, fingerprint, status, tx_ref, created_at
            FROM invoices
            WHERE fingerprint = $1
            "#,
        )
        .bind(fingerprint.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(InvoiceRow::into_record).transpose()
    }
}

/// PostgreSQL-backed credential store.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    phone: String,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_if_absent(
        &self,
        username: &str,
        password_hash: &str,
        phone: &str,
    ) -> Result<bool, StoreError> {
        // Check by inspection first so a conflicting registration is a normal
        // outcome rather than a constraint violation.
        let existing = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM users WHERE username = $1 OR phone = $2
            "#,
        )
        .bind(username)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            return Ok(false);
        }

        // The unique constraints still settle concurrent registrations.
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, phone)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(phone)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, phone, created_at
            FROM users
            WHERE username = $1 AND password_hash = $2
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserRecord {
            id: r.id,
            username: r.username,
            phone: r.phone,
            created_at: r.created_at,
        }))
    }
}
