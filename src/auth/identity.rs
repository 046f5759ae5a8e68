//! Read-only access to user records owned by the user service.

use async_trait::async_trait;
use sqlx::{Connection, MySqlPool, Row, mysql::MySqlRow};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info_span};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("password verification task failed: {0}")]
    Verification(#[from] tokio::task::JoinError),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("is_active", &self.is_active)
            .finish()
    }
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, IdentityError>;

    async fn ping(&self) -> Result<(), IdentityError>;
}

const SELECT_USER: &str = "SELECT id, username, email, password_hash, is_active FROM users";

/// `users` table of the user service database.
#[derive(Clone, Debug)]
pub struct MySqlIdentityStore {
    pool: MySqlPool,
}

impl MySqlIdentityStore {
    #[must_use]
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &MySqlRow) -> Result<Identity, sqlx::Error> {
        // NULL is_active is treated as disabled
        let is_active: Option<bool> = row.try_get("is_active")?;
        Ok(Identity {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            is_active: is_active.unwrap_or(false),
        })
    }
}

#[async_trait]
impl IdentityStore for MySqlIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        // the column collation may be case-insensitive, the byte comparison is not
        let query = format!(
            "{SELECT_USER} WHERE email = ? AND CAST(email AS BINARY) = CAST(? AS BINARY) LIMIT 1"
        );
        let span = info_span!("db.query", db.system = "mysql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(email)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        Ok(row.as_ref().map(Self::from_row).transpose()?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, IdentityError> {
        let query = format!("{SELECT_USER} WHERE id = ? LIMIT 1");
        let span = info_span!("db.query", db.system = "mysql", db.operation = "SELECT");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;
        Ok(row.as_ref().map(Self::from_row).transpose()?)
    }

    async fn ping(&self) -> Result<(), IdentityError> {
        let acquire_span = info_span!("db.acquire", db.system = "mysql", db.operation = "ACQUIRE");
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "mysql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}

/// In-memory user records, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    users: RwLock<HashMap<i64, Identity>>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub async fn upsert(&self, identity: Identity) {
        self.users.write().await.insert(identity.id, identity);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, IdentityError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn ping(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}

/// Opaque `verify(plaintext, hash)` capability over stored credential hashes.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}

/// Verifies bcrypt hashes (`$2a$`, `$2b$`, `$2y$`) as written by the user service.
#[derive(Clone, Copy, Debug, Default)]
pub struct BcryptVerifier;

impl PasswordVerifier for BcryptVerifier {
    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        bcrypt::verify(plaintext, hash).unwrap_or_else(|err| {
            debug!("Unusable password hash: {err}");
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: i64, email: &str) -> Identity {
        Identity {
            id,
            username: format!("user{id}"),
            email: email.to_string(),
            password_hash: "$2b$04$invalid".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn bcrypt_verifier_accepts_matching_password() -> Result<(), bcrypt::BcryptError> {
        let hash = bcrypt::hash("p1", 4)?;
        assert!(BcryptVerifier.verify("p1", &hash));
        assert!(!BcryptVerifier.verify("p2", &hash));
        Ok(())
    }

    #[test]
    fn bcrypt_verifier_rejects_malformed_hash() {
        assert!(!BcryptVerifier.verify("p1", "not-a-hash"));
        assert!(!BcryptVerifier.verify("p1", ""));
    }

    #[test]
    fn identity_debug_redacts_hash() {
        let rendered = format!("{:?}", identity(1, "a@x.com"));
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("$2b$"));
    }

    #[tokio::test]
    async fn memory_store_looks_up_by_email_and_id() -> Result<(), IdentityError> {
        let store = MemoryIdentityStore::new();
        store.upsert(identity(1, "a@x.com")).await;
        store.upsert(identity(2, "b@x.com")).await;

        let found = store.find_by_email("b@x.com").await?;
        assert_eq!(found.map(|user| user.id), Some(2));
        assert!(store.find_by_email("B@x.com").await?.is_none());
        assert_eq!(
            store.find_by_id(1).await?.map(|user| user.email),
            Some("a@x.com".to_string())
        );
        assert!(store.find_by_id(3).await?.is_none());
        Ok(())
    }
}
