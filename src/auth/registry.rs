//! Active refresh token per user and the revocation blacklist.

use super::store::{KeyValueStore, StoreError};
use std::{sync::Arc, time::Duration};
use tracing::debug;

const BLACKLIST_MARKER: &str = "1";

#[derive(Clone)]
pub struct TokenRegistry {
    store: Arc<dyn KeyValueStore>,
    refresh_ttl: Duration,
}

impl TokenRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, refresh_ttl: Duration) -> Self {
        Self { store, refresh_ttl }
    }

    fn refresh_key(user_id: i64) -> String {
        format!("refresh_token:{user_id}")
    }

    fn blacklist_key(token: &str) -> String {
        format!("blacklist:{token}")
    }

    /// Register `token` as the only valid refresh token of `user_id`,
    /// replacing whatever was registered before.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub async fn store_refresh(&self, user_id: i64, token: &str) -> Result<(), StoreError> {
        self.store
            .set_with_ttl(&Self::refresh_key(user_id), token, self.refresh_ttl)
            .await
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn active_refresh(&self, user_id: i64) -> Result<Option<String>, StoreError> {
        self.store.get(&Self::refresh_key(user_id)).await
    }

    /// # Errors
    /// Returns an error if the store rejects the delete.
    pub async fn revoke_refresh(&self, user_id: i64) -> Result<(), StoreError> {
        debug!(user_id, "Refresh token unregistered");
        self.store.delete(&Self::refresh_key(user_id)).await
    }

    /// Reject `token` for the next `ttl`, normally its remaining lifetime.
    ///
    /// # Errors
    /// Returns an error if the store rejects the write.
    pub async fn blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        self.store
            .set_with_ttl(&Self::blacklist_key(token), BLACKLIST_MARKER, ttl)
            .await
    }

    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        self.store.exists(&Self::blacklist_key(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn newer_refresh_token_replaces_older() -> Result<(), StoreError> {
        let store = Arc::new(MemoryStore::new());
        let registry = TokenRegistry::new(store.clone(), Duration::from_secs(3600));

        registry.store_refresh(1, "first").await?;
        registry.store_refresh(1, "second").await?;
        registry.store_refresh(2, "other").await?;

        assert_eq!(registry.active_refresh(1).await?, Some("second".to_string()));
        assert_eq!(registry.active_refresh(2).await?, Some("other".to_string()));

        let remaining = store.remaining_ttl("refresh_token:1").await;
        assert_eq!(remaining, Some(Duration::from_secs(3600)));

        registry.revoke_refresh(1).await?;
        assert_eq!(registry.active_refresh(1).await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn blacklist_entries_expire_with_the_token() -> Result<(), StoreError> {
        let store = Arc::new(MemoryStore::new());
        let registry = TokenRegistry::new(store, Duration::from_secs(3600));

        registry.blacklist("tok", Duration::from_secs(30)).await?;
        assert!(registry.is_blacklisted("tok").await?);
        assert!(!registry.is_blacklisted("other").await?);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!registry.is_blacklisted("tok").await?);
        Ok(())
    }
}
