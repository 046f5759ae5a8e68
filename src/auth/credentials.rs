use super::identity::{Identity, IdentityError, IdentityStore, PasswordVerifier};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Why a credential check failed.
///
/// `NotFound` and `BadCredential` are kept apart for logging only; callers
/// must answer both the same way.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no account for this email")]
    NotFound,
    #[error("password does not match")]
    BadCredential,
    #[error("account is inactive")]
    Inactive,
    #[error(transparent)]
    Backend(#[from] IdentityError),
}

#[derive(Clone)]
pub struct CredentialVerifier {
    identities: Arc<dyn IdentityStore>,
    passwords: Arc<dyn PasswordVerifier>,
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(identities: Arc<dyn IdentityStore>, passwords: Arc<dyn PasswordVerifier>) -> Self {
        Self {
            identities,
            passwords,
        }
    }

    /// Look the email up, check the password, then the active flag.
    ///
    /// The active flag is checked last so a disabled account is only revealed
    /// to someone who knows its password.
    ///
    /// # Errors
    /// Returns a [`CredentialError`] describing the first failed check.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, CredentialError> {
        // lockout keys are per exact email, so a case variant must not resolve
        let Some(identity) = self
            .identities
            .find_by_email(email)
            .await?
            .filter(|identity| identity.email == email)
        else {
            return Err(CredentialError::NotFound);
        };

        // hashing is CPU bound, keep it off the async workers
        let passwords = self.passwords.clone();
        let plaintext = password.to_string();
        let hash = identity.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || passwords.verify(&plaintext, &hash))
            .await
            .map_err(|err| {
                error!("Password verification task failed: {err}");
                IdentityError::from(err)
            })?;

        if !matches {
            return Err(CredentialError::BadCredential);
        }

        if !identity.is_active {
            return Err(CredentialError::Inactive);
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::MemoryIdentityStore;

    /// Plaintext comparison, enough to exercise the decision order.
    struct PlainVerifier;

    impl PasswordVerifier for PlainVerifier {
        fn verify(&self, plaintext: &str, hash: &str) -> bool {
            plaintext == hash
        }
    }

    async fn verifier() -> CredentialVerifier {
        let store = MemoryIdentityStore::new();
        store
            .upsert(Identity {
                id: 1,
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                password_hash: "p1".to_string(),
                is_active: true,
            })
            .await;
        store
            .upsert(Identity {
                id: 2,
                username: "carol".to_string(),
                email: "c@x.com".to_string(),
                password_hash: "p2".to_string(),
                is_active: false,
            })
            .await;
        CredentialVerifier::new(Arc::new(store), Arc::new(PlainVerifier))
    }

    #[tokio::test]
    async fn accepts_matching_credentials() -> Result<(), CredentialError> {
        let identity = verifier().await.authenticate("a@x.com", "p1").await?;
        assert_eq!(identity.id, 1);
        Ok(())
    }

    #[tokio::test]
    async fn distinguishes_failure_reasons() {
        let verifier = verifier().await;

        assert!(matches!(
            verifier.authenticate("nobody@x.com", "p1").await,
            Err(CredentialError::NotFound)
        ));
        assert!(matches!(
            verifier.authenticate("a@x.com", "wrong").await,
            Err(CredentialError::BadCredential)
        ));
        assert!(matches!(
            verifier.authenticate("c@x.com", "p2").await,
            Err(CredentialError::Inactive)
        ));
        // wrong password on a disabled account does not reveal the flag
        assert!(matches!(
            verifier.authenticate("c@x.com", "wrong").await,
            Err(CredentialError::BadCredential)
        ));
    }

    /// Case-insensitive lookup, like a `_ci` column collation.
    struct FoldingStore(MemoryIdentityStore);

    #[async_trait::async_trait]
    impl IdentityStore for FoldingStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, IdentityError> {
            self.0.find_by_email(&email.to_ascii_lowercase()).await
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, IdentityError> {
            self.0.find_by_id(id).await
        }

        async fn ping(&self) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    struct PanickingVerifier;

    impl PasswordVerifier for PanickingVerifier {
        fn verify(&self, _plaintext: &str, _hash: &str) -> bool {
            panic!("hasher blew up")
        }
    }

    #[tokio::test]
    async fn email_must_match_stored_value_exactly() -> Result<(), CredentialError> {
        let store = MemoryIdentityStore::new();
        store
            .upsert(Identity {
                id: 1,
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                password_hash: "p1".to_string(),
                is_active: true,
            })
            .await;
        let verifier =
            CredentialVerifier::new(Arc::new(FoldingStore(store)), Arc::new(PlainVerifier));

        assert_eq!(verifier.authenticate("a@x.com", "p1").await?.id, 1);
        assert!(matches!(
            verifier.authenticate("A@x.com", "p1").await,
            Err(CredentialError::NotFound)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn verification_task_failure_is_a_backend_error() {
        let store = MemoryIdentityStore::new();
        store
            .upsert(Identity {
                id: 1,
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                password_hash: "p1".to_string(),
                is_active: true,
            })
            .await;
        let verifier = CredentialVerifier::new(Arc::new(store), Arc::new(PanickingVerifier));

        assert!(matches!(
            verifier.authenticate("a@x.com", "p1").await,
            Err(CredentialError::Backend(IdentityError::Verification(_)))
        ));
    }

    #[tokio::test]
    async fn works_with_bcrypt_hashes() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryIdentityStore::new();
        store
            .upsert(Identity {
                id: 5,
                username: "dave".to_string(),
                email: "d@x.com".to_string(),
                password_hash: bcrypt::hash("secret", 4)?,
                is_active: true,
            })
            .await;
        let verifier = CredentialVerifier::new(
            Arc::new(store),
            Arc::new(crate::auth::identity::BcryptVerifier),
        );

        assert_eq!(verifier.authenticate("d@x.com", "secret").await?.id, 5);
        assert!(verifier.authenticate("d@x.com", "Secret").await.is_err());
        Ok(())
    }
}
