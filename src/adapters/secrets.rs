//! Credential resolution
//!
//! The pipeline stages never hold raw credentials in configuration; they
//! name a secret and resolve it through [`SecretStore`] at connect time.
//! [`SecretCache`] caches resolved secrets for the process lifetime and
//! supports wholesale invalidation when an adapter detects staleness.

use crate::config::secret::{secret_string, SecretString};
use crate::domain::errors::FerryError;
use crate::domain::result::Result;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A resolved secret: named credential fields
pub type SecretMap = HashMap<String, SecretString>;

/// Secret lookup collaborator
///
/// A lookup or permission failure surfaces as
/// [`FerryError::CredentialUnavailable`], which is not retryable without
/// operator intervention.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<SecretMap>;
}

/// Environment-backed secret store
///
/// Resolves a secret name to the environment variable of the same name,
/// whose value is a JSON object of credential fields, the shape a
/// secrets-manager lookup returns.
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<SecretMap> {
        let raw = std::env::var(name).map_err(|_| {
            FerryError::CredentialUnavailable(format!("secret '{name}' is not set"))
        })?;

        let fields: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
            FerryError::CredentialUnavailable(format!(
                "secret '{name}' is not a JSON object of fields: {e}"
            ))
        })?;

        Ok(fields
            .into_iter()
            .map(|(key, value)| (key, secret_string(value)))
            .collect())
    }
}

/// Process-lifetime secret cache with wholesale invalidation
///
/// Lazily resolves secrets through the wrapped store and caches them by
/// name. Adapters call [`SecretCache::invalidate`] when a failure suggests
/// the cached credentials are stale, forcing a fresh lookup on the next
/// acquire.
pub struct SecretCache {
    store: Arc<dyn SecretStore>,
    cache: Mutex<HashMap<String, SecretMap>>,
}

impl SecretCache {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a secret, serving from cache when possible
    pub async fn get(&self, name: &str) -> Result<SecretMap> {
        let mut cache = self.cache.lock().await;
        if let Some(secret) = cache.get(name) {
            return Ok(secret.clone());
        }

        let secret = self.store.get_secret(name).await?;
        cache.insert(name.to_string(), secret.clone());
        tracing::debug!(secret_name = name, "Secret resolved and cached");
        Ok(secret)
    }

    /// Drop one cached secret
    pub async fn invalidate(&self, name: &str) {
        self.cache.lock().await.remove(name);
        tracing::debug!(secret_name = name, "Cached secret invalidated");
    }
}

/// Pull a required field out of a resolved secret
pub fn require_field<'a>(
    secret: &'a SecretMap,
    secret_name: &str,
    field: &str,
) -> Result<&'a SecretString> {
    secret.get(field).ok_or_else(|| {
        FerryError::CredentialUnavailable(format!(
            "secret '{secret_name}' is missing field '{field}'"
        ))
    })
}

/// Expose a required field as a plain &str
pub fn require_str<'a>(
    secret: &'a SecretMap,
    secret_name: &str,
    field: &str,
) -> Result<&'a str> {
    require_field(secret, secret_name, field).map(|s| s.expose_secret().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl SecretStore for CountingStore {
        async fn get_secret(&self, _name: &str) -> Result<SecretMap> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let mut fields = HashMap::new();
            fields.insert("user".to_string(), secret_string("svc".to_string()));
            Ok(fields)
        }
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_lookups() {
        let store = Arc::new(CountingStore {
            lookups: AtomicUsize::new(0),
        });
        let cache = SecretCache::new(store.clone());

        cache.get("db").await.unwrap();
        cache.get("db").await.unwrap();
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fresh_lookup() {
        let store = Arc::new(CountingStore {
            lookups: AtomicUsize::new(0),
        });
        let cache = SecretCache::new(store.clone());

        cache.get("db").await.unwrap();
        cache.invalidate("db").await;
        cache.get("db").await.unwrap();
        assert_eq!(store.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_env_store_missing_variable() {
        std::env::remove_var("FERRY_TEST_ABSENT_SECRET");
        let err = EnvSecretStore
            .get_secret("FERRY_TEST_ABSENT_SECRET")
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::CredentialUnavailable(_)));
    }

    #[tokio::test]
    async fn test_env_store_parses_json_fields() {
        std::env::set_var(
            "FERRY_TEST_JSON_SECRET",
            r#"{"user": "svc", "password": "hunter2"}"#,
        );
        let secret = EnvSecretStore
            .get_secret("FERRY_TEST_JSON_SECRET")
            .await
            .unwrap();
        assert_eq!(
            require_str(&secret, "FERRY_TEST_JSON_SECRET", "user").unwrap(),
            "svc"
        );
        std::env::remove_var("FERRY_TEST_JSON_SECRET");
    }

    #[tokio::test]
    async fn test_env_store_rejects_non_json() {
        std::env::set_var("FERRY_TEST_BAD_SECRET", "not-json");
        let err = EnvSecretStore
            .get_secret("FERRY_TEST_BAD_SECRET")
            .await
            .unwrap_err();
        assert!(matches!(err, FerryError::CredentialUnavailable(_)));
        std::env::remove_var("FERRY_TEST_BAD_SECRET");
    }

    #[test]
    fn test_require_field_missing() {
        let secret = SecretMap::new();
        let err = require_field(&secret, "db", "password").unwrap_err();
        assert!(err.to_string().contains("missing field 'password'"));
    }
}
