//! Source of verified recipient keys.
//!
//! Fetching and verifying published key bundles happens elsewhere. The
//! client only needs the current verified set, or to learn that none is
//! available yet.

use async_trait::async_trait;
use tokio::sync::RwLock;
use whistle_protocol::VerifiedPublicKeys;

/// Supplies the currently verified recipient keys.
///
/// ## Async
///
/// Async so implementations can consult a cache refreshed over the network.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// The verified key set, or `None` if keys have not been verified yet.
    async fn get_verified_keys(&self) -> Option<VerifiedPublicKeys>;
}

/// Key provider holding a key set in memory.
#[derive(Debug, Default)]
pub struct StaticKeyProvider {
    keys: RwLock<Option<VerifiedPublicKeys>>,
}

impl StaticKeyProvider {
    /// Provider that always returns `keys`.
    pub fn new(keys: VerifiedPublicKeys) -> Self {
        Self {
            keys: RwLock::new(Some(keys)),
        }
    }

    /// Provider with no verified keys.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Swap in a new key set, or `None` to make keys unavailable.
    pub async fn replace(&self, keys: Option<VerifiedPublicKeys>) {
        *self.keys.write().await = keys;
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn get_verified_keys(&self) -> Option<VerifiedPublicKeys> {
        self.keys.read().await.clone()
    }
}
