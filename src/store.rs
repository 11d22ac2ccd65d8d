//! Where responders publish bundles and initiators fetch them.

use crate::{DownloadedBundle, Error, PrekeyBundle};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Storage contract for published pre-key bundles.
pub trait BundleStore {
    /// Publishes `bundle` for `party_id`, replacing any previous bundle.
    fn upload(&self, party_id: &str, bundle: PrekeyBundle) -> Result<(), Error>;

    /// Returns the fixed bundle fields plus one one-time pre-key that has
    /// never been handed out before.
    fn download(&self, party_id: &str) -> Result<DownloadedBundle, Error>;
}

struct StoredBundle {
    bundle: PrekeyBundle,
    issued: BTreeSet<u32>,
}

/// A [`BundleStore`] kept in process memory.
///
/// Issued one-time ids are remembered across re-uploads, so an id is never
/// handed to two initiators even if the responder publishes it again.
#[derive(Default)]
pub struct MemoryBundleStore {
    parties: Mutex<HashMap<String, StoredBundle>>,
}

impl MemoryBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredBundle>> {
        self.parties.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of one-time pre-keys still available for `party_id`.
    pub fn remaining(&self, party_id: &str) -> usize {
        self.lock().get(party_id).map_or(0, |stored| {
            stored
                .bundle
                .one_time_keys
                .iter()
                .filter(|(id, _)| !stored.issued.contains(id))
                .count()
        })
    }
}

impl BundleStore for MemoryBundleStore {
    fn upload(&self, party_id: &str, bundle: PrekeyBundle) -> Result<(), Error> {
        let mut parties = self.lock();
        let issued = parties
            .remove(party_id)
            .map(|stored| stored.issued)
            .unwrap_or_default();

        debug!(
            party_id,
            one_time_keys = bundle.one_time_keys.len(),
            "uploaded pre-key bundle"
        );

        parties.insert(party_id.to_string(), StoredBundle { bundle, issued });
        Ok(())
    }

    fn download(&self, party_id: &str) -> Result<DownloadedBundle, Error> {
        let mut parties = self.lock();
        let stored = parties
            .get_mut(party_id)
            .ok_or_else(|| Error::BundleNotFound(party_id.to_string()))?;

        let Some(id) = stored
            .bundle
            .one_time_keys
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !stored.issued.contains(id))
            .min()
        else {
            warn!(party_id, "no one-time pre-keys left to issue");
            return Err(Error::OneTimeKeysExhausted(party_id.to_string()));
        };

        stored.issued.insert(id);
        debug!(party_id, one_time_key_id = id, "issued pre-key bundle");

        stored
            .bundle
            .select(id)
            .ok_or_else(|| Error::OneTimeKeysExhausted(party_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountConfig, init_identity};
    use std::sync::Arc;
    use std::thread;

    fn bundle(one_time_keys: u32) -> PrekeyBundle {
        let config = AccountConfig {
            one_time_keys,
            ..AccountConfig::default()
        };
        init_identity(&config).unwrap().prekey_bundle()
    }

    #[test]
    fn test_download_issues_lowest_unissued_id() {
        let store = MemoryBundleStore::new();
        let bundle = bundle(3);
        store.upload("bob", bundle.clone()).unwrap();

        for expected in 0..3 {
            let downloaded = store.download("bob").unwrap();
            assert_eq!(downloaded.one_time_key, bundle.one_time_keys[expected]);
            assert_eq!(downloaded.identity_public, bundle.identity_public);
        }
        assert_eq!(store.remaining("bob"), 0);
    }

    #[test]
    fn test_exhausted_pool() {
        let store = MemoryBundleStore::new();
        store.upload("bob", bundle(1)).unwrap();
        store.download("bob").unwrap();

        assert_eq!(
            store.download("bob").err(),
            Some(Error::OneTimeKeysExhausted("bob".to_string()))
        );
    }

    #[test]
    fn test_unknown_party() {
        let store = MemoryBundleStore::new();

        assert_eq!(
            store.download("carol").err(),
            Some(Error::BundleNotFound("carol".to_string()))
        );
        assert_eq!(store.remaining("carol"), 0);
    }

    #[test]
    fn test_reupload_does_not_reissue_ids() {
        let store = MemoryBundleStore::new();
        let bundle = bundle(3);
        store.upload("bob", bundle.clone()).unwrap();
        assert_eq!(store.download("bob").unwrap().one_time_key.0, 0);

        store.upload("bob", bundle).unwrap();
        assert_eq!(store.download("bob").unwrap().one_time_key.0, 1);
        assert_eq!(store.remaining("bob"), 1);
    }

    #[test]
    fn test_concurrent_downloads_never_share_an_id() {
        let store = Arc::new(MemoryBundleStore::new());
        store.upload("bob", bundle(16)).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.download("bob").unwrap().one_time_key.0)
            })
            .collect();

        let ids: BTreeSet<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 16);
        assert!(store.download("bob").is_err());
    }
}
