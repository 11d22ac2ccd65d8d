use crate::{Error, KeyPair, X25519PublicKey};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use x25519_dalek::SharedSecret;

/// A one-time pre-key as defined in Signal's X3DH protocol.
///
/// One-time pre-keys provide additional forward secrecy even if the signed
/// pre-key is compromised. Each key is consumed by at most one handshake.
pub struct OneTimePreKey {
    key: KeyPair,
    id: u32,
}

impl OneTimePreKey {
    /// Creates a new one-time pre-key with the given ID.
    pub fn generate(id: u32) -> Result<Self, Error> {
        Ok(Self {
            key: KeyPair::generate()?,
            id,
        })
    }

    /// Returns the public component of this pre-key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.key.public_key()
    }

    /// Returns the identifier for this pre-key.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn dh(&self, public_key: &X25519PublicKey) -> Result<SharedSecret, Error> {
        self.key.dh(public_key)
    }
}

/// The local pool of unused one-time pre-keys, ordered by id.
///
/// Every access goes through one lock, so [`OneTimeKeyPool::consume_with`] is
/// an atomic check-and-consume: two racing handshakes naming the same id
/// cannot both use the key.
pub struct OneTimeKeyPool {
    keys: Mutex<BTreeMap<u32, OneTimePreKey>>,
}

impl OneTimeKeyPool {
    /// Generates `count` one-time pre-keys with ids `0..count`.
    pub fn generate(count: u32) -> Result<Self, Error> {
        let mut keys = BTreeMap::new();
        for id in 0..count {
            keys.insert(id, OneTimePreKey::generate(id)?);
        }

        Ok(Self {
            keys: Mutex::new(keys),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u32, OneTimePreKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the ids and public keys of every unused pre-key in id order.
    pub fn public_keys(&self) -> Vec<(u32, X25519PublicKey)> {
        self.lock()
            .iter()
            .map(|(id, key)| (*id, key.public_key()))
            .collect()
    }

    /// Runs `attempt` with the pre-key `id` and consumes the key only if the
    /// attempt succeeds.
    ///
    /// The pool stays locked for the whole attempt. Concurrent attempts on any
    /// id wait their turn instead of seeing the key as missing, and a failed
    /// attempt leaves the key in place.
    pub(crate) fn consume_with<T>(
        &self,
        id: u32,
        attempt: impl FnOnce(&OneTimePreKey) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut keys = self.lock();
        let key = keys.get(&id).ok_or(Error::UnknownOneTimeKey(id))?;

        let value = attempt(key)?;
        keys.remove(&id);

        Ok(value)
    }

    /// Returns `true` if an unused key with this id is in the pool.
    pub fn contains(&self, id: u32) -> bool {
        self.lock().contains_key(&id)
    }

    /// Returns the number of unused pre-keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
