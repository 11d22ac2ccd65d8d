use crate::{Error, X25519PublicKey, X25519Secret};
use x25519_dalek::SharedSecret;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An X25519 key pair.
///
/// Used for the identity key, the signed pre-key, every one-time pre-key and
/// the initiator's ephemeral key. The secret is zeroized on drop.
pub struct KeyPair {
    secret: X25519Secret,
    public: X25519PublicKey,
}

impl KeyPair {
    /// Generates a new key pair from the OS random number generator.
    pub fn generate() -> Result<Self, Error> {
        let secret = X25519Secret::generate()?;
        let public = secret.public_key();

        Ok(Self { secret, public })
    }

    /// Returns the public component of this key pair.
    #[inline]
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Performs Diffie-Hellman key agreement with another party's public key.
    pub(crate) fn dh(&self, public_key: &X25519PublicKey) -> Result<SharedSecret, Error> {
        self.secret.diffie_hellman(public_key)
    }
}

impl Zeroize for KeyPair {
    fn zeroize(&mut self) {
        self.secret.zeroize();
    }
}

impl ZeroizeOnDrop for KeyPair {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_creation() {
        let key_pair = KeyPair::generate().unwrap();

        assert!(!key_pair.public_key().as_bytes().iter().all(|&b| b == 0));
        assert_eq!(key_pair.public_key(), key_pair.secret.public_key());
    }

    #[test]
    fn test_diffie_hellman() {
        let alice = KeyPair::generate().unwrap();
        let bob = KeyPair::generate().unwrap();

        let alice_shared = alice.dh(&bob.public_key()).unwrap();
        let bob_shared = bob.dh(&alice.public_key()).unwrap();

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_distinct_key_pairs() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();

        assert_ne!(a.public_key(), b.public_key());
    }
}
