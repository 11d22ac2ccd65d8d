mod key_pair;
pub use key_pair::*;
mod one_time_pre_key;
pub use one_time_pre_key::*;
mod signing_key;
pub use signing_key::*;

use crate::{AccountConfig, Error, PrekeyBundle, X25519PublicKey};
use ed25519_dalek::{Signature, VerifyingKey};

/// All key material one party holds.
///
/// Created once by [`init_identity`]. Private keys never leave this struct;
/// [`IdentityKeys::prekey_bundle`] exposes only public values.
pub struct IdentityKeys {
    pub(crate) identity: KeyPair,
    pub(crate) signed_prekey: KeyPair,
    pub(crate) signing: SigningKeyPair,
    pub(crate) signed_prekey_signature: Signature,
    pub(crate) one_time_keys: OneTimeKeyPool,
}

/// Generates, in order, the identity key pair, the signed pre-key pair, the
/// signing key pair and `config.one_time_keys` one-time pre-keys, then signs
/// the encoded signed pre-key.
pub fn init_identity(config: &AccountConfig) -> Result<IdentityKeys, Error> {
    let identity = KeyPair::generate()?;
    let signed_prekey = KeyPair::generate()?;
    let signing = SigningKeyPair::generate()?;
    let one_time_keys = OneTimeKeyPool::generate(config.one_time_keys)?;

    let signed_prekey_signature = sign_prekey(&signing, &signed_prekey.public_key().encode());

    Ok(IdentityKeys {
        identity,
        signed_prekey,
        signing,
        signed_prekey_signature,
        one_time_keys,
    })
}

impl IdentityKeys {
    /// Returns the public identity key for DH operations.
    #[inline]
    pub fn identity_public(&self) -> X25519PublicKey {
        self.identity.public_key()
    }

    /// Returns the public signed pre-key.
    #[inline]
    pub fn signed_prekey_public(&self) -> X25519PublicKey {
        self.signed_prekey.public_key()
    }

    /// Returns the public verification key of the signing key pair.
    #[inline]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Returns the local one-time pre-key pool.
    pub fn one_time_keys(&self) -> &OneTimeKeyPool {
        &self.one_time_keys
    }

    /// Builds the publishable bundle: the four public values plus every
    /// unused one-time public key.
    pub fn prekey_bundle(&self) -> PrekeyBundle {
        PrekeyBundle {
            identity_public: self.identity_public(),
            verifying_key: self.verifying_key(),
            signed_prekey_public: self.signed_prekey_public(),
            signed_prekey_signature: self.signed_prekey_signature,
            one_time_keys: self.one_time_keys.public_keys(),
        }
    }
}
