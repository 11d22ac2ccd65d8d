use crate::{EncodedPublicKey, Error, generate_random_seed};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Long-term Ed25519 key pair used to sign the signed pre-key.
///
/// Generated independently of the X25519 identity key.
pub struct SigningKeyPair {
    signing_key: Box<SigningKey>,
}

impl SigningKeyPair {
    /// Creates a new signing key pair with a random seed.
    pub fn generate() -> Result<Self, Error> {
        let mut seed = generate_random_seed()?;
        let signing_key = Box::new(SigningKey::from_bytes(&seed));
        seed.zeroize();

        Ok(Self { signing_key })
    }

    /// Signs a message with the Ed25519 signing key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Returns the public verification key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

// `SigningKey` wipes its secret scalar when dropped.
impl ZeroizeOnDrop for SigningKeyPair {}

/// Signs the *encoded* signed pre-key.
///
/// The signature covers `Encode(SPK)`, never the raw 32 bytes, and
/// verification recomputes the same encoding.
pub fn sign_prekey(signing_key: &SigningKeyPair, encoded_spk: &EncodedPublicKey) -> Signature {
    signing_key.sign(encoded_spk.as_ref())
}
