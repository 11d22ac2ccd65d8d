/// Errors that can occur while establishing or using a session.
///
/// None of the variants carry key material.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// The signed pre-key signature in a bundle did not verify.
    #[error("Pre-key bundle signature verification failed")]
    Signature,

    /// A cipher refused its input, e.g. a plaintext too long to encrypt.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// An AEAD tag did not verify.
    #[error("Message authentication failed")]
    Authentication,

    /// The referenced one-time pre-key is unknown or was already consumed.
    #[error("Unknown one-time pre-key: {0}")]
    UnknownOneTimeKey(u32),

    /// A public key is a low-order point or produced a non-contributory DH output.
    #[error("Invalid curve point")]
    InvalidPoint,

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,

    /// HKDF rejected the requested output length.
    #[error("Key derivation failed")]
    Kdf,

    /// Serialization or deserialization failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),

    /// The bundle store has no bundle for the party.
    #[error("No pre-key bundle uploaded for {0}")]
    BundleNotFound(String),

    /// The bundle store has no unissued one-time pre-key left for the party.
    #[error("One-time pre-keys exhausted for {0}")]
    OneTimeKeysExhausted(String),
}

impl From<prost::DecodeError> for Error {
    fn from(value: prost::DecodeError) -> Self {
        Self::Serde(value.to_string())
    }
}

impl From<chacha20poly1305::Error> for Error {
    fn from(value: chacha20poly1305::Error) -> Self {
        Self::Crypto(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cipher_failure_is_not_authentication() {
        let err = Error::from(chacha20poly1305::Error);

        assert!(matches!(err, Error::Crypto(_)));
        assert_ne!(err, Error::Authentication);
    }
}
