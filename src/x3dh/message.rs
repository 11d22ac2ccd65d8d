use crate::{Nonce, X25519PublicKey};

/// The message an initiator sends to start a session.
///
/// Carries everything the responder needs to repeat the key agreement plus
/// the first ciphertext, which proves the initiator derived the same key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeMessage {
    /// Initiator's identity public key.
    pub identity_public: X25519PublicKey,
    /// Initiator's ephemeral public key, generated for this handshake only.
    pub ephemeral_public: X25519PublicKey,
    /// Id of the responder's one-time pre-key that was used.
    pub one_time_key_id: u32,
    /// First message, encrypted under the new session key.
    pub ciphertext: Vec<u8>,
    /// Random XChaCha20 nonce the first message was encrypted under.
    pub nonce: Nonce,
}
