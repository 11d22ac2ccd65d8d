use crate::{EncodedPublicKey, Error, X25519PublicKey};
use base64::Engine;
use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// XChaCha20-Poly1305 nonce length.
pub const NONCE_LENGTH: usize = 24;

/// Poly1305 tag length appended to every ciphertext.
pub const TAG_LENGTH: usize = 16;

/// Length of [`AssociatedData`]: two encoded public keys.
pub const ASSOCIATED_DATA_LENGTH: usize = 66;

pub type Nonce = [u8; NONCE_LENGTH];

/// The 32-byte symmetric key shared by both parties after a handshake.
///
/// Never serialized; compared in constant time.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey(pub(crate) Box<[u8; 32]>);

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice().ct_eq(other.0.as_slice()).into()
    }
}

impl Eq for SessionKey {}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// `Encode(IK_initiator) || Encode(IK_responder)`.
///
/// Both sides build it in the same (initiator, responder) order, so the bytes
/// are identical.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AssociatedData([u8; ASSOCIATED_DATA_LENGTH]);

impl AssociatedData {
    pub fn new(initiator_identity: &X25519PublicKey, responder_identity: &X25519PublicKey) -> Self {
        let mut bytes = [0u8; ASSOCIATED_DATA_LENGTH];
        bytes[..33].copy_from_slice(EncodedPublicKey::encode(initiator_identity).as_ref());
        bytes[33..].copy_from_slice(EncodedPublicKey::encode(responder_identity).as_ref());

        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ASSOCIATED_DATA_LENGTH] {
        &self.0
    }
}

impl AsRef<[u8]> for AssociatedData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AssociatedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let engine = base64::engine::general_purpose::STANDARD;
        f.debug_tuple("AssociatedData")
            .field(&engine.encode(self.0))
            .finish()
    }
}

/// Encrypts `plaintext` with XChaCha20-Poly1305 under a fresh random nonce.
///
/// Returns the ciphertext (plaintext length + [`TAG_LENGTH`]) and the nonce.
pub fn aead_encrypt(
    key: &SessionKey,
    ad: &AssociatedData,
    plaintext: &[u8],
) -> Result<(Vec<u8>, Nonce), Error> {
    let mut nonce = [0u8; NONCE_LENGTH];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|_| Error::Random)?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.0.as_slice()));
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: ad.as_ref(),
            },
        )?;

    Ok((ciphertext, nonce))
}

/// Decrypts and authenticates a ciphertext.
///
/// Any failure is reported as [`Error::Authentication`] without saying
/// whether the key, nonce, associated data or ciphertext was wrong.
pub fn aead_decrypt(
    key: &SessionKey,
    ad: &AssociatedData,
    ciphertext: &[u8],
    nonce: &Nonce,
) -> Result<Vec<u8>, Error> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.0.as_slice()));
    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: ad.as_ref(),
            },
        )
        .map_err(|_| Error::Authentication)
}

/// Which side of the handshake a session was created on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// One encrypted message inside an established session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionMessage {
    pub nonce: Nonce,
    pub ciphertext: Vec<u8>,
}

/// A secure messaging session with one peer.
///
/// Created only after a handshake fully succeeds and immutable afterwards.
/// Every message uses the same key and associated data; each encryption
/// draws a fresh nonce.
pub struct Session {
    session_id: String,
    key: SessionKey,
    ad: AssociatedData,
    role: Role,
}

impl Session {
    pub(crate) fn new(
        key: SessionKey,
        ad: AssociatedData,
        ephemeral_public: &X25519PublicKey,
        role: Role,
    ) -> Self {
        Self {
            session_id: Self::derive_session_id(&ad, ephemeral_public),
            key,
            ad,
            role,
        }
    }

    /// SHA-256 over the associated data and the initiator's ephemeral key.
    ///
    /// Both parties compute the same id for the same handshake.
    fn derive_session_id(ad: &AssociatedData, ephemeral_public: &X25519PublicKey) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ad.as_bytes());
        hasher.update(ephemeral_public.as_bytes());

        let bytes = hasher.finalize();
        let engine = base64::engine::general_purpose::STANDARD;

        engine.encode(bytes)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn associated_data(&self) -> &AssociatedData {
        &self.ad
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    /// Encrypts a message for the peer.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SessionMessage, Error> {
        let (ciphertext, nonce) = aead_encrypt(&self.key, &self.ad, plaintext)?;
        Ok(SessionMessage { nonce, ciphertext })
    }

    /// Decrypts a message from the peer.
    pub fn decrypt(&self, message: &SessionMessage) -> Result<Vec<u8>, Error> {
        aead_decrypt(&self.key, &self.ad, &message.ciphertext, &message.nonce)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    fn session_pair() -> (Session, Session) {
        let initiator = KeyPair::generate().unwrap().public_key();
        let responder = KeyPair::generate().unwrap().public_key();
        let ephemeral = KeyPair::generate().unwrap().public_key();
        let key = [7u8; 32];

        let a = Session::new(
            SessionKey(Box::new(key)),
            AssociatedData::new(&initiator, &responder),
            &ephemeral,
            Role::Initiator,
        );
        let b = Session::new(
            SessionKey(Box::new(key)),
            AssociatedData::new(&initiator, &responder),
            &ephemeral,
            Role::Responder,
        );

        (a, b)
    }

    #[test]
    fn test_session_basic_communication() {
        let (alice, bob) = session_pair();

        let message = "Hello Bob, this is a secure message!";
        let encrypted = alice.encrypt(message.as_bytes()).unwrap();
        assert_eq!(encrypted.ciphertext.len(), message.len() + TAG_LENGTH);

        let decrypted = bob.decrypt(&encrypted).unwrap();
        assert_eq!(String::from_utf8(decrypted).unwrap(), message);

        let response = "Hello Alice, I received your message!";
        let encrypted = bob.encrypt(response.as_bytes()).unwrap();
        let decrypted = alice.decrypt(&encrypted).unwrap();
        assert_eq!(String::from_utf8(decrypted).unwrap(), response);
    }

    #[test]
    fn test_session_ids_match() {
        let (alice, bob) = session_pair();

        assert_eq!(alice.session_id(), bob.session_id());
        assert_eq!(alice.role(), Role::Initiator);
        assert_eq!(bob.role(), Role::Responder);
    }

    #[test]
    fn test_nonces_are_fresh() {
        let (alice, bob) = session_pair();

        let first = alice.encrypt(b"same").unwrap();
        let second = alice.encrypt(b"same").unwrap();

        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.ciphertext, second.ciphertext);
        assert_eq!(bob.decrypt(&first).unwrap(), b"same");
        assert_eq!(bob.decrypt(&second).unwrap(), b"same");
    }

    #[test]
    fn test_tampering_is_detected() {
        let (alice, bob) = session_pair();
        let message = alice.encrypt(b"tamper with me").unwrap();

        for i in 0..message.ciphertext.len() {
            let mut tampered = message.clone();
            tampered.ciphertext[i] ^= 0x01;
            assert_eq!(bob.decrypt(&tampered), Err(Error::Authentication));
        }

        for i in 0..NONCE_LENGTH {
            let mut tampered = message.clone();
            tampered.nonce[i] ^= 0x80;
            assert_eq!(bob.decrypt(&tampered), Err(Error::Authentication));
        }
    }

    #[test]
    fn test_wrong_associated_data_fails() {
        let (alice, _) = session_pair();
        let message = alice.encrypt(b"bound to identities").unwrap();

        let other = KeyPair::generate().unwrap().public_key();
        let wrong_ad = AssociatedData::new(&other, &other);

        assert_eq!(
            aead_decrypt(
                alice.session_key(),
                &wrong_ad,
                &message.ciphertext,
                &message.nonce
            ),
            Err(Error::Authentication)
        );
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let (alice, bob) = session_pair();
        let mut message = alice.encrypt(b"").unwrap();
        assert_eq!(message.ciphertext.len(), TAG_LENGTH);

        message.ciphertext.truncate(TAG_LENGTH - 1);
        assert_eq!(bob.decrypt(&message), Err(Error::Authentication));
    }

    #[test]
    fn test_associated_data_layout() {
        let initiator = KeyPair::generate().unwrap().public_key();
        let responder = KeyPair::generate().unwrap().public_key();
        let ad = AssociatedData::new(&initiator, &responder);

        assert_eq!(&ad.as_bytes()[..33], initiator.encode().as_bytes());
        assert_eq!(&ad.as_bytes()[33..], responder.encode().as_bytes());
        assert_ne!(ad, AssociatedData::new(&responder, &initiator));
    }

    #[test]
    fn test_debug_hides_key() {
        let (alice, _) = session_pair();

        assert_eq!(format!("{:?}", alice.session_key()), "SessionKey(..)");
    }
}
