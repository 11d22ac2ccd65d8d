mod bundle;
pub use bundle::*;
mod kdf;
pub use kdf::*;
mod message;
pub use message::*;

use crate::{
    AssociatedData, Error, IdentityKeys, KeyPair, OneTimePreKey, SessionKey, aead_decrypt,
    aead_encrypt,
};
use tracing::{debug, warn};

/// Everything the initiator walks away with.
pub struct InitiatorOutcome {
    /// To be delivered to the responder.
    pub message: HandshakeMessage,
    pub session_key: SessionKey,
    pub associated_data: AssociatedData,
}

/// Everything the responder walks away with.
pub struct ResponderOutcome {
    pub session_key: SessionKey,
    pub associated_data: AssociatedData,
    /// The decrypted first message.
    pub plaintext: Vec<u8>,
}

/// Implementation of the X3DH (Extended Triple Diffie-Hellman) key agreement protocol.
///
/// X3DH lets two parties establish a shared secret asynchronously, even if the
/// responder is offline. It combines four Diffie-Hellman exchanges:
/// - `DH(IKa, SPKb)` binds the initiator's identity
/// - `DH(EKa, IKb)` binds the responder's identity
/// - `DH(EKa, SPKb)` binds the responder's signed pre-key
/// - `DH(EKa, OPKb)` adds one-time forward secrecy
///
/// The pairing and order above must not change; both sides feed the outputs
/// to the KDF in exactly this order.
pub struct X3DH {
    kdf: KdfParams,
}

impl X3DH {
    /// Creates a new X3DH protocol instance with the specified KDF label.
    ///
    /// Different labels produce unrelated keys from the same key material.
    pub fn new(label: &str) -> Self {
        Self {
            kdf: KdfParams::new(label),
        }
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf
    }

    /// Runs the initiator's side against a verified bundle.
    ///
    /// 1. Generates an ephemeral key pair
    /// 2. Performs the four DH computations
    /// 3. Derives the session key
    /// 4. Builds the associated data and encrypts `first_message`
    pub fn initiate(
        &self,
        initiator: &IdentityKeys,
        bundle: &VerifiedBundle,
        first_message: &[u8],
    ) -> Result<InitiatorOutcome, Error> {
        let ephemeral = KeyPair::generate()?;
        let (one_time_key_id, one_time_public) = bundle.one_time_key();

        // DH1 = DH(IKa, SPKb)
        let dh1 = initiator.identity.dh(&bundle.signed_prekey_public())?;
        // DH2 = DH(EKa, IKb)
        let dh2 = ephemeral.dh(&bundle.identity_public())?;
        // DH3 = DH(EKa, SPKb)
        let dh3 = ephemeral.dh(&bundle.signed_prekey_public())?;
        // DH4 = DH(EKa, OPKb)
        let dh4 = ephemeral.dh(&one_time_public)?;

        let session_key = derive_session_key(
            &self.kdf,
            dh1.as_bytes(),
            dh2.as_bytes(),
            dh3.as_bytes(),
            dh4.as_bytes(),
            0,
        )?;

        let associated_data =
            AssociatedData::new(&initiator.identity_public(), &bundle.identity_public());

        let (ciphertext, nonce) = aead_encrypt(&session_key, &associated_data, first_message)?;

        debug!(one_time_key_id, "initiated X3DH handshake");

        Ok(InitiatorOutcome {
            message: HandshakeMessage {
                identity_public: initiator.identity_public(),
                ephemeral_public: ephemeral.public_key(),
                one_time_key_id,
                ciphertext,
                nonce,
            },
            session_key,
            associated_data,
        })
    }

    /// Runs the responder's side for a received handshake message.
    ///
    /// The referenced one-time pre-key is held under the pool lock for the
    /// whole attempt. It is consumed only if the handshake is accepted; a
    /// rejected message leaves it usable, so a forged message can neither
    /// burn it nor hide it from a concurrent legitimate handshake.
    pub fn respond(
        &self,
        responder: &IdentityKeys,
        message: &HandshakeMessage,
    ) -> Result<ResponderOutcome, Error> {
        let one_time_key_id = message.one_time_key_id;
        let result = responder
            .one_time_keys
            .consume_with(one_time_key_id, |one_time_key| {
                self.respond_with(responder, one_time_key, message)
            });

        match &result {
            Ok(_) => debug!(one_time_key_id, "accepted X3DH handshake"),
            Err(Error::UnknownOneTimeKey(_)) => {
                warn!(one_time_key_id, "handshake names unknown one-time pre-key")
            }
            Err(err) => warn!(one_time_key_id, error = %err, "rejected X3DH handshake"),
        }

        result
    }

    fn respond_with(
        &self,
        responder: &IdentityKeys,
        one_time_key: &OneTimePreKey,
        message: &HandshakeMessage,
    ) -> Result<ResponderOutcome, Error> {
        // DH1 = DH(SPKb, IKa)
        let dh1 = responder.signed_prekey.dh(&message.identity_public)?;
        // DH2 = DH(IKb, EKa)
        let dh2 = responder.identity.dh(&message.ephemeral_public)?;
        // DH3 = DH(SPKb, EKa)
        let dh3 = responder.signed_prekey.dh(&message.ephemeral_public)?;
        // DH4 = DH(OPKb, EKa)
        let dh4 = one_time_key.dh(&message.ephemeral_public)?;

        let session_key = derive_session_key(
            &self.kdf,
            dh1.as_bytes(),
            dh2.as_bytes(),
            dh3.as_bytes(),
            dh4.as_bytes(),
            0,
        )?;

        let associated_data =
            AssociatedData::new(&message.identity_public, &responder.identity_public());

        let plaintext = aead_decrypt(
            &session_key,
            &associated_data,
            &message.ciphertext,
            &message.nonce,
        )?;

        Ok(ResponderOutcome {
            session_key,
            associated_data,
            plaintext,
        })
    }
}
