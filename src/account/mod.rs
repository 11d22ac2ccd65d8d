mod config;
pub use config::*;

use crate::{
    DownloadedBundle, Error, HandshakeMessage, IdentityKeys, PrekeyBundle, Role, Session, X3DH,
    X25519PublicKey, init_identity, verify_bundle,
};
use tracing::{debug, warn};

/// One party of the protocol.
///
/// Owns the party's key material and turns bundles and handshake messages
/// into [`Session`]s. `respond` takes `&self`, so an `Account` can be shared
/// between threads; the one-time pre-key pool serializes access to each key.
pub struct Account {
    keys: IdentityKeys,
    x3dh: X3DH,
    config: AccountConfig,
}

impl Account {
    /// Creates a new account with the given configuration.
    ///
    /// If no configuration is provided, default values are used.
    pub fn new(config: Option<AccountConfig>) -> Result<Self, Error> {
        let config = config.unwrap_or_default();
        let keys = init_identity(&config)?;
        let x3dh = X3DH::new(&config.protocol_label);

        debug!(
            one_time_keys = config.one_time_keys,
            label = %config.protocol_label,
            "created account"
        );

        Ok(Self { keys, x3dh, config })
    }

    /// Returns the configuration for this account.
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    #[inline]
    pub fn identity_public(&self) -> X25519PublicKey {
        self.keys.identity_public()
    }

    /// Returns the bundle to publish: every public value plus all one-time
    /// pre-keys not yet consumed.
    pub fn prekey_bundle(&self) -> PrekeyBundle {
        self.keys.prekey_bundle()
    }

    pub fn one_time_keys_remaining(&self) -> usize {
        self.keys.one_time_keys().len()
    }

    /// Starts a session with the owner of `bundle`, sending the configured
    /// initial message.
    pub fn initiate(&self, bundle: DownloadedBundle) -> Result<(Session, HandshakeMessage), Error> {
        self.initiate_with(bundle, &self.config.initial_message)
    }

    /// Starts a session with the owner of `bundle`, sending `first_message`
    /// inside the handshake.
    ///
    /// The bundle signature is verified before any key agreement runs.
    pub fn initiate_with(
        &self,
        bundle: DownloadedBundle,
        first_message: &[u8],
    ) -> Result<(Session, HandshakeMessage), Error> {
        let bundle = verify_bundle(bundle).inspect_err(|_| {
            warn!("rejected pre-key bundle with invalid signature");
        })?;

        let outcome = self.x3dh.initiate(&self.keys, &bundle, first_message)?;
        let session = Session::new(
            outcome.session_key,
            outcome.associated_data,
            &outcome.message.ephemeral_public,
            Role::Initiator,
        );

        debug!(session_id = session.session_id(), "established outbound session");

        Ok((session, outcome.message))
    }

    /// Accepts a handshake, returning the new session and the decrypted first
    /// message.
    pub fn respond(&self, message: &HandshakeMessage) -> Result<(Session, Vec<u8>), Error> {
        let outcome = self.x3dh.respond(&self.keys, message)?;
        let session = Session::new(
            outcome.session_key,
            outcome.associated_data,
            &message.ephemeral_public,
            Role::Responder,
        );

        debug!(session_id = session.session_id(), "established inbound session");

        Ok((session, outcome.plaintext))
    }
}
