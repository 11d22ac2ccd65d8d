use crate::{Error, X25519PublicKey};
use ed25519_dalek::{Signature, VerifyingKey};

/// The pre-key material a responder publishes.
///
/// Contains everything another party needs to start a session
/// asynchronously, and nothing secret:
/// - identity key for key agreement
/// - verification key for the signed pre-key signature
/// - signed pre-key and its signature
/// - every unused one-time pre-key, in id order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrekeyBundle {
    pub identity_public: X25519PublicKey,
    pub verifying_key: VerifyingKey,
    pub signed_prekey_public: X25519PublicKey,
    pub signed_prekey_signature: Signature,
    pub one_time_keys: Vec<(u32, X25519PublicKey)>,
}

impl PrekeyBundle {
    /// Verifies the signed pre-key signature.
    pub fn verify(&self) -> Result<(), Error> {
        verify_signed_prekey(
            &self.verifying_key,
            &self.signed_prekey_public,
            &self.signed_prekey_signature,
        )
    }

    /// Narrows the bundle to the fixed fields plus the one-time key `opk_id`.
    pub fn select(&self, opk_id: u32) -> Option<DownloadedBundle> {
        let (id, key) = self
            .one_time_keys
            .iter()
            .find(|(id, _)| *id == opk_id)
            .copied()?;

        Some(DownloadedBundle {
            identity_public: self.identity_public,
            verifying_key: self.verifying_key,
            signed_prekey_public: self.signed_prekey_public,
            signed_prekey_signature: self.signed_prekey_signature,
            one_time_key: (id, key),
        })
    }
}

/// What an initiator receives from the bundle store: the fixed bundle fields
/// plus exactly one one-time pre-key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedBundle {
    pub identity_public: X25519PublicKey,
    pub verifying_key: VerifyingKey,
    pub signed_prekey_public: X25519PublicKey,
    pub signed_prekey_signature: Signature,
    pub one_time_key: (u32, X25519PublicKey),
}

/// A [`DownloadedBundle`] whose signature has been checked.
///
/// Only [`verify_bundle`] constructs one, so holding a `VerifiedBundle` is
/// proof that verification ran before any key agreement.
#[derive(Clone, Debug)]
pub struct VerifiedBundle(DownloadedBundle);

impl VerifiedBundle {
    #[inline]
    pub fn identity_public(&self) -> X25519PublicKey {
        self.0.identity_public
    }

    #[inline]
    pub fn signed_prekey_public(&self) -> X25519PublicKey {
        self.0.signed_prekey_public
    }

    #[inline]
    pub fn one_time_key(&self) -> (u32, X25519PublicKey) {
        self.0.one_time_key
    }

    pub fn into_inner(self) -> DownloadedBundle {
        self.0
    }
}

/// Recomputes `Encode(SPK)` and checks the signature with the bundle's
/// verification key.
pub fn verify_bundle(bundle: DownloadedBundle) -> Result<VerifiedBundle, Error> {
    verify_signed_prekey(
        &bundle.verifying_key,
        &bundle.signed_prekey_public,
        &bundle.signed_prekey_signature,
    )?;

    Ok(VerifiedBundle(bundle))
}

fn verify_signed_prekey(
    verifying_key: &VerifyingKey,
    signed_prekey: &X25519PublicKey,
    signature: &Signature,
) -> Result<(), Error> {
    let encoded = signed_prekey.encode();
    verifying_key
        .verify_strict(encoded.as_ref(), signature)
        .map_err(|_| Error::Signature)
}
