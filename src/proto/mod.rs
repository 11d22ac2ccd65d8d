//! Protocol Buffers wire format for everything that crosses the network:
//! published bundles, downloaded bundles and handshake messages.
//!
//! Decoding validates every field. Low-order public keys are rejected with
//! [`Error::InvalidPoint`]; any other malformation is [`Error::Serde`].

use crate::{
    DownloadedBundle, Error, HandshakeMessage, NONCE_LENGTH, PrekeyBundle, TAG_LENGTH,
    X25519PublicKey,
};
use ed25519_dalek::{SIGNATURE_LENGTH, Signature, VerifyingKey};
use prost::Message;
use std::collections::BTreeSet;

/// Current schema version written into every message.
const WIRE_VERSION: u32 = 1;

#[derive(Clone, PartialEq, Message)]
struct OneTimeKeyProto {
    #[prost(uint32, tag = "1")]
    id: u32,
    #[prost(bytes = "vec", tag = "2")]
    public_key: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
struct PrekeyBundleProto {
    #[prost(bytes = "vec", tag = "1")]
    identity_public: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    verifying_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    signed_prekey_public: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    signed_prekey_signature: Vec<u8>,
    #[prost(message, repeated, tag = "5")]
    one_time_keys: Vec<OneTimeKeyProto>,
    #[prost(uint32, tag = "6")]
    version: u32,
}

#[derive(Clone, PartialEq, Message)]
struct DownloadedBundleProto {
    #[prost(bytes = "vec", tag = "1")]
    identity_public: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    verifying_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    signed_prekey_public: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    signed_prekey_signature: Vec<u8>,
    #[prost(message, optional, tag = "5")]
    one_time_key: Option<OneTimeKeyProto>,
    #[prost(uint32, tag = "6")]
    version: u32,
}

#[derive(Clone, PartialEq, Message)]
struct HandshakeMessageProto {
    #[prost(bytes = "vec", tag = "1")]
    identity_public: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    ephemeral_public: Vec<u8>,
    #[prost(uint32, tag = "3")]
    one_time_key_id: u32,
    #[prost(bytes = "vec", tag = "4")]
    ciphertext: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    nonce: Vec<u8>,
    #[prost(uint32, tag = "6")]
    version: u32,
}

fn check_version(version: u32) -> Result<(), Error> {
    if version != WIRE_VERSION {
        return Err(Error::Serde(format!(
            "Unsupported schema version: {}",
            version
        )));
    }
    Ok(())
}

fn public_key_from(bytes: &[u8], field: &str) -> Result<X25519PublicKey, Error> {
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Serde(format!("Invalid {} length", field)))?;
    X25519PublicKey::try_from_bytes(bytes)
}

fn verifying_key_from(bytes: &[u8]) -> Result<VerifyingKey, Error> {
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Serde("Invalid verifying key length".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| Error::Serde("Invalid verifying key".to_string()))
}

fn signature_from(bytes: &[u8]) -> Result<Signature, Error> {
    let bytes: [u8; SIGNATURE_LENGTH] = bytes
        .try_into()
        .map_err(|_| Error::Serde("Invalid signature length".to_string()))?;
    Ok(Signature::from_bytes(&bytes))
}

impl From<&(u32, X25519PublicKey)> for OneTimeKeyProto {
    fn from((id, key): &(u32, X25519PublicKey)) -> Self {
        Self {
            id: *id,
            public_key: key.to_bytes().to_vec(),
        }
    }
}

fn one_time_key_from(proto: &OneTimeKeyProto) -> Result<(u32, X25519PublicKey), Error> {
    Ok((
        proto.id,
        public_key_from(&proto.public_key, "one-time pre-key")?,
    ))
}

impl PrekeyBundle {
    /// Serialize the bundle for upload.
    pub fn to_bytes(&self) -> Vec<u8> {
        PrekeyBundleProto {
            identity_public: self.identity_public.to_bytes().to_vec(),
            verifying_key: self.verifying_key.to_bytes().to_vec(),
            signed_prekey_public: self.signed_prekey_public.to_bytes().to_vec(),
            signed_prekey_signature: self.signed_prekey_signature.to_bytes().to_vec(),
            one_time_keys: self.one_time_keys.iter().map(OneTimeKeyProto::from).collect(),
            version: WIRE_VERSION,
        }
        .encode_to_vec()
    }

    /// Deserialize a bundle. The signature is not checked here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto = PrekeyBundleProto::decode(bytes)?;
        check_version(proto.version)?;

        let mut seen = BTreeSet::new();
        let mut one_time_keys = Vec::with_capacity(proto.one_time_keys.len());
        for key in proto.one_time_keys.iter() {
            if !seen.insert(key.id) {
                return Err(Error::Serde(format!(
                    "Duplicate one-time pre-key id: {}",
                    key.id
                )));
            }
            one_time_keys.push(one_time_key_from(key)?);
        }

        Ok(Self {
            identity_public: public_key_from(&proto.identity_public, "identity key")?,
            verifying_key: verifying_key_from(&proto.verifying_key)?,
            signed_prekey_public: public_key_from(&proto.signed_prekey_public, "signed pre-key")?,
            signed_prekey_signature: signature_from(&proto.signed_prekey_signature)?,
            one_time_keys,
        })
    }
}

impl DownloadedBundle {
    pub fn to_bytes(&self) -> Vec<u8> {
        DownloadedBundleProto {
            identity_public: self.identity_public.to_bytes().to_vec(),
            verifying_key: self.verifying_key.to_bytes().to_vec(),
            signed_prekey_public: self.signed_prekey_public.to_bytes().to_vec(),
            signed_prekey_signature: self.signed_prekey_signature.to_bytes().to_vec(),
            one_time_key: Some(OneTimeKeyProto::from(&self.one_time_key)),
            version: WIRE_VERSION,
        }
        .encode_to_vec()
    }

    /// Deserialize a downloaded bundle. Pass the result to
    /// [`crate::verify_bundle`] before using it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto = DownloadedBundleProto::decode(bytes)?;
        check_version(proto.version)?;

        let one_time_key = match proto.one_time_key.as_ref() {
            Some(key) => one_time_key_from(key)?,
            None => return Err(Error::Serde("Missing one-time pre-key".to_string())),
        };

        Ok(Self {
            identity_public: public_key_from(&proto.identity_public, "identity key")?,
            verifying_key: verifying_key_from(&proto.verifying_key)?,
            signed_prekey_public: public_key_from(&proto.signed_prekey_public, "signed pre-key")?,
            signed_prekey_signature: signature_from(&proto.signed_prekey_signature)?,
            one_time_key,
        })
    }
}

impl HandshakeMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        HandshakeMessageProto {
            identity_public: self.identity_public.to_bytes().to_vec(),
            ephemeral_public: self.ephemeral_public.to_bytes().to_vec(),
            one_time_key_id: self.one_time_key_id,
            ciphertext: self.ciphertext.clone(),
            nonce: self.nonce.to_vec(),
            version: WIRE_VERSION,
        }
        .encode_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let proto = HandshakeMessageProto::decode(bytes)?;
        check_version(proto.version)?;

        if proto.ciphertext.len() < TAG_LENGTH {
            return Err(Error::Serde("Ciphertext shorter than tag".to_string()));
        }

        let nonce: [u8; NONCE_LENGTH] = proto
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| Error::Serde("Invalid nonce length".to_string()))?;

        Ok(Self {
            identity_public: public_key_from(&proto.identity_public, "identity key")?,
            ephemeral_public: public_key_from(&proto.ephemeral_public, "ephemeral key")?,
            one_time_key_id: proto.one_time_key_id,
            ciphertext: proto.ciphertext,
            nonce,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccountConfig, X3DH, init_identity, verify_bundle};

    fn bundle() -> PrekeyBundle {
        let config = AccountConfig {
            one_time_keys: 3,
            ..AccountConfig::default()
        };
        init_identity(&config).unwrap().prekey_bundle()
    }

    fn handshake() -> HandshakeMessage {
        let config = AccountConfig {
            one_time_keys: 1,
            ..AccountConfig::default()
        };
        let alice = init_identity(&config).unwrap();
        let bob = init_identity(&config).unwrap();
        let verified = verify_bundle(bob.prekey_bundle().select(0).unwrap()).unwrap();

        X3DH::new("Tryst")
            .initiate(&alice, &verified, b"Initial message")
            .unwrap()
            .message
    }

    #[test]
    fn test_prekey_bundle_survives_the_wire() {
        let bundle = bundle();
        let decoded = PrekeyBundle::from_bytes(&bundle.to_bytes()).unwrap();

        assert_eq!(decoded, bundle);
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn test_downloaded_bundle_survives_the_wire() {
        let downloaded = bundle().select(2).unwrap();
        let decoded = DownloadedBundle::from_bytes(&downloaded.to_bytes()).unwrap();

        assert_eq!(decoded, downloaded);
        assert!(verify_bundle(decoded).is_ok());
    }

    #[test]
    fn test_handshake_message_survives_the_wire() {
        let message = handshake();
        let decoded = HandshakeMessage::from_bytes(&message.to_bytes()).unwrap();

        assert_eq!(decoded, message);
    }

    #[test]
    fn test_wrong_key_length_is_rejected() {
        let mut proto = HandshakeMessageProto::decode(handshake().to_bytes().as_slice()).unwrap();
        proto.ephemeral_public.pop();

        assert!(matches!(
            HandshakeMessage::from_bytes(&proto.encode_to_vec()),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_wrong_nonce_length_is_rejected() {
        let mut proto = HandshakeMessageProto::decode(handshake().to_bytes().as_slice()).unwrap();
        proto.nonce.truncate(12);

        assert!(matches!(
            HandshakeMessage::from_bytes(&proto.encode_to_vec()),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_short_ciphertext_is_rejected() {
        let mut proto = HandshakeMessageProto::decode(handshake().to_bytes().as_slice()).unwrap();
        proto.ciphertext.truncate(TAG_LENGTH - 1);

        assert!(matches!(
            HandshakeMessage::from_bytes(&proto.encode_to_vec()),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_low_order_key_is_rejected() {
        let mut proto = HandshakeMessageProto::decode(handshake().to_bytes().as_slice()).unwrap();
        proto.ephemeral_public = vec![0u8; 32];

        assert_eq!(
            HandshakeMessage::from_bytes(&proto.encode_to_vec()).err(),
            Some(Error::InvalidPoint)
        );

        let mut proto = PrekeyBundleProto::decode(bundle().to_bytes().as_slice()).unwrap();
        proto.signed_prekey_public = vec![0u8; 32];
        proto.signed_prekey_public[0] = 1;

        assert_eq!(
            PrekeyBundle::from_bytes(&proto.encode_to_vec()).err(),
            Some(Error::InvalidPoint)
        );
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut proto = HandshakeMessageProto::decode(handshake().to_bytes().as_slice()).unwrap();
        proto.version = 2;

        assert!(matches!(
            HandshakeMessage::from_bytes(&proto.encode_to_vec()),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_duplicate_one_time_key_ids_are_rejected() {
        let mut proto = PrekeyBundleProto::decode(bundle().to_bytes().as_slice()).unwrap();
        proto.one_time_keys[1].id = proto.one_time_keys[0].id;

        assert!(matches!(
            PrekeyBundle::from_bytes(&proto.encode_to_vec()),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_missing_one_time_key_is_rejected() {
        let mut proto =
            DownloadedBundleProto::decode(bundle().select(0).unwrap().to_bytes().as_slice())
                .unwrap();
        proto.one_time_key = None;

        assert!(matches!(
            DownloadedBundle::from_bytes(&proto.encode_to_vec()),
            Err(Error::Serde(_))
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(HandshakeMessage::from_bytes(&[0xff, 0xff, 0xff]).is_err());
        assert!(PrekeyBundle::from_bytes(&[]).is_err());
    }
}
