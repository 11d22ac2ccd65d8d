use crate::{EncodedPublicKey, Error};
use rand::TryRngCore;
use rand::rngs::OsRng;
use subtle::{Choice, ConstantTimeEq};
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Canonical encodings of the points of order 1, 2, 4 and 8 on Curve25519,
/// plus their non-canonical aliases below 2^255. Bit 255 is ignored.
const LOW_ORDER_POINTS: [[u8; 32]; 7] = [
    [0; 32],
    [
        0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0,
    ],
    [
        0xe0, 0xeb, 0x7a, 0x7c, 0x3b, 0x41, 0xb8, 0xae, 0x16, 0x56, 0xe3, 0xfa, 0xf1, 0x9f, 0xc4,
        0x6a, 0xda, 0x09, 0x8d, 0xeb, 0x9c, 0x32, 0xb1, 0xfd, 0x86, 0x62, 0x05, 0x16, 0x5f, 0x49,
        0xb8, 0x00,
    ],
    [
        0x5f, 0x9c, 0x95, 0xbc, 0xa3, 0x50, 0x8c, 0x24, 0xb1, 0xd0, 0xb1, 0x55, 0x9c, 0x83, 0xef,
        0x5b, 0x04, 0x44, 0x5c, 0xc4, 0x58, 0x1c, 0x8e, 0x86, 0xd8, 0x22, 0x4e, 0xdd, 0xd0, 0x9f,
        0x11, 0x57,
    ],
    // p - 1
    [
        0xec, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p
    [
        0xed, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
    // p + 1
    [
        0xee, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xff, 0x7f,
    ],
];

/// Fills a fresh boxed 32-byte seed from the OS random number generator.
pub(crate) fn generate_random_seed() -> Result<Box<[u8; 32]>, Error> {
    let mut seed = Box::new([0u8; 32]);
    OsRng
        .try_fill_bytes(seed.as_mut_slice())
        .map_err(|_| Error::Random)?;
    Ok(seed)
}

/// An X25519 public key (a Montgomery u-coordinate).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct X25519PublicKey(PublicKey);

impl X25519PublicKey {
    /// Parses a public key received from another party.
    ///
    /// Rejects the identity and every other low-order point with
    /// [`Error::InvalidPoint`].
    pub fn try_from_bytes(bytes: [u8; 32]) -> Result<Self, Error> {
        let key = Self::from(bytes);
        if key.is_low_order() {
            return Err(Error::InvalidPoint);
        }
        Ok(key)
    }

    /// Returns `true` if this key is one of the small-order points.
    pub fn is_low_order(&self) -> bool {
        let mut masked = self.to_bytes();
        masked[31] &= 0x7f;

        let mut found = Choice::from(0u8);
        for point in LOW_ORDER_POINTS.iter() {
            found |= masked[..].ct_eq(&point[..]);
        }

        found.into()
    }

    /// Returns the 33-byte tagged encoding used for signatures and associated data.
    pub fn encode(&self) -> EncodedPublicKey {
        EncodedPublicKey::encode(self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }
}

impl From<[u8; 32]> for X25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(value: PublicKey) -> Self {
        Self(value)
    }
}

impl AsRef<PublicKey> for X25519PublicKey {
    fn as_ref(&self) -> &PublicKey {
        &self.0
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct X25519Secret(Box<StaticSecret>);

impl X25519Secret {
    pub(crate) fn generate() -> Result<Self, Error> {
        Ok(Self::from(generate_random_seed()?))
    }

    /// Scalar multiplication with a peer's public key.
    ///
    /// Low-order inputs are refused before the multiplication runs; an all-zero
    /// output is refused afterwards.
    pub(crate) fn diffie_hellman(
        &self,
        public_key: &X25519PublicKey,
    ) -> Result<SharedSecret, Error> {
        if public_key.is_low_order() {
            return Err(Error::InvalidPoint);
        }

        let shared = self.0.diffie_hellman(public_key.as_ref());
        if !shared.was_contributory() {
            return Err(Error::InvalidPoint);
        }

        Ok(shared)
    }

    pub(crate) fn public_key(&self) -> X25519PublicKey {
        let pub_key = PublicKey::from(self.0.as_ref());
        pub_key.into()
    }
}

impl From<Box<[u8; 32]>> for X25519Secret {
    fn from(mut bytes: Box<[u8; 32]>) -> Self {
        let secret = StaticSecret::from(*bytes);
        bytes.zeroize();
        Self(Box::new(secret))
    }
}
