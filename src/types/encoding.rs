//! RFC 7748 u-coordinate encoding and the tagged public-key form built on it.

use crate::X25519PublicKey;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Curve-type byte prefixed to every encoded X25519 key (ASCII `'1'`).
pub const X25519_CURVE_TAG: u8 = b'1';

/// Length of an [`EncodedPublicKey`].
pub const ENCODED_PUBLIC_KEY_LENGTH: usize = 33;

// Bit length of an X25519 u-coordinate.
const BITS: u32 = 255;

// p = 2^255 - 19 as little-endian limbs.
const P: [u64; 4] = [
    0xffff_ffff_ffff_ffed,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0x7fff_ffff_ffff_ffff,
];

/// An unsigned 256-bit integer holding a u-coordinate, stored as
/// little-endian 64-bit limbs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UCoordinate([u64; 4]);

impl UCoordinate {
    pub fn from_limbs(limbs: [u64; 4]) -> Self {
        Self(limbs)
    }

    pub fn limbs(&self) -> [u64; 4] {
        self.0
    }

    /// Returns this value reduced modulo p.
    pub fn reduce(&self) -> Self {
        let mut value = self.0;
        // At most two subtractions, since 2^256 < 3p.
        while let Some(reduced) = sub_p(&value) {
            value = reduced;
        }
        Self(value)
    }
}

/// `value - p`, or `None` if `value < p`.
fn sub_p(value: &[u64; 4]) -> Option<[u64; 4]> {
    let mut out = [0u64; 4];
    let mut borrow = false;

    for (i, limb) in out.iter_mut().enumerate() {
        let (diff, b1) = value[i].overflowing_sub(P[i]);
        let (diff, b2) = diff.overflowing_sub(u64::from(borrow));
        *limb = diff;
        borrow = b1 || b2;
    }

    if borrow { None } else { Some(out) }
}

/// `decodeUCoordinate` from RFC 7748: little-endian, unused high bits masked.
pub fn decode_u_coordinate(bytes: &[u8; 32]) -> UCoordinate {
    let mut masked = *bytes;
    if BITS % 8 != 0 {
        masked[31] &= (1u8 << (BITS % 8)) - 1;
    }

    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().zip(masked.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }

    UCoordinate(limbs)
}

/// `encodeUCoordinate` from RFC 7748: reduce mod p, then write little-endian.
pub fn encode_u_coordinate(u: &UCoordinate) -> [u8; 32] {
    let reduced = u.reduce();

    let mut bytes = [0u8; 32];
    for (chunk, limb) in bytes.chunks_exact_mut(8).zip(reduced.0.iter()) {
        chunk.copy_from_slice(&limb.to_le_bytes());
    }

    bytes
}

/// `Encode(PK)`: the curve tag followed by the canonical little-endian
/// u-coordinate. This is what gets signed and what forms associated data.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EncodedPublicKey([u8; ENCODED_PUBLIC_KEY_LENGTH]);

impl EncodedPublicKey {
    pub fn encode(public_key: &X25519PublicKey) -> Self {
        let u = decode_u_coordinate(public_key.as_bytes());

        let mut bytes = [0u8; ENCODED_PUBLIC_KEY_LENGTH];
        bytes[0] = X25519_CURVE_TAG;
        bytes[1..].copy_from_slice(&encode_u_coordinate(&u));

        Self(bytes)
    }

    pub fn curve_tag(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8; ENCODED_PUBLIC_KEY_LENGTH] {
        &self.0
    }
}

impl AsRef<[u8]> for EncodedPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EncodedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncodedPublicKey")
            .field(&STANDARD.encode(self.0))
            .finish()
    }
}
