use crate::{Error, SessionKey};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

/// Length of the derived session key.
pub const SESSION_KEY_LENGTH: usize = 32;

// Domain-separation prefix F for X25519.
const KDF_PREFIX: [u8; 32] = [0xff; 32];

/// Hash function used by the KDF.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
}

/// Fixed HKDF parameters: salt, info, output length and hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KdfParams {
    salt: [u8; 32],
    label: String,
}

impl KdfParams {
    /// Parameters with a 32-byte all-zero salt and the given info label.
    pub fn new(label: &str) -> Self {
        Self {
            salt: [0u8; 32],
            label: label.to_string(),
        }
    }

    pub fn salt(&self) -> &[u8; 32] {
        &self.salt
    }

    /// The info string for the `counter`-th key: `"<label> key<counter + 1>"`.
    pub fn info(&self, counter: u32) -> String {
        format!("{} key{}", self.label, u64::from(counter) + 1)
    }

    pub fn length(&self) -> usize {
        SESSION_KEY_LENGTH
    }

    pub fn hash(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

/// Combines the four X3DH DH outputs into a session key.
///
/// IKM is `0xFF * 32 || dh1 || dh2 || dh3 || dh4`, run through HKDF-SHA256
/// extract-then-expand. The order of the DH outputs is fixed:
/// `DH(IKa, SPKb)`, `DH(EKa, IKb)`, `DH(EKa, SPKb)`, `DH(EKa, OPKb)`.
pub fn derive_session_key(
    params: &KdfParams,
    dh1: &[u8; 32],
    dh2: &[u8; 32],
    dh3: &[u8; 32],
    dh4: &[u8; 32],
    counter: u32,
) -> Result<SessionKey, Error> {
    let mut key_material = Box::new([0u8; 160]);
    key_material[0..32].copy_from_slice(&KDF_PREFIX);
    key_material[32..64].copy_from_slice(dh1);
    key_material[64..96].copy_from_slice(dh2);
    key_material[96..128].copy_from_slice(dh3);
    key_material[128..160].copy_from_slice(dh4);

    let hkdf = Hkdf::<Sha256>::new(Some(params.salt()), key_material.as_slice());
    key_material.zeroize();

    let mut session_key = Box::new([0u8; SESSION_KEY_LENGTH]);
    hkdf.expand(params.info(counter).as_bytes(), session_key.as_mut_slice())
        .map_err(|_| Error::Kdf)?;

    Ok(SessionKey(session_key))
}
