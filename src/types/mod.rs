mod encoding;
pub use encoding::*;

mod x25519;
pub(crate) use x25519::{X25519Secret, generate_random_seed};
pub use x25519::X25519PublicKey;
