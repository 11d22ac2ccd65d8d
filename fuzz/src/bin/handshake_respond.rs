#[macro_use]
extern crate afl;
use tryst::{Account, AccountConfig, HandshakeMessage};

fn main() {
    // The victim keeps one one-time pre-key; a forged message must never burn it.
    let bob = Account::new(Some(AccountConfig {
        one_time_keys: 1,
        ..AccountConfig::default()
    }))
    .expect("Setup failed");

    fuzz!(|data: &[u8]| {
        if let Ok(message) = HandshakeMessage::from_bytes(data) {
            let _ = bob.respond(&message);
        }
    });
}
