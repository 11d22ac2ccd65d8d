#[macro_use]
extern crate afl;
use tryst::{DownloadedBundle, HandshakeMessage, PrekeyBundle};

fn main() {
    fuzz!(|data: &[u8]| {
        let _ = HandshakeMessage::from_bytes(data);
        let _ = PrekeyBundle::from_bytes(data);
        let _ = DownloadedBundle::from_bytes(data);
    });
}
