/// Per-party settings.
#[derive(Clone, Debug)]
pub struct AccountConfig {
    /// Label used in the HKDF info string `"<label> key<N>"`.
    pub protocol_label: String,
    /// Number of one-time pre-keys generated at initialization.
    pub one_time_keys: u32,
    /// Plaintext of the first message carried inside a handshake.
    pub initial_message: Vec<u8>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            protocol_label: "MyProtocol".to_string(),
            one_time_keys: 100,
            initial_message: b"Initial message".to_vec(),
        }
    }
}
