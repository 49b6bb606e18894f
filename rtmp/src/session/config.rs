use sml_amf0::Amf0Object;

/// Configuration options that govern how a client session operates
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Flash version string reported in the `connect` command
    pub flash_version: String,

    /// Optional swfUrl for the `connect` command
    pub swf_url: Option<String>,

    /// Optional pageUrl for the `connect` command
    pub page_url: Option<String>,

    /// Extra request object attached to the `connect` command, for servers
    /// expecting token-style arguments
    pub connect_args: Option<Amf0Object>,

    /// Buffer length requested from the server when playing
    pub playback_buffer_length_ms: u32,

    /// Window acknowledgement size announced to the server
    pub window_ack_size: u32,

    /// Outbound chunk size announced before streaming
    pub chunk_size: u32,

    /// Offer the digest (complex) handshake instead of the simple one.  The
    /// client still falls back to simple when the server does not sign its
    /// response.
    pub complex_handshake: bool,

    /// Socket receive timeout in milliseconds
    pub receive_timeout_ms: u64,

    /// Socket send timeout in milliseconds
    pub send_timeout_ms: u64,
}

impl SessionConfig {
    /// Creates a new configuration object with default values
    pub fn new() -> SessionConfig {
        SessionConfig {
            flash_version: "WIN 15,0,0,239".to_string(),
            swf_url: None,
            page_url: None,
            connect_args: None,
            playback_buffer_length_ms: 2_000,
            window_ack_size: 2_500_000,
            chunk_size: 4096,
            complex_handshake: false,
            receive_timeout_ms: 30_000,
            send_timeout_ms: 30_000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig::new()
    }
}
