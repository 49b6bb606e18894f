/// Externally observable lifecycle of a client session
#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    /// The url has been parsed but nothing touched the network yet
    Created,

    /// The host name resolved to at least one address
    Resolved,

    /// The TCP connection is established
    Connected,

    /// The RTMP handshake completed
    Handshaked,

    /// The `connect` command was accepted by the server
    AppConnected,

    /// A `play` was issued and media is expected to flow inbound
    Playing { stream: String },

    /// A `publish` was accepted and media is expected to flow outbound
    Publishing { stream: String },

    /// The session is unusable; a fresh one must be created
    Closed,
}
