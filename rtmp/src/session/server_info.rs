use sml_amf0::{Amf0Object, Amf0Value};

/// Identity details some servers attach to the `connect` response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerInfo {
    pub ip: String,
    pub sig: String,
    pub pid: u32,
    pub cid: u32,
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
    pub build: u32,
}

impl ServerInfo {
    /// Pulls the optional `data` array out of a `connect` `_result`
    /// information object.  Unknown or missing fields stay at their defaults;
    /// nothing here is an error.
    pub fn from_connect_information(information: &Amf0Object) -> ServerInfo {
        let mut server_info = ServerInfo::default();

        let data = match information.get("data") {
            Some(Amf0Value::EcmaArray(properties)) => properties,
            Some(Amf0Value::Object(properties)) => properties,
            _ => return server_info,
        };

        if let Some(Amf0Value::Utf8String(ip)) = data.get("srs_server_ip") {
            server_info.ip = ip.clone();
        }

        if let Some(Amf0Value::Utf8String(sig)) = data.get("srs_sig") {
            server_info.sig = sig.clone();
        }

        if let Some(Amf0Value::Number(pid)) = data.get("srs_pid") {
            server_info.pid = *pid as u32;
        }

        if let Some(Amf0Value::Number(cid)) = data.get("srs_id") {
            server_info.cid = *cid as u32;
        }

        if let Some(Amf0Value::Utf8String(version)) = data.get("srs_version") {
            let mut parts = version.split('.').map(|part| part.parse::<u32>().unwrap_or(0));
            server_info.major = parts.next().unwrap_or(0);
            server_info.minor = parts.next().unwrap_or(0);
            server_info.revision = parts.next().unwrap_or(0);
            server_info.build = parts.next().unwrap_or(0);
        }

        server_info
    }
}
