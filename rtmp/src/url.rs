//! RTMP URL decomposition.
//!
//! An RTMP URL has the shape `rtmp://host[:port]/app[/...]/stream[?query]`.
//! The app may span several path segments; the stream is always the last
//! segment.  A `vhost=` query parameter overrides the host in the tcUrl that
//! gets sent in the `connect` command, which is how multi-tenant servers are
//! addressed through a shared edge.

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 1935;

#[derive(Debug, Error, PartialEq)]
pub enum UrlParseError {
    #[error("Url '{url}' does not use the rtmp:// schema")]
    NotRtmpSchema { url: String },

    #[error("Url '{url}' is missing an app or stream portion")]
    MissingPath { url: String },

    #[error("Url '{url}' has an unparseable port")]
    InvalidPort { url: String },
}

/// The decomposed form of an RTMP URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpUrl {
    /// The original url this was parsed from
    pub url: String,
    /// The host to open the TCP connection to
    pub host: String,
    /// Host override used for the connect command; equals `host` unless a
    /// `vhost=` query parameter was present
    pub vhost: String,
    pub port: u16,
    pub app: String,
    pub stream: String,
    /// Raw query string (without the `?`), empty when absent
    pub param: String,
}

impl RtmpUrl {
    pub fn parse(url: &str) -> Result<RtmpUrl, UrlParseError> {
        const SCHEMA: &str = "rtmp://";

        if !url.starts_with(SCHEMA) {
            return Err(UrlParseError::NotRtmpSchema {
                url: url.to_string(),
            });
        }

        let rest = &url[SCHEMA.len()..];
        let (authority, full_path) = match rest.find('/') {
            Some(index) => (&rest[..index], &rest[index + 1..]),
            None => {
                return Err(UrlParseError::MissingPath {
                    url: url.to_string(),
                })
            }
        };

        let (host, port) = match authority.rfind(':') {
            Some(index) => {
                let port = authority[index + 1..]
                    .parse::<u16>()
                    .map_err(|_| UrlParseError::InvalidPort {
                        url: url.to_string(),
                    })?;
                (&authority[..index], port)
            }
            None => (authority, DEFAULT_PORT),
        };

        let (path, param) = match full_path.find('?') {
            Some(index) => (&full_path[..index], &full_path[index + 1..]),
            None => (full_path, ""),
        };

        let (app, stream) = match path.rfind('/') {
            Some(index) if index > 0 && index + 1 < path.len() => {
                (&path[..index], &path[index + 1..])
            }
            _ => {
                return Err(UrlParseError::MissingPath {
                    url: url.to_string(),
                })
            }
        };

        let vhost = query_parameter(param, "vhost")
            .unwrap_or(host)
            .to_string();

        Ok(RtmpUrl {
            url: url.to_string(),
            host: host.to_string(),
            vhost,
            port,
            app: app.to_string(),
            stream: stream.to_string(),
            param: param.to_string(),
        })
    }

    /// The tcUrl value to place in the `connect` command object.  Uses the
    /// vhost when one was requested.
    pub fn tc_url(&self) -> String {
        format!("rtmp://{}:{}/{}", self.vhost, self.port, self.app)
    }

    /// The stream name used for play/publish.  Any query parameters from the
    /// original url are re-attached so the server sees them.
    pub fn stream_with_query(&self) -> String {
        if self.param.is_empty() {
            self.stream.clone()
        } else {
            format!("{}?{}", self.stream, self.param)
        }
    }
}

fn query_parameter<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(name) {
            return parts.next().filter(|value| !value.is_empty());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_url_with_default_port() {
        let url = RtmpUrl::parse("rtmp://example.com/live/stream1").unwrap();

        assert_eq!(url.host, "example.com");
        assert_eq!(url.vhost, "example.com");
        assert_eq!(url.port, 1935);
        assert_eq!(url.app, "live");
        assert_eq!(url.stream, "stream1");
        assert_eq!(url.param, "");
        assert_eq!(url.tc_url(), "rtmp://example.com:1935/live");
    }

    #[test]
    fn parses_explicit_port() {
        let url = RtmpUrl::parse("rtmp://example.com:19350/live/stream1").unwrap();

        assert_eq!(url.port, 19350);
        assert_eq!(url.tc_url(), "rtmp://example.com:19350/live");
    }

    #[test]
    fn app_can_span_multiple_segments() {
        let url = RtmpUrl::parse("rtmp://example.com/live/region/stream1").unwrap();

        assert_eq!(url.app, "live/region");
        assert_eq!(url.stream, "stream1");
    }

    #[test]
    fn vhost_query_overrides_host_in_tc_url() {
        let url =
            RtmpUrl::parse("rtmp://10.0.0.5/live/stream1?vhost=cdn.example.com&token=x").unwrap();

        assert_eq!(url.host, "10.0.0.5");
        assert_eq!(url.vhost, "cdn.example.com");
        assert_eq!(url.tc_url(), "rtmp://cdn.example.com:1935/live");
        assert_eq!(url.param, "vhost=cdn.example.com&token=x");
    }

    #[test]
    fn stream_with_query_reattaches_parameters() {
        let url = RtmpUrl::parse("rtmp://example.com/live/stream1?token=abc").unwrap();
        assert_eq!(url.stream_with_query(), "stream1?token=abc");

        let url = RtmpUrl::parse("rtmp://example.com/live/stream1").unwrap();
        assert_eq!(url.stream_with_query(), "stream1");
    }

    #[test]
    fn rejects_non_rtmp_schema() {
        match RtmpUrl::parse("http://example.com/live/stream") {
            Err(UrlParseError::NotRtmpSchema { .. }) => (),
            x => panic!("Expected NotRtmpSchema, got {:?}", x),
        }
    }

    #[test]
    fn rejects_url_without_stream() {
        match RtmpUrl::parse("rtmp://example.com/live") {
            Err(UrlParseError::MissingPath { .. }) => (),
            x => panic!("Expected MissingPath, got {:?}", x),
        }
    }

    #[test]
    fn rejects_bad_port() {
        match RtmpUrl::parse("rtmp://example.com:notaport/live/stream") {
            Err(UrlParseError::InvalidPort { .. }) => (),
            x => panic!("Expected InvalidPort, got {:?}", x),
        }
    }
}
