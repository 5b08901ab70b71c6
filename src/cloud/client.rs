//! Outbound HTTP GET used by the nutrition lookup and the webhook mirror

use crate::error::LookupError;

/// Responses larger than this are cut off; nutrition replies are ~1 KB.
pub const MAX_BODY_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

pub trait HttpFetch {
    /// One request, bounded by the implementation's own timeout.
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> Result<HttpReply, LookupError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceEncoding {
    Plus,
    Percent,
}

/// Percent-encode a query value. Unreserved characters pass through.
pub fn encode_query_value(value: &str, spaces: SpaceEncoding) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' if spaces == SpaceEncoding::Plus => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(target_os = "espidf")]
pub use esp::EspHttpFetch;

#[cfg(target_os = "espidf")]
mod esp {
    use super::{HttpFetch, HttpReply, MAX_BODY_BYTES};
    use crate::error::LookupError;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use esp_idf_svc::http::Method;
    use log::{debug, warn};
    use std::time::Duration;

    fn transport(e: impl core::fmt::Debug) -> LookupError {
        LookupError::Transport(format!("{:?}", e))
    }

    pub struct EspHttpFetch {
        timeout: Duration,
    }

    impl EspHttpFetch {
        pub fn new(timeout: Duration) -> Self {
            Self { timeout }
        }
    }

    impl HttpFetch for EspHttpFetch {
        fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> Result<HttpReply, LookupError> {
            let config = Configuration {
                timeout: Some(self.timeout),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            };
            let mut conn = EspHttpConnection::new(&config).map_err(transport)?;

            conn.initiate_request(Method::Get, url, headers)
                .map_err(transport)?;
            conn.initiate_response().map_err(transport)?;
            let status = conn.status();

            let mut body = Vec::new();
            let mut buffer = [0u8; 512];
            loop {
                let n = conn.read(&mut buffer).map_err(transport)?;
                if n == 0 {
                    break;
                }
                body.extend_from_slice(&buffer[..n]);
                if body.len() >= MAX_BODY_BYTES {
                    warn!("Response body too large, truncating");
                    break;
                }
            }

            debug!("GET {} -> {} ({} bytes)", url, status, body.len());
            Ok(HttpReply {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_as_plus_for_descriptor() {
        assert_eq!(
            encode_query_value("150g apple pie", SpaceEncoding::Plus),
            "150g+apple+pie"
        );
    }

    #[test]
    fn spaces_as_percent_for_webhook() {
        assert_eq!(
            encode_query_value("2024-03-01 12:30", SpaceEncoding::Percent),
            "2024-03-01%2012%3A30"
        );
    }

    #[test]
    fn reserved_and_non_ascii_bytes_are_escaped() {
        assert_eq!(
            encode_query_value("mac&cheese=1", SpaceEncoding::Plus),
            "mac%26cheese%3D1"
        );
        assert_eq!(encode_query_value("é", SpaceEncoding::Plus), "%C3%A9");
    }
}
