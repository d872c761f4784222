//! Content normalization of upstream responses.
//!
//! # Responsibilities
//! - Detect compression via `Content-Encoding` or the gzip magic prefix
//! - Decode gzip and deflate bodies up to a size cap and drop `Content-Encoding`
//! - Keep `Content-Encoding` and the body in agreement when decoding fails
//! - Strip framing headers that are invalid once the body is re-sent

use std::io::Read;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use thiserror::Error;

use crate::upstream::client::UpstreamResponse;

/// First two bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const FRAMING_HEADERS: [HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

/// Upstream body after decompression and header sanitation.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub decompressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coding {
    Gzip,
    Deflate,
}

impl Coding {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("gzip") || value.eq_ignore_ascii_case("x-gzip") {
            Some(Coding::Gzip)
        } else if value.eq_ignore_ascii_case("deflate") {
            Some(Coding::Deflate)
        } else {
            None
        }
    }

    fn header_value(self) -> HeaderValue {
        match self {
            Coding::Gzip => HeaderValue::from_static("gzip"),
            Coding::Deflate => HeaderValue::from_static("deflate"),
        }
    }
}

#[derive(Debug, Error)]
enum DecodeError {
    #[error("decoded body exceeds {0} bytes")]
    TooLarge(usize),

    #[error(transparent)]
    Invalid(#[from] std::io::Error),
}

/// Normalize a raw upstream response.
///
/// Never fails. A body that decodes past `limit` bytes, or a corrupt gzip
/// stream, is forwarded still encoded with a matching `Content-Encoding`.
/// A body that was only *declared* encoded but does not decode is treated
/// as identity.
pub fn normalize(response: UpstreamResponse, limit: usize) -> Normalized {
    let content_type = response.content_type().map(str::to_owned);
    let declared = response.content_encoding().and_then(Coding::parse);

    let UpstreamResponse { headers, body, .. } = response;
    let mut headers = sanitize_headers(headers);
    let has_magic = body.starts_with(&GZIP_MAGIC);

    let coding = match declared {
        Some(coding) => coding,
        None if has_magic => Coding::Gzip,
        None => {
            return Normalized {
                body,
                content_type,
                headers,
                decompressed: false,
            }
        }
    };

    match decode(coding, &body, limit) {
        Ok(plain) => {
            headers.remove(header::CONTENT_ENCODING);
            tracing::debug!(
                coding = ?coding,
                compressed = body.len(),
                decompressed = plain.len(),
                "Decompressed body"
            );
            Normalized {
                body: Bytes::from(plain),
                content_type,
                headers,
                decompressed: true,
            }
        }
        Err(e @ DecodeError::TooLarge(_)) => {
            tracing::warn!(coding = ?coding, error = %e, "Forwarding body still encoded");
            headers.insert(header::CONTENT_ENCODING, coding.header_value());
            Normalized {
                body,
                content_type,
                headers,
                decompressed: false,
            }
        }
        Err(e) if coding == Coding::Gzip && has_magic => {
            tracing::warn!(error = %e, "Corrupt gzip body, forwarding it compressed");
            headers.insert(header::CONTENT_ENCODING, coding.header_value());
            Normalized {
                body,
                content_type,
                headers,
                decompressed: false,
            }
        }
        Err(e) => {
            tracing::warn!(coding = ?coding, error = %e, "Body declared encoded but does not decode");
            headers.remove(header::CONTENT_ENCODING);
            Normalized {
                body,
                content_type,
                headers,
                decompressed: false,
            }
        }
    }
}

/// Remove `Content-Length`, `Transfer-Encoding` and `Connection`.
pub fn sanitize_headers(mut headers: HeaderMap) -> HeaderMap {
    for name in FRAMING_HEADERS.iter() {
        headers.remove(name);
    }
    headers
}

/// HTTP `deflate` is zlib-wrapped, but raw deflate streams show up in the
/// wild too; both are accepted.
fn decode(coding: Coding, body: &[u8], limit: usize) -> Result<Vec<u8>, DecodeError> {
    match coding {
        Coding::Gzip => read_capped(MultiGzDecoder::new(body), limit),
        Coding::Deflate => match read_capped(ZlibDecoder::new(body), limit) {
            Err(DecodeError::Invalid(_)) => read_capped(DeflateDecoder::new(body), limit),
            other => other,
        },
    }
}

fn read_capped(decoder: impl Read, limit: usize) -> Result<Vec<u8>, DecodeError> {
    let mut plain = Vec::new();
    decoder
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut plain)?;
    if plain.len() > limit {
        return Err(DecodeError::TooLarge(limit));
    }
    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deflate, gzip};

    const LIMIT: usize = 1024 * 1024;
    use axum::http::StatusCode;

    fn upstream(headers: &[(HeaderName, &'static str)], body: impl Into<Bytes>) -> UpstreamResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        UpstreamResponse {
            status: StatusCode::OK,
            headers: map,
            body: body.into(),
        }
    }

    #[test]
    fn test_declared_gzip_is_decompressed_and_header_dropped() {
        let resp = upstream(
            &[
                (header::CONTENT_TYPE, "application/json"),
                (header::CONTENT_ENCODING, "gzip"),
            ],
            gzip(br#"{"ok":true}"#),
        );
        let out = normalize(resp, LIMIT);
        assert!(out.decompressed);
        assert_eq!(&out.body[..], br#"{"ok":true}"#);
        assert!(out.headers.get(header::CONTENT_ENCODING).is_none());
        assert_eq!(out.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_undeclared_gzip_detected_by_magic() {
        let resp = upstream(&[(header::CONTENT_TYPE, "text/plain")], gzip(b"hello"));
        let out = normalize(resp, LIMIT);
        assert!(out.decompressed);
        assert_eq!(&out.body[..], b"hello");
        assert!(out.headers.get(header::CONTENT_ENCODING).is_none());
    }

    #[test]
    fn test_corrupt_gzip_forwarded_with_gzip_header() {
        // valid gzip header followed by a deflate block with reserved type 3
        let broken = vec![
            0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff,
        ];
        let resp = upstream(&[(header::CONTENT_TYPE, "application/json")], broken.clone());
        let out = normalize(resp, LIMIT);
        assert!(!out.decompressed);
        assert_eq!(&out.body[..], &broken[..]);
        assert_eq!(out.headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
    }

    #[test]
    fn test_declared_gzip_with_plain_body_drops_header() {
        let resp = upstream(
            &[
                (header::CONTENT_TYPE, "text/plain"),
                (header::CONTENT_ENCODING, "GZIP"),
            ],
            "OK",
        );
        let out = normalize(resp, LIMIT);
        assert!(!out.decompressed);
        assert_eq!(&out.body[..], b"OK");
        assert!(out.headers.get(header::CONTENT_ENCODING).is_none());
    }

    #[test]
    fn test_framing_headers_always_stripped() {
        let resp = upstream(
            &[
                (header::CONTENT_TYPE, "text/plain"),
                (header::CONTENT_LENGTH, "2"),
                (header::TRANSFER_ENCODING, "chunked"),
                (header::CONNECTION, "keep-alive"),
                (header::SET_COOKIE, "sid=1"),
            ],
            "OK",
        );
        let out = normalize(resp, LIMIT);
        assert!(!out.decompressed);
        assert_eq!(&out.body[..], b"OK");
        assert!(out.headers.get(header::CONTENT_LENGTH).is_none());
        assert!(out.headers.get(header::TRANSFER_ENCODING).is_none());
        assert!(out.headers.get(header::CONNECTION).is_none());
        assert_eq!(out.headers.get(header::SET_COOKIE).unwrap(), "sid=1");
    }

    #[test]
    fn test_other_codings_left_alone() {
        let resp = upstream(&[(header::CONTENT_ENCODING, "br")], vec![0x0b, 0x02, 0x80]);
        let out = normalize(resp, LIMIT);
        assert!(!out.decompressed);
        assert_eq!(out.headers.get(header::CONTENT_ENCODING).unwrap(), "br");
    }

    #[test]
    fn test_concatenated_gzip_members() {
        let mut body = gzip(b"{\"a\":").to_vec();
        body.extend_from_slice(&gzip(b"1}"));
        let out = normalize(upstream(&[(header::CONTENT_ENCODING, "gzip")], body), LIMIT);
        assert!(out.decompressed);
        assert_eq!(&out.body[..], b"{\"a\":1}");
    }

    #[test]
    fn test_deflate_is_decoded() {
        let resp = upstream(
            &[
                (header::CONTENT_TYPE, "application/json"),
                (header::CONTENT_ENCODING, "deflate"),
            ],
            deflate(br#"{"ok":true}"#),
        );
        let out = normalize(resp, LIMIT);
        assert!(out.decompressed);
        assert_eq!(&out.body[..], br#"{"ok":true}"#);
        assert!(out.headers.get(header::CONTENT_ENCODING).is_none());
    }

    #[test]
    fn test_raw_deflate_is_decoded() {
        use flate2::write::DeflateEncoder;
        use std::io::Write;

        let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"[1,2,3]").unwrap();
        let raw = encoder.finish().unwrap();

        let out = normalize(upstream(&[(header::CONTENT_ENCODING, "deflate")], raw), LIMIT);
        assert!(out.decompressed);
        assert_eq!(&out.body[..], b"[1,2,3]");
    }

    #[test]
    fn test_oversized_gzip_forwarded_compressed() {
        let bomb = gzip(&vec![0u8; 64 * 1024]);
        let resp = upstream(&[(header::CONTENT_TYPE, "application/json")], bomb.clone());
        let out = normalize(resp, 1024);
        assert!(!out.decompressed);
        assert_eq!(out.body, bomb);
        assert_eq!(out.headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
    }

    #[test]
    fn test_oversized_deflate_keeps_its_coding() {
        let resp = upstream(&[(header::CONTENT_ENCODING, "deflate")], deflate(&vec![b'a'; 4096]));
        let out = normalize(resp, 4095);
        assert!(!out.decompressed);
        assert_eq!(out.headers.get(header::CONTENT_ENCODING).unwrap(), "deflate");

        let resp = upstream(&[(header::CONTENT_ENCODING, "deflate")], deflate(&vec![b'a'; 4096]));
        let out = normalize(resp, 4096);
        assert!(out.decompressed);
        assert_eq!(out.body.len(), 4096);
    }
}
