//! Request head decoding.
//!
//! The head is parsed with `httparse` into stack-allocated header slots and
//! then copied into an `http::Request<()>`. The payload framing is derived from
//! `Transfer-Encoding` and `Content-Length` as described in RFC 9112 §6.

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Request, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire head
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes a request head and the framing of the payload that follows it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let status = req.parse(src.as_ref()).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e),
        })?;

        let head_size = match status {
            Status::Complete(head_size) => head_size,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(head_size = head_size, "parsed request head");
        ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let mut builder = Request::builder()
            .method(req.method.ok_or(ParseError::InvalidMethod)?)
            .uri(req.path.ok_or(ParseError::InvalidUri)?)
            .version(version);

        if let Some(header_map) = builder.headers_mut() {
            header_map.reserve(req.headers.len());
            for header in req.headers.iter() {
                let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
                let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
                header_map.append(name, value);
            }
        }

        let header = RequestHeader::from(builder.body(()).map_err(|e| {
            if e.is::<http::method::InvalidMethod>() { ParseError::InvalidMethod } else { ParseError::InvalidUri }
        })?);
        let payload_size = parse_payload(&header)?;

        src.advance(head_size);
        Ok(Some((header, payload_size)))
    }
}

/// Chooses the payload framing for `header`, whatever its method.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = header.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (Some(te_value), None) if is_chunked(te_value) => Ok(PayloadSize::new_chunked()),

        (Some(_), None) => Ok(PayloadSize::new_empty()),

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value is not visible ascii"))?;
            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(if length == 0 { PayloadSize::new_empty() } else { PayloadSize::new_length(length) })
        }

        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer-encoding and content-length both present in headers"))
        }
    }
}

/// `chunked` must be the final transfer coding when present.
fn is_chunked(value: &HeaderValue) -> bool {
    value
        .as_bytes()
        .rsplit(|b| *b == b',')
        .next()
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use indoc::indoc;

    fn decode(raw: &str) -> Result<Option<(RequestHeader, PayloadSize)>, ParseError> {
        let mut buf = BytesMut::from(raw.replace('\n', "\r\n").as_str());
        HeaderDecoder.decode(&mut buf)
    }

    #[test]
    fn from_curl() {
        let raw = indoc! {r"
        GET /user/42?tab=posts HTTP/1.1
        Host: 127.0.0.1:3000
        User-Agent: curl/8.4.0
        Accept: */*

        "};

        let (header, payload_size) = decode(raw).unwrap().unwrap();

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/user/42");
        assert_eq!(header.uri().query(), Some("tab=posts"));
        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers()[http::header::USER_AGENT], "curl/8.4.0");
        assert_eq!(payload_size, PayloadSize::Empty);
    }

    #[test]
    fn head_is_consumed_and_body_left() {
        let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 7\r\n\r\n{\"a\":1}"[..]);

        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.method(), &Method::POST);
        assert_eq!(payload_size, PayloadSize::Length(7));
        assert_eq!(&buf[..], b"{\"a\":1}");
    }

    #[test]
    fn partial_head_needs_more_data() {
        assert!(decode("GET / HTTP/1.1\nHost: loc").unwrap().is_none());
    }

    #[test]
    fn chunked_post() {
        let raw = indoc! {r"
        POST /user HTTP/1.1
        Transfer-Encoding: gzip, chunked

        "};

        let (_, payload_size) = decode(raw).unwrap().unwrap();
        assert_eq!(payload_size, PayloadSize::Chunked);
    }

    #[test]
    fn delete_with_content_length() {
        let raw = indoc! {r#"
        DELETE /user/7 HTTP/1.1
        Content-Length: 8

        {"id":7}"#};

        let mut buf = BytesMut::from(raw.replace('\n', "\r\n").as_str());
        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(header.method(), &Method::DELETE);
        assert_eq!(payload_size, PayloadSize::Length(8));
        assert_eq!(&buf[..], br#"{"id":7}"#);
    }

    #[test]
    fn get_without_framing_headers() {
        let raw = indoc! {r"
        GET / HTTP/1.1
        Host: localhost

        "};

        let (_, payload_size) = decode(raw).unwrap().unwrap();
        assert_eq!(payload_size, PayloadSize::Empty);
    }

    #[test]
    fn conflicting_framing_is_rejected() {
        let raw = indoc! {r"
        PUT / HTTP/1.1
        Content-Length: 10
        Transfer-Encoding: chunked

        "};

        assert!(matches!(decode(raw), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn invalid_content_length() {
        let raw = indoc! {r"
        PATCH / HTTP/1.1
        Content-Length: ten

        "};

        assert!(matches!(decode(raw), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn oversized_partial_head() {
        let raw = format!("GET / HTTP/1.1\nX-Filler: {}", "a".repeat(MAX_HEADER_BYTES));
        assert!(matches!(decode(&raw), Err(ParseError::TooLargeHeader { .. })));
    }
}
