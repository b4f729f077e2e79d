// ABOUTME: Text codec for SIP messages: start line, headers up to the blank line, Content-Length body
// ABOUTME: Distinguishes incomplete input (keep buffering) from malformed input (answer 400)

use super::message::{Header, Method, SipMessage, StartLine};
use crate::error::GatewayError;
use bytes::{BufMut, Bytes, BytesMut};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, space0, space1, u16 as nom_u16};
use nom::combinator::{all_consuming, eof, map, opt, rest, verify};
use nom::sequence::{preceded, tuple};
use thiserror::Error;

const SIP_VERSION: &str = "SIP/2.0";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SipCodecError {
    /// Headers not terminated yet, or fewer body bytes than Content-Length
    #[error("incomplete SIP message")]
    Incomplete,

    #[error("{0}")]
    Malformed(String),
}

impl From<SipCodecError> for GatewayError {
    fn from(e: SipCodecError) -> Self {
        match e {
            SipCodecError::Incomplete => GatewayError::IncompleteMessage,
            SipCodecError::Malformed(reason) => GatewayError::MalformedMessage(reason),
        }
    }
}

fn malformed(reason: impl Into<String>) -> SipCodecError {
    SipCodecError::Malformed(reason.into())
}

/// Decodes exactly one message from `bytes`, as received in a datagram.
///
/// Bytes past the declared Content-Length are discarded.
pub fn decode(bytes: &[u8]) -> Result<SipMessage, SipCodecError> {
    decode_prefix(bytes).map(|(message, _)| message)
}

/// Decodes the first message in `bytes` and returns how many bytes it
/// occupied, for stream transports that carry messages back to back.
pub fn decode_prefix(bytes: &[u8]) -> Result<(SipMessage, usize), SipCodecError> {
    let (head, body_start) = split_head(bytes).ok_or(SipCodecError::Incomplete)?;
    let head = std::str::from_utf8(head).map_err(|_| malformed("header section is not UTF-8"))?;

    let mut lines = head.lines();
    let start = parse_start_line(lines.next().unwrap_or_default())?;
    let headers = parse_headers(lines)?;

    let content_length = match headers.iter().find(|h| h.is("Content-Length")) {
        Some(header) => header
            .value
            .trim()
            .parse::<usize>()
            .map_err(|_| malformed(format!("invalid Content-Length '{}'", header.value)))?,
        None => 0,
    };

    let available = &bytes[body_start..];
    if available.len() < content_length {
        return Err(SipCodecError::Incomplete);
    }

    let message = SipMessage {
        start,
        headers,
        body: Bytes::copy_from_slice(&available[..content_length]),
    };
    validate(&message)?;
    Ok((message, body_start + content_length))
}

/// Appends the wire form of `message` to `buf`. Content-Length always
/// reflects the body; an existing header keeps its position.
pub fn encode(message: &SipMessage, buf: &mut BytesMut) {
    match &message.start {
        StartLine::Request { method, uri } => {
            put_line(buf, &format!("{method} {uri} {SIP_VERSION}"));
        }
        StartLine::Response { code, reason } => {
            put_line(buf, &format!("{SIP_VERSION} {code} {reason}"));
        }
    }

    let content_length = message.body.len().to_string();
    let mut wrote_length = false;
    for header in &message.headers {
        if header.is("Content-Length") {
            if wrote_length {
                continue;
            }
            wrote_length = true;
            put_line(buf, &format!("{}: {}", header.name, content_length));
        } else {
            put_line(buf, &format!("{}: {}", header.name, header.value));
        }
    }
    if !wrote_length {
        put_line(buf, &format!("Content-Length: {content_length}"));
    }

    buf.put_slice(b"\r\n");
    buf.put_slice(&message.body);
}

pub fn to_bytes(message: &SipMessage) -> Bytes {
    let mut buf = BytesMut::with_capacity(512 + message.body.len());
    encode(message, &mut buf);
    buf.freeze()
}

/// Best-effort parse of a request that failed `decode`, keeping whatever
/// header lines are readable so a 400 can be routed back to the sender.
///
/// Returns None unless the start line is a request and the headers needed
/// to address a response (Via, From, To, Call-ID, CSeq) are all present.
pub fn salvage(bytes: &[u8]) -> Option<SipMessage> {
    let head = match split_head(bytes) {
        Some((head, _)) => head,
        None => bytes,
    };
    let head = String::from_utf8_lossy(head);
    let mut lines = head.lines();

    let first = lines.next()?.trim_end_matches('\r');
    if first.starts_with("SIP/") {
        return None;
    }
    let (_, (method, uri)) = tuple((token, opt(preceded(space1, non_space))))(first).ok()?;

    let mut message = SipMessage::request(Method::parse(method), uri.unwrap_or_default());
    for line in lines {
        if let Ok((_, HeaderLine::Field { name, value })) = header_line(line.trim_end_matches('\r')) {
            message
                .headers
                .push(Header::new(canonical_header_name(name), value));
        }
    }

    let routable = ["Via", "From", "To", "Call-ID", "CSeq"]
        .iter()
        .all(|name| message.header(name).is_some());
    routable.then_some(message)
}

fn put_line(buf: &mut BytesMut, line: &str) {
    buf.put_slice(line.as_bytes());
    buf.put_slice(b"\r\n");
}

/// Splits at the first blank line. Returns the header section and the
/// offset where the body begins. Bare LF line endings are tolerated.
fn split_head(bytes: &[u8]) -> Option<(&[u8], usize)> {
    let crlf = bytes.windows(4).position(|w| w == b"\r\n\r\n");
    let lf = bytes.windows(2).position(|w| w == b"\n\n");
    match (crlf, lf) {
        (Some(c), Some(l)) if l < c => Some((&bytes[..l], l + 2)),
        (Some(c), _) => Some((&bytes[..c], c + 4)),
        (None, Some(l)) => Some((&bytes[..l], l + 2)),
        (None, None) => None,
    }
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(input)
}

fn non_space(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_ascii_whitespace())(input)
}

/// `SIP/2.0 SP 3DIGIT [SP reason]`
fn status_line(input: &str) -> IResult<&str, StartLine> {
    map(
        tuple((
            tag(SIP_VERSION),
            space1,
            verify(nom_u16, |code: &u16| (100..=699).contains(code)),
            alt((preceded(space1, rest), eof)),
        )),
        |(_, _, code, reason): (&str, &str, u16, &str)| StartLine::Response {
            code,
            reason: reason.trim_end().to_string(),
        },
    )(input)
}

/// `Method SP Request-URI SP SIP/2.0`
fn request_line(input: &str) -> IResult<&str, StartLine> {
    map(
        all_consuming(tuple((token, space1, non_space, space1, tag(SIP_VERSION)))),
        |(method, _, uri, _, _)| StartLine::Request {
            method: Method::parse(method),
            uri: uri.to_string(),
        },
    )(input)
}

fn parse_start_line(line: &str) -> Result<StartLine, SipCodecError> {
    let line = line.trim_end_matches('\r');
    alt((status_line, request_line))(line)
        .map(|(_, start)| start)
        .map_err(|_| malformed(format!("invalid start line '{line}'")))
}

enum HeaderLine<'a> {
    Field { name: &'a str, value: &'a str },
    /// Folded onto the previous field's value
    Continuation(&'a str),
}

fn header_line(input: &str) -> IResult<&str, HeaderLine<'_>> {
    alt((
        map(preceded(space1, rest), |value: &str| {
            HeaderLine::Continuation(value.trim())
        }),
        map(
            tuple((token, space0, char(':'), rest)),
            |(name, _, _, value): (&str, &str, char, &str)| HeaderLine::Field {
                name,
                value: value.trim(),
            },
        ),
    ))(input)
}

/// Parses header lines, unfolding continuation lines that begin with
/// whitespace into the previous header's value.
fn parse_headers<'a, I>(lines: I) -> Result<Vec<Header>, SipCodecError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut headers: Vec<Header> = Vec::new();

    for line in lines {
        let line = line.trim_end_matches('\r');
        let (_, parsed) =
            header_line(line).map_err(|_| malformed(format!("invalid header line '{line}'")))?;

        match parsed {
            HeaderLine::Continuation(value) => {
                let previous = headers
                    .last_mut()
                    .ok_or_else(|| malformed("continuation line before any header"))?;
                if !value.is_empty() {
                    previous.value.push(' ');
                    previous.value.push_str(value);
                }
            }
            HeaderLine::Field { name, value } => {
                headers.push(Header::new(canonical_header_name(name), value));
            }
        }
    }

    Ok(headers)
}

fn validate(message: &SipMessage) -> Result<(), SipCodecError> {
    let Some(method) = message.method() else {
        return Ok(());
    };

    for required in ["Via", "From", "To", "Call-ID"] {
        if message.header(required).is_none() {
            return Err(malformed(format!("missing {required} header")));
        }
    }
    match message.cseq() {
        Some((_, cseq_method)) if cseq_method == method.as_str() => Ok(()),
        Some((_, cseq_method)) => Err(malformed(format!(
            "CSeq method {cseq_method} does not match {method}"
        ))),
        None => Err(malformed("missing or invalid CSeq header")),
    }
}

/// Expands compact header forms (RFC 3261 section 7.3.3).
fn canonical_header_name(name: &str) -> String {
    let canonical = match name.to_ascii_lowercase().as_str() {
        "v" => "Via",
        "i" => "Call-ID",
        "f" => "From",
        "t" => "To",
        "l" => "Content-Length",
        "c" => "Content-Type",
        "m" => "Contact",
        "e" => "Content-Encoding",
        "k" => "Supported",
        "s" => "Subject",
        _ => name,
    };
    canonical.to_string()
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '%' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "MESSAGE sip:+15551234567@gw.example.com SIP/2.0\r\n\
        Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK776asdhds\r\n\
        Via: SIP/2.0/UDP 10.0.0.9:5060;branch=z9hG4bKproxy\r\n\
        From: <sip:alice@example.com>;tag=49583\r\n\
        To: <sip:+15551234567@gw.example.com>\r\n\
        Call-ID: asd88asd77a@1.2.3.4\r\n\
        CSeq: 1 MESSAGE\r\n\
        Content-Type: text/plain\r\n\
        Content-Length: 2\r\n\
        \r\n\
        hi";

    #[test]
    fn decodes_request_with_body() {
        let msg = decode(MESSAGE.as_bytes()).unwrap();
        assert_eq!(msg.method(), Some(&Method::Message));
        assert_eq!(msg.request_uri(), Some("sip:+15551234567@gw.example.com"));
        assert_eq!(msg.body.as_ref(), b"hi");
        assert_eq!(msg.via_branch(), Some("z9hG4bK776asdhds"));
        assert_eq!(msg.headers_named("via").count(), 2);
    }

    #[test]
    fn round_trip_preserves_via_order() {
        let msg = decode(MESSAGE.as_bytes()).unwrap();
        let again = decode(&to_bytes(&msg)).unwrap();
        assert_eq!(msg, again);
    }

    #[test]
    fn body_longer_than_content_length_is_truncated() {
        let wire = MESSAGE.replace("Content-Length: 2", "Content-Length: 1");
        let msg = decode(wire.as_bytes()).unwrap();
        assert_eq!(msg.body.as_ref(), b"h");
    }

    #[test]
    fn short_body_is_incomplete() {
        let wire = MESSAGE.replace("Content-Length: 2", "Content-Length: 10");
        assert_eq!(decode(wire.as_bytes()), Err(SipCodecError::Incomplete));

        let head_only = &MESSAGE.as_bytes()[..40];
        assert_eq!(decode(head_only), Err(SipCodecError::Incomplete));
    }

    #[test]
    fn missing_content_length_means_empty_body() {
        let wire = MESSAGE.replace("Content-Length: 2\r\n", "");
        let msg = decode(wire.as_bytes()).unwrap();
        assert!(msg.body.is_empty());
    }

    #[test]
    fn folded_and_compact_headers() {
        let wire = "MESSAGE sip:bob@example.com SIP/2.0\r\n\
            v: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK1\r\n\
            f: <sip:alice@example.com>;tag=1\r\n\
            t: <sip:bob@example.com>\r\n\
            i: abc\r\n\
            CSeq: 7 MESSAGE\r\n\
            Subject: a long\r\n\
            \tsubject line\r\n\
            l: 0\r\n\
            \r\n";
        let msg = decode(wire.as_bytes()).unwrap();
        assert_eq!(msg.call_id(), Some("abc"));
        assert_eq!(msg.header("Subject"), Some("a long subject line"));
        assert_eq!(msg.headers[0].name, "Via");
    }

    #[test]
    fn decode_prefix_reports_consumed_length() {
        let mut stream = MESSAGE.as_bytes().to_vec();
        stream.extend_from_slice(MESSAGE.as_bytes());
        let (_, used) = decode_prefix(&stream).unwrap();
        assert_eq!(used, MESSAGE.len());
        assert!(decode_prefix(&stream[used..]).is_ok());
    }

    #[test]
    fn decodes_response() {
        let wire = "SIP/2.0 480 Temporarily Unavailable\r\n\
            Via: SIP/2.0/UDP 10.0.0.1;branch=z9hG4bK1\r\n\
            Content-Length: 0\r\n\r\n";
        let msg = decode(wire.as_bytes()).unwrap();
        assert_eq!(msg.status_code(), Some(480));
        assert!(matches!(msg.start, StartLine::Response { ref reason, .. } if reason == "Temporarily Unavailable"));
    }

    #[test]
    fn malformed_inputs() {
        let bad_line = "MESSAGE sip:bob@example.com\r\n\r\n";
        assert!(matches!(decode(bad_line.as_bytes()), Err(SipCodecError::Malformed(_))));

        let no_colon = MESSAGE.replace("CSeq: 1 MESSAGE", "CSeq 1 MESSAGE");
        assert!(matches!(decode(no_colon.as_bytes()), Err(SipCodecError::Malformed(_))));

        let bad_length = MESSAGE.replace("Content-Length: 2", "Content-Length: two");
        assert!(matches!(decode(bad_length.as_bytes()), Err(SipCodecError::Malformed(_))));

        let no_call_id = MESSAGE.replace("Call-ID: asd88asd77a@1.2.3.4\r\n", "");
        assert!(matches!(decode(no_call_id.as_bytes()), Err(SipCodecError::Malformed(_))));

        let bad_status = "SIP/2.0 99 Nope\r\n\r\n";
        assert!(matches!(decode(bad_status.as_bytes()), Err(SipCodecError::Malformed(_))));
    }

    #[test]
    fn start_line_grammar() {
        assert_eq!(
            parse_start_line("SIP/2.0 200").unwrap(),
            StartLine::Response { code: 200, reason: String::new() }
        );
        assert_eq!(
            parse_start_line("SIP/2.0 503 Service  Unavailable \r").unwrap(),
            StartLine::Response { code: 503, reason: "Service  Unavailable".into() }
        );
        assert_eq!(
            parse_start_line("MESSAGE sip:bob@example.com SIP/2.0").unwrap(),
            StartLine::Request { method: Method::Message, uri: "sip:bob@example.com".into() }
        );

        for bad in [
            "MESSAGE sip:bob@example.com SIP/2.0 extra",
            "MESSAGE sip:bob@example.com SIP/3.0",
            "MESS@GE sip:bob@example.com SIP/2.0",
            "SIP/2.0 200OK",
            "SIP/2.0 7000 Way Off",
            "",
        ] {
            assert!(
                matches!(parse_start_line(bad), Err(SipCodecError::Malformed(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn header_line_grammar() {
        assert!(matches!(
            header_line("Subject :  hello there "),
            Ok((_, HeaderLine::Field { name: "Subject", value: "hello there" }))
        ));
        assert!(matches!(
            header_line("\t continued"),
            Ok((_, HeaderLine::Continuation("continued")))
        ));
        assert!(header_line("Bad Name: x").is_err());
        assert!(header_line(": no name").is_err());

        let folded = parse_headers([" orphan"]);
        assert!(matches!(folded, Err(SipCodecError::Malformed(_))));
    }

    #[test]
    fn encode_fixes_content_length() {
        let msg = SipMessage::request(Method::Message, "sip:bob@example.com")
            .with_header("Content-Length", "99")
            .with_body(&b"hello"[..]);
        let wire = to_bytes(&msg);
        let text = std::str::from_utf8(&wire).unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn salvage_keeps_routing_headers() {
        let wire = MESSAGE.replace("Content-Length: 2", "Content-Length: two");
        let msg = salvage(wire.as_bytes()).unwrap();
        assert_eq!(msg.call_id(), Some("asd88asd77a@1.2.3.4"));
        assert_eq!(msg.headers_named("Via").count(), 2);

        assert!(salvage(b"garbage\r\n\r\n").is_none());
        assert!(salvage(b"SIP/2.0 200 OK\r\nVia: x\r\n\r\n").is_none());
    }

    #[test]
    fn codec_errors_map_to_gateway_taxonomy() {
        assert!(matches!(
            GatewayError::from(SipCodecError::Incomplete),
            GatewayError::IncompleteMessage
        ));
        assert!(matches!(
            GatewayError::from(malformed("x")),
            GatewayError::MalformedMessage(_)
        ));
    }
}
