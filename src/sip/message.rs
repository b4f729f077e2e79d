use bytes::Bytes;
use std::fmt;

/// SIP request methods the gateway distinguishes. Anything else is kept
/// verbatim so it can be answered with 405.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Message,
    Ack,
    Other(String),
}

impl Method {
    pub fn parse(token: &str) -> Self {
        match token {
            "MESSAGE" => Method::Message,
            "ACK" => Method::Ack,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Message => "MESSAGE",
            Method::Ack => "ACK",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartLine {
    Request { method: Method, uri: String },
    Response { code: u16, reason: String },
}

/// One header line. The name keeps the spelling it was received or built
/// with; lookups compare names case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A SIP request or response.
///
/// Headers stay in wire order and duplicates are allowed, so the Via stack
/// survives a decode/encode cycle untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SipMessage {
    pub start: StartLine,
    pub headers: Vec<Header>,
    pub body: Bytes,
}

impl SipMessage {
    pub fn request(method: Method, uri: impl Into<String>) -> Self {
        Self {
            start: StartLine::Request {
                method,
                uri: uri.into(),
            },
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn response(code: u16, reason: impl Into<String>) -> Self {
        Self {
            start: StartLine::Response {
                code,
                reason: reason.into(),
            },
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start, StartLine::Request { .. })
    }

    pub fn method(&self) -> Option<&Method> {
        match &self.start {
            StartLine::Request { method, .. } => Some(method),
            StartLine::Response { .. } => None,
        }
    }

    pub fn request_uri(&self) -> Option<&str> {
        match &self.start {
            StartLine::Request { uri, .. } => Some(uri),
            StartLine::Response { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.start {
            StartLine::Response { code, .. } => Some(code),
            StartLine::Request { .. } => None,
        }
    }

    /// First header called `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .map(|h| h.value.as_str())
    }

    /// Every header called `name`, in wire order.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Header> + 'a {
        self.headers.iter().filter(move |h| h.is(name))
    }

    /// Replaces the first `name` header in place, or appends one.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.headers.iter_mut().find(|h| h.is(name)) {
            Some(header) => header.value = value,
            None => self.headers.push(Header::new(name, value)),
        }
    }

    /// Inserts a header at the top, where a new Via belongs.
    pub fn prepend_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(0, Header::new(name, value));
    }

    pub fn call_id(&self) -> Option<&str> {
        self.header("Call-ID").map(str::trim)
    }

    /// CSeq sequence number and method.
    pub fn cseq(&self) -> Option<(u32, &str)> {
        let value = self.header("CSeq")?;
        let mut parts = value.split_whitespace();
        let number = parts.next()?.parse().ok()?;
        let method = parts.next()?;
        Some((number, method))
    }

    /// The branch parameter of the topmost Via.
    pub fn via_branch(&self) -> Option<&str> {
        let via = self.header("Via")?;
        // A combined header "Via: a, b" puts the topmost entry first
        let top = via.split(',').next()?;
        param(top, "branch")
    }

    pub fn from_tag(&self) -> Option<&str> {
        self.header("From").and_then(|v| param(v, "tag"))
    }

    pub fn to_tag(&self) -> Option<&str> {
        self.header("To").and_then(|v| param(v, "tag"))
    }

    /// Builds a response that copies the Via stack, From, To, Call-ID and
    /// CSeq from this request. Final responses without a To tag get `tag`.
    pub fn response_to(&self, code: u16, reason: &str, tag: &str) -> SipMessage {
        let mut response = SipMessage::response(code, reason);
        for header in &self.headers {
            if header.is("Via") || header.is("From") || header.is("Call-ID") || header.is("CSeq") {
                response.headers.push(header.clone());
            } else if header.is("To") {
                let mut to = header.clone();
                if code >= 200 && param(&to.value, "tag").is_none() {
                    to.value = format!("{};tag={}", to.value, tag);
                }
                response.headers.push(to);
            }
        }
        response.headers.push(Header::new("Content-Length", "0"));
        response
    }
}

/// Value of `;name=value` inside a header value, case-insensitive on the name.
pub fn param<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    // Parameters after the closing '>' of a name-addr belong to the header
    let params = match value.rfind('>') {
        Some(end) => &value[end + 1..],
        None => value,
    };
    params.split(';').skip(1).find_map(|p| {
        let (key, val) = p.split_once('=').unwrap_or((p, ""));
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| val.trim().trim_matches('"'))
    })
}

/// User part of a From/To value or a bare URI.
///
/// Accepts `"Alice" <sip:alice@host>;tag=1`, `<sip:alice@host>`,
/// `sip:alice@host;transport=udp` and `tel:+15551234567`.
pub fn user_part(value: &str) -> Option<&str> {
    let uri = match (value.find('<'), value.find('>')) {
        (Some(start), Some(end)) if start < end => &value[start + 1..end],
        _ => value.split(';').next()?.trim(),
    };

    let rest = uri
        .strip_prefix("sips:")
        .or_else(|| uri.strip_prefix("sip:"))
        .or_else(|| uri.strip_prefix("tel:"))?;

    // tel: has no host; sip: user info ends at '@'
    let user = match rest.find('@') {
        Some(at) => &rest[..at],
        None if uri.starts_with("tel:") => rest.split(';').next()?,
        None => return None,
    };
    // Drop a password in user:password@host
    let user = user.split(':').next()?;
    (!user.is_empty()).then_some(user)
}

/// Default reason phrase for the status codes the gateway sends.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Trying",
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        480 => "Temporarily Unavailable",
        500 => "Server Internal Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SipMessage {
        SipMessage::request(Method::Message, "sip:+15551234567@gw.example.com")
            .with_header("Via", "SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bKabc")
            .with_header("Via", "SIP/2.0/UDP 10.0.0.2:5060;branch=z9hG4bKdef")
            .with_header("From", "\"Alice\" <sip:alice@example.com>;tag=1928")
            .with_header("To", "<sip:+15551234567@gw.example.com>")
            .with_header("Call-ID", "a84b4c76e66710")
            .with_header("CSeq", "314159 MESSAGE")
            .with_header("Content-Type", "text/plain")
            .with_body(&b"hi"[..])
    }

    #[test]
    fn transaction_identity_accessors() {
        let msg = request();
        assert_eq!(msg.call_id(), Some("a84b4c76e66710"));
        assert_eq!(msg.cseq(), Some((314159, "MESSAGE")));
        assert_eq!(msg.via_branch(), Some("z9hG4bKabc"));
        assert_eq!(msg.from_tag(), Some("1928"));
        assert_eq!(msg.to_tag(), None);
        assert_eq!(msg.header("call-id"), Some("a84b4c76e66710"));
    }

    #[test]
    fn response_copies_dialog_headers_and_tags_to() {
        let resp = request().response_to(200, "OK", "gw1");
        assert_eq!(resp.status_code(), Some(200));
        let vias: Vec<_> = resp.headers_named("Via").map(|h| h.value.as_str()).collect();
        assert_eq!(vias.len(), 2);
        assert!(vias[0].ends_with("z9hG4bKabc"));
        assert_eq!(resp.to_tag(), Some("gw1"));
        assert_eq!(resp.header("Content-Type"), None);
        assert_eq!(resp.header("Content-Length"), Some("0"));
    }

    #[test]
    fn user_part_handles_uri_shapes() {
        assert_eq!(user_part("\"Alice\" <sip:alice@example.com>;tag=1"), Some("alice"));
        assert_eq!(user_part("<sips:bob@example.com:5061>"), Some("bob"));
        assert_eq!(user_part("sip:carol:secret@example.com;transport=udp"), Some("carol"));
        assert_eq!(user_part("<tel:+15551234567;phone-context=x>"), Some("+15551234567"));
        assert_eq!(user_part("tel:+15551234567"), Some("+15551234567"));
        assert_eq!(user_part("sip:example.com"), None);
        assert_eq!(user_part("mailto:a@b"), None);
    }

    #[test]
    fn param_ignores_uri_parameters_inside_brackets() {
        assert_eq!(param("<sip:a@b;tag=inner>;tag=outer", "tag"), Some("outer"));
        assert_eq!(param("<sip:a@b;tag=inner>", "tag"), None);
        assert_eq!(param("SIP/2.0/UDP h;BRANCH=z9hG4bK1;rport", "branch"), Some("z9hG4bK1"));
    }

    #[test]
    fn set_header_replaces_in_place() {
        let mut msg = request();
        msg.set_header("content-type", "text/plain;charset=UTF-8");
        assert_eq!(msg.headers_named("Content-Type").count(), 1);
        assert_eq!(msg.header("Content-Type"), Some("text/plain;charset=UTF-8"));
    }
}
