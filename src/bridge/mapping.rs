//! Field-level translation between SIP MESSAGE requests and SMPP message
//! bodies: addresses, text encoding and status codes.

use crate::datatypes::{CommandStatus, MAX_ADDR_LEN, MessageBody, NumericPlanIndicator, TypeOfNumber};
use crate::error::{GatewayError, GatewayResult};
use crate::sip::message::{user_part, Method, SipMessage};
use bytes::Bytes;
use std::fmt::Write;
use tracing::warn;

/// SMSC default alphabet; the gateway only selects it for pure ASCII
pub const DATA_CODING_DEFAULT: u8 = 0x00;
pub const DATA_CODING_LATIN1: u8 = 0x03;
pub const DATA_CODING_UCS2: u8 = 0x08;

pub const CONTENT_TYPE_TEXT: &str = "text/plain;charset=UTF-8";

/// TON/NPI for an address string: `+digits` is international E.164, bare
/// digits are unknown-type ISDN, anything else is alphanumeric.
pub fn address_type(addr: &str) -> (TypeOfNumber, NumericPlanIndicator) {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match addr.strip_prefix('+') {
        Some(digits) if all_digits(digits) => {
            (TypeOfNumber::International, NumericPlanIndicator::Isdn)
        }
        _ if all_digits(addr) => (TypeOfNumber::Unknown, NumericPlanIndicator::Isdn),
        _ => (TypeOfNumber::Alphanumeric, NumericPlanIndicator::Unknown),
    }
}

fn check_address(addr: &str, field: &str) -> GatewayResult<()> {
    if addr.is_empty() || addr.len() >= MAX_ADDR_LEN || !addr.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(GatewayError::InvalidData(format!(
            "{field} '{addr}' cannot be carried as an SMPP address"
        )));
    }
    Ok(())
}

/// Encodes text for short_message: ASCII as the default alphabet, anything
/// else as UCS-2 (UTF-16BE).
pub fn encode_text(text: &str) -> (u8, Bytes) {
    if text.is_ascii() {
        return (DATA_CODING_DEFAULT, Bytes::copy_from_slice(text.as_bytes()));
    }
    let ucs2: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
    (DATA_CODING_UCS2, Bytes::from(ucs2))
}

/// Decodes user data according to data_coding. Unknown codings are read
/// as UTF-8, replacing invalid sequences.
pub fn decode_text(data_coding: u8, data: &[u8]) -> String {
    match data_coding {
        DATA_CODING_UCS2 => {
            let pairs = data.chunks_exact(2);
            let odd = !pairs.remainder().is_empty();
            let units = pairs.map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            let mut text: String = char::decode_utf16(units)
                .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect();
            if odd {
                warn!(len = data.len(), "UCS2 user data has an odd trailing octet");
                text.push(char::REPLACEMENT_CHARACTER);
            }
            text
        }
        DATA_CODING_LATIN1 => data.iter().map(|&b| b as char).collect(),
        _ => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Builds the submit_sm body for an inbound MESSAGE: source from the From
/// user, destination from the Request-URI user (To as a fallback).
pub fn submit_body(request: &SipMessage) -> GatewayResult<MessageBody> {
    let source = request
        .header("From")
        .and_then(user_part)
        .ok_or_else(|| GatewayError::InvalidData("From has no user part".into()))?;
    let destination = request
        .request_uri()
        .and_then(user_part)
        .or_else(|| request.header("To").and_then(user_part))
        .ok_or_else(|| GatewayError::InvalidData("no destination user part".into()))?;
    check_address(source, "source")?;
    check_address(destination, "destination")?;

    if request.body.is_empty() {
        return Err(GatewayError::InvalidData("empty MESSAGE body".into()));
    }
    let text = std::str::from_utf8(&request.body)
        .map_err(|_| GatewayError::InvalidData("MESSAGE body is not UTF-8 text".into()))?;

    let (source_ton, source_npi) = address_type(source);
    let (dest_ton, dest_npi) = address_type(destination);
    let (data_coding, payload) = encode_text(text);

    Ok(MessageBody::new(source, destination, &[])
        .source_addr_ton(source_ton)
        .source_addr_npi(source_npi)
        .dest_addr_ton(dest_ton)
        .dest_addr_npi(dest_npi)
        .data_coding(data_coding)
        .with_payload(payload))
}

/// Builds the outbound MESSAGE for a deliver_sm. The endpoint adds Via.
pub fn outbound_message(
    body: &MessageBody,
    domain: &str,
    call_id: &str,
    tag: &str,
) -> GatewayResult<SipMessage> {
    if body.source_addr.is_empty() || body.destination_addr.is_empty() {
        return Err(GatewayError::InvalidData(
            "deliver_sm without source or destination address".into(),
        ));
    }
    let payload = body.payload();
    if payload.is_empty() {
        return Err(GatewayError::InvalidData("deliver_sm without user data".into()));
    }

    let text = decode_text(body.data_coding, payload);
    let from = escape_user(&body.source_addr);
    let to = escape_user(&body.destination_addr);

    Ok(SipMessage::request(Method::Message, format!("sip:{to}@{domain}"))
        .with_header("From", format!("<sip:{from}@{domain}>;tag={tag}"))
        .with_header("To", format!("<sip:{to}@{domain}>"))
        .with_header("Call-ID", call_id)
        .with_header("CSeq", "1 MESSAGE")
        .with_header("Content-Type", CONTENT_TYPE_TEXT)
        .with_body(text))
}

/// Percent-encodes characters not allowed in a SIP URI user part.
fn escape_user(user: &str) -> String {
    let mut out = String::with_capacity(user.len());
    for b in user.bytes() {
        if b.is_ascii_alphanumeric() || b"-_.!~*'()&=+$,;?/".contains(&b) {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

/// deliver_sm_resp status for the final SIP response to the MESSAGE that
/// carried the deliver_sm.
pub fn deliver_status(code: u16) -> CommandStatus {
    match code {
        200..=299 => CommandStatus::Ok,
        // The recipient may become reachable; let the SMSC retry
        408 | 480 => CommandStatus::ReceiverTemporaryAppError,
        400..=499 => CommandStatus::ReceiverPermanentAppError,
        _ => CommandStatus::ReceiverTemporaryAppError,
    }
}

/// SIP final response for an inbound MESSAGE that could not be delivered.
pub fn failure_response(error: &GatewayError) -> u16 {
    match error {
        GatewayError::NotBound => 480,
        GatewayError::InvalidData(_) => 400,
        _ => 503,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::tlv::TAG_MESSAGE_PAYLOAD;

    fn message(from: &str, uri: &str, body: &[u8]) -> SipMessage {
        SipMessage::request(Method::Message, uri)
            .with_header("From", from)
            .with_header("To", format!("<{uri}>"))
            .with_body(Bytes::copy_from_slice(body))
    }

    #[test]
    fn address_typing() {
        assert_eq!(
            address_type("+15551234567"),
            (TypeOfNumber::International, NumericPlanIndicator::Isdn)
        );
        assert_eq!(
            address_type("5551234"),
            (TypeOfNumber::Unknown, NumericPlanIndicator::Isdn)
        );
        assert_eq!(
            address_type("alice"),
            (TypeOfNumber::Alphanumeric, NumericPlanIndicator::Unknown)
        );
        assert_eq!(address_type("+").0, TypeOfNumber::Alphanumeric);
    }

    #[test]
    fn ascii_message_maps_to_submit() {
        let request = message(
            "<sip:alice@example.com>;tag=1",
            "sip:+15551234567@gw.example.com",
            b"hi",
        );
        let body = submit_body(&request).unwrap();
        assert_eq!(body.source_addr, "alice");
        assert_eq!(body.destination_addr, "+15551234567");
        assert_eq!(body.short_message.as_ref(), b"hi");
        assert_eq!(body.data_coding, DATA_CODING_DEFAULT);
        assert_eq!(body.source_addr_ton, TypeOfNumber::Alphanumeric);
        assert_eq!(body.dest_addr_ton, TypeOfNumber::International);
    }

    #[test]
    fn non_ascii_text_is_ucs2() {
        let request = message("<sip:alice@x>", "sip:bob@x", "héllo".as_bytes());
        let body = submit_body(&request).unwrap();
        assert_eq!(body.data_coding, DATA_CODING_UCS2);
        assert_eq!(body.short_message.len(), 10);
        assert_eq!(decode_text(DATA_CODING_UCS2, &body.short_message), "héllo");
    }

    #[test]
    fn long_text_moves_to_message_payload() {
        let text = "a".repeat(300);
        let request = message("<sip:alice@x>", "sip:bob@x", text.as_bytes());
        let body = submit_body(&request).unwrap();
        assert!(body.short_message.is_empty());
        assert_eq!(body.tlv(TAG_MESSAGE_PAYLOAD).unwrap().value.len(), 300);
    }

    #[test]
    fn unmappable_requests_are_invalid_data() {
        let empty = message("<sip:alice@x>", "sip:bob@x", b"");
        assert!(matches!(submit_body(&empty), Err(GatewayError::InvalidData(_))));

        let long_addr = message("<sip:alice@x>", "sip:abcdefghijklmnopqrstuvwxyz@x", b"hi");
        assert!(matches!(submit_body(&long_addr), Err(GatewayError::InvalidData(_))));

        let binary = message("<sip:alice@x>", "sip:bob@x", &[0xff, 0xfe]);
        assert!(matches!(submit_body(&binary), Err(GatewayError::InvalidData(_))));

        let no_user = message("<sip:example.com>", "sip:bob@x", b"hi");
        assert!(matches!(submit_body(&no_user), Err(GatewayError::InvalidData(_))));
    }

    #[test]
    fn deliver_builds_message_request() {
        let body = MessageBody::new("+15551234567", "bob", b"hello");
        let msg = outbound_message(&body, "sip.example.com", "call-9", "t1").unwrap();
        assert_eq!(msg.request_uri(), Some("sip:bob@sip.example.com"));
        assert_eq!(msg.header("From").and_then(user_part), Some("+15551234567"));
        assert_eq!(msg.from_tag(), Some("t1"));
        assert_eq!(msg.call_id(), Some("call-9"));
        assert_eq!(msg.header("Content-Type"), Some(CONTENT_TYPE_TEXT));
        assert_eq!(msg.body.as_ref(), b"hello");
    }

    #[test]
    fn deliver_user_is_escaped() {
        let body = MessageBody::new("My Shop", "bob", b"x");
        let msg = outbound_message(&body, "d", "c", "t").unwrap();
        assert_eq!(msg.header("From"), Some("<sip:My%20Shop@d>;tag=t"));
    }

    #[test]
    fn text_decoding_by_data_coding() {
        assert_eq!(decode_text(DATA_CODING_LATIN1, &[0x63, 0x61, 0x66, 0xe9]), "café");
        assert_eq!(decode_text(DATA_CODING_DEFAULT, b"plain"), "plain");
        assert_eq!(decode_text(0x04, &[0x61, 0xff]), "a\u{fffd}");
        assert_eq!(decode_text(DATA_CODING_UCS2, &[0xd8, 0x00]), "\u{fffd}");
        // A dangling half code unit is not silently dropped
        assert_eq!(decode_text(DATA_CODING_UCS2, &[0x00, 0x68, 0x00]), "h\u{fffd}");
    }

    #[test]
    fn status_mappings() {
        assert_eq!(deliver_status(200), CommandStatus::Ok);
        assert_eq!(deliver_status(202), CommandStatus::Ok);
        assert_eq!(deliver_status(404), CommandStatus::ReceiverPermanentAppError);
        assert_eq!(deliver_status(408), CommandStatus::ReceiverTemporaryAppError);
        assert_eq!(deliver_status(480), CommandStatus::ReceiverTemporaryAppError);
        assert_eq!(deliver_status(503), CommandStatus::ReceiverTemporaryAppError);

        assert_eq!(failure_response(&GatewayError::NotBound), 480);
        assert_eq!(failure_response(&GatewayError::SmppTimeout), 503);
        assert_eq!(failure_response(&GatewayError::SessionClosed), 503);
        assert_eq!(failure_response(&GatewayError::InvalidData("x".into())), 400);
    }
}
