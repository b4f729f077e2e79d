use crate::codec::{
    decode_cstring, encode_cstring, encode_pdu, CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::{CommandId, CommandStatus, MessageBody};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// message_id is a C-Octet String of up to 65 octets.
pub const MAX_MESSAGE_ID_LEN: usize = 65;

/// This operation is used by an ESME to submit a short message to the SMSC for onward
/// transmission to a specified short message entity (SME).
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    // pub command_length: u32,
    // pub command_id: CommandId::SubmitSm,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    pub body: MessageBody,
}

impl SubmitSm {
    pub fn new(sequence_number: u32, body: MessageBody) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            body,
        }
    }
}

impl Decodable for SubmitSm {
    fn command_id() -> CommandId {
        CommandId::SubmitSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        Ok(SubmitSm {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            body: MessageBody::decode(buf)?,
        })
    }
}

impl Encodable for SubmitSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_pdu(
            buf,
            CommandId::SubmitSm,
            self.command_status,
            self.sequence_number,
            |body| self.body.encode(body),
        )
    }
}

/// submit_sm_resp carries the SMSC's message_id for an accepted message.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    // pub command_length: u32,
    // pub command_id: CommandId::SubmitSmResp,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// Empty when the SMSC omitted the body of a failed response.
    pub message_id: String,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, command_status: CommandStatus, message_id: &str) -> Self {
        Self {
            command_status,
            sequence_number,
            message_id: message_id.to_string(),
        }
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = if buf.has_remaining() {
            decode_cstring(buf, MAX_MESSAGE_ID_LEN, "message_id")?
        } else if header.command_status.is_ok() {
            return Err(CodecError::Truncated { field: "message_id" });
        } else {
            String::new()
        };

        if buf.has_remaining() {
            return Err(CodecError::FieldValidation {
                field: "submit_sm_resp_body",
                reason: format!("{} unexpected trailing octets", buf.remaining()),
            });
        }

        Ok(SubmitSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_pdu(
            buf,
            CommandId::SubmitSmResp,
            self.command_status,
            self.sequence_number,
            |body| encode_cstring(body, &self.message_id, MAX_MESSAGE_ID_LEN, "message_id"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;
    use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};

    fn decode_submit(bytes: &[u8]) -> SubmitSm {
        match Frame::decode(bytes).unwrap() {
            Frame::SubmitSm(submit) => *submit,
            other => panic!("expected submit_sm, got {other:?}"),
        }
    }

    #[test]
    fn submit_sm_wire_layout() {
        let body = MessageBody::new("alice", "+15551234567", b"hi")
            .dest_addr_ton(TypeOfNumber::International)
            .dest_addr_npi(NumericPlanIndicator::Isdn);
        let bytes = SubmitSm::new(7, body).to_bytes().unwrap();

        let expected_body: &[u8] = b"\0\x00\x00alice\0\x01\x01+15551234567\0\x00\x00\x00\0\0\x00\x00\x00\x00\x02hi";
        assert_eq!(&bytes[16..], expected_body);
        assert_eq!(bytes.len(), 16 + expected_body.len());
    }

    #[test]
    fn truncated_short_message_is_malformed() {
        let body = MessageBody::new("alice", "bob", b"hello");
        let bytes = SubmitSm::new(1, body).to_bytes().unwrap();
        let mut short = bytes[..bytes.len() - 2].to_vec();
        short[3] -= 2;
        assert!(matches!(
            Frame::decode(&short),
            Err(CodecError::Truncated { field: "short_message" })
        ));
    }

    #[test]
    fn unknown_tlvs_round_trip_in_order() {
        let mut body = MessageBody::new("alice", "bob", b"hello");
        body.tlvs.push(crate::datatypes::Tlv::new(0x1500, &b"\x01\x02"[..]));
        body.tlvs.push(crate::datatypes::Tlv::new(0x0204, &b"\x00\x07"[..]));
        let submit = SubmitSm::new(9, body);

        let decoded = decode_submit(&submit.to_bytes().unwrap());
        assert_eq!(decoded, submit);
        assert_eq!(decoded.body.tlvs[0].tag, 0x1500);
    }

    #[test]
    fn failed_submit_sm_resp_without_message_id() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x04, // submit_sm_resp
            0x00, 0x00, 0x00, 0x45, // ESME_RSUBMITFAIL
            0x00, 0x00, 0x00, 0x05, // sequence_number
        ];
        match Frame::decode(data).unwrap() {
            Frame::SubmitSmResp(resp) => {
                assert_eq!(resp.command_status, CommandStatus::SubmitFailed);
                assert!(resp.message_id.is_empty());
            }
            other => panic!("expected submit_sm_resp, got {other:?}"),
        }
    }

    #[test]
    fn successful_submit_sm_resp_requires_message_id() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, 0x80, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x05,
        ];
        assert!(matches!(
            Frame::decode(data),
            Err(CodecError::Truncated { field: "message_id" })
        ));
    }
}
