use crate::codec::{
    decode_cstring, decode_enum, decode_tlvs, encode_cstring, encode_pdu, encode_tlvs,
    CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::tlv::{Tlv, TAG_SC_INTERFACE_VERSION};
use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, TypeOfNumber,
};
use crate::macros::builder_setters;
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

pub const MAX_SYSTEM_ID_LEN: usize = 16;
pub const MAX_PASSWORD_LEN: usize = 9;
pub const MAX_SYSTEM_TYPE_LEN: usize = 13;
pub const MAX_ADDRESS_RANGE_LEN: usize = 41;

/// BindTransceiver is used to bind a transceiver ESME to the SMSC.
/// A transceiver ESME can both send and receive messages through a single connection.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiver {
    // pub command_length: u32,
    // pub command_id: CommandId::BindTransceiver,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 5.2.1 system_id: identification of the ESME requesting to bind, up to
    ///       15 characters.
    pub system_id: String,

    /// 5.2.2 password: used by the SMSC to authenticate the ESME, up to 8
    ///       characters. Empty when the SMSC requires none.
    pub password: String,

    /// 5.2.3 system_type: categorizes the type of ESME that is binding.
    pub system_type: String,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton: Type of Number of the ESME address(es) served via this
    ///       SMPP session.
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi: Numbering Plan Indicator of the ESME address(es)
    ///       served via this SMPP session.
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: range of SME addresses serviced by the ESME.
    pub address_range: String,
}

impl BindTransceiver {
    pub fn new(sequence_number: u32, system_id: &str, password: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.to_string(),
            password: password.to_string(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    builder_setters! {
        system_type: String,
        interface_version: InterfaceVersion,
        addr_ton: TypeOfNumber,
        addr_npi: NumericPlanIndicator,
        address_range: String,
    }
}

impl Decodable for BindTransceiver {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let pdu = BindTransceiver {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id: decode_cstring(buf, MAX_SYSTEM_ID_LEN, "system_id")?,
            password: decode_cstring(buf, MAX_PASSWORD_LEN, "password")?,
            system_type: decode_cstring(buf, MAX_SYSTEM_TYPE_LEN, "system_type")?,
            interface_version: decode_enum(buf, "interface_version")?,
            addr_ton: decode_enum(buf, "addr_ton")?,
            addr_npi: decode_enum(buf, "addr_npi")?,
            address_range: decode_cstring(buf, MAX_ADDRESS_RANGE_LEN, "address_range")?,
        };

        if buf.has_remaining() {
            return Err(CodecError::FieldValidation {
                field: "bind_transceiver_body",
                reason: format!("{} unexpected trailing octets", buf.remaining()),
            });
        }
        Ok(pdu)
    }
}

impl Encodable for BindTransceiver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_pdu(
            buf,
            CommandId::BindTransceiver,
            self.command_status,
            self.sequence_number,
            |body| {
                encode_cstring(body, &self.system_id, MAX_SYSTEM_ID_LEN, "system_id")?;
                encode_cstring(body, &self.password, MAX_PASSWORD_LEN, "password")?;
                encode_cstring(body, &self.system_type, MAX_SYSTEM_TYPE_LEN, "system_type")?;
                body.put_u8(self.interface_version as u8);
                body.put_u8(self.addr_ton as u8);
                body.put_u8(self.addr_npi as u8);
                encode_cstring(
                    body,
                    &self.address_range,
                    MAX_ADDRESS_RANGE_LEN,
                    "address_range",
                )
            },
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    // pub command_length: u32,
    // pub command_id: CommandId::BindTransceiverResp,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// SMSC identifier. SMSCs commonly omit the body on a failed bind, which
    /// decodes as an empty system_id.
    pub system_id: String,
    pub tlvs: Vec<Tlv>,
}

impl BindTransceiverResponse {
    pub fn new(sequence_number: u32, command_status: CommandStatus, system_id: &str) -> Self {
        Self {
            command_status,
            sequence_number,
            system_id: system_id.to_string(),
            tlvs: Vec::new(),
        }
    }

    /// The sc_interface_version TLV, if the SMSC sent one
    pub fn sc_interface_version(&self) -> Option<u8> {
        self.tlvs
            .iter()
            .find(|tlv| tlv.tag == TAG_SC_INTERFACE_VERSION)
            .and_then(|tlv| tlv.value.first().copied())
    }
}

impl Decodable for BindTransceiverResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = if buf.has_remaining() {
            decode_cstring(buf, MAX_SYSTEM_ID_LEN, "system_id")?
        } else {
            String::new()
        };

        Ok(BindTransceiverResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            tlvs: decode_tlvs(buf)?,
        })
    }
}

impl Encodable for BindTransceiverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_pdu(
            buf,
            CommandId::BindTransceiverResp,
            self.command_status,
            self.sequence_number,
            |body| {
                encode_cstring(body, &self.system_id, MAX_SYSTEM_ID_LEN, "system_id")?;
                encode_tlvs(body, &self.tlvs)
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;

    #[test]
    fn bind_transceiver_wire_layout() {
        let bind = BindTransceiver::new(1, "esme", "pw");
        let bytes = bind.to_bytes().unwrap();

        // header(16) + "esme\0" + "pw\0" + "\0" + 3 octets + "\0"
        assert_eq!(bytes.len(), 16 + 5 + 3 + 1 + 3 + 1);
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x09]);
        assert_eq!(&bytes[16..21], b"esme\0");
        assert_eq!(bytes[25], 0x34);
    }

    #[test]
    fn overlong_password_is_rejected_on_encode() {
        let bind = BindTransceiver::new(1, "esme", "much-too-long");
        assert!(matches!(
            bind.to_bytes(),
            Err(CodecError::FieldValidation { field: "password", .. })
        ));
    }

    #[test]
    fn missing_address_range_is_truncated() {
        let bytes = BindTransceiver::new(3, "esme", "pw").to_bytes().unwrap();
        let mut short = bytes[..bytes.len() - 1].to_vec();
        short[3] -= 1;
        assert!(matches!(
            Frame::decode(&short),
            Err(CodecError::Truncated { field: "address_range" })
        ));
    }

    #[test]
    fn failed_bind_resp_may_have_empty_body() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x09, // bind_transceiver_resp
            0x00, 0x00, 0x00, 0x0E, // ESME_RINVPASWD
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];
        match Frame::decode(data).unwrap() {
            Frame::BindTransceiverResp(resp) => {
                assert_eq!(resp.command_status, CommandStatus::InvalidPassword);
                assert!(resp.system_id.is_empty());
            }
            other => panic!("expected bind_transceiver_resp, got {other:?}"),
        }
    }

    #[test]
    fn bind_resp_exposes_sc_interface_version() {
        let mut resp = BindTransceiverResponse::new(1, CommandStatus::Ok, "SMSC");
        resp.tlvs.push(Tlv::sc_interface_version(0x34));
        let decoded = Frame::decode(&resp.to_bytes().unwrap()).unwrap();
        match decoded {
            Frame::BindTransceiverResp(resp) => {
                assert_eq!(resp.sc_interface_version(), Some(0x34))
            }
            other => panic!("expected bind_transceiver_resp, got {other:?}"),
        }
    }
}
