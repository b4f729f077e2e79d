use crate::codec::{
    decode_cstring, decode_enum, decode_octets, decode_tlvs, decode_u8, encode_cstring,
    encode_tlvs, CodecError,
};
use crate::datatypes::tlv::{Tlv, TAG_MESSAGE_PAYLOAD};
use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};
use crate::macros::builder_setters;
use bytes::{BufMut, Bytes, BytesMut};
use std::io::Cursor;

// SMPP v3.4 field sizes, NULL terminator included
pub const MAX_SERVICE_TYPE_LEN: usize = 6;
pub const MAX_ADDR_LEN: usize = 21;
pub const MAX_TIME_LEN: usize = 17;
/// Largest body short_message can carry; anything longer goes in message_payload.
pub const MAX_SHORT_MESSAGE_LEN: usize = 254;

/// esm_class bits 2-5 select the message type
const ESM_MESSAGE_TYPE_MASK: u8 = 0b0011_1100;
const ESM_SMSC_DELIVERY_RECEIPT: u8 = 0b0000_0100;
const ESM_SME_DELIVERY_ACK: u8 = 0b0000_1000;
const ESM_SME_MANUAL_ACK: u8 = 0b0001_0000;
const ESM_INTERMEDIATE_NOTIFICATION: u8 = 0b0010_0000;

/// The mandatory and optional parameters shared by submit_sm and deliver_sm.
///
/// Both PDUs use an identical body layout (SMPP v3.4 sections 4.4.1 and
/// 4.6.1); deliver_sm simply leaves the scheduling fields empty.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageBody {
    /// service_type: SMS application service, empty for the default.
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    /// source_addr: address of the originating SME, up to 20 characters.
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    /// destination_addr: address of the recipient SME, up to 20 characters.
    pub destination_addr: String,
    /// esm_class: message mode and message type. Bits 2-5 flag delivery
    /// receipts and acknowledgements on deliver_sm.
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    /// data_coding: 0x00 SMSC default, 0x03 Latin-1, 0x08 UCS-2.
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    /// short_message: up to 254 octets. sm_length is derived from it.
    pub short_message: Bytes,
    /// Optional parameters in wire order, unknown tags included.
    pub tlvs: Vec<Tlv>,
}

impl Default for MessageBody {
    fn default() -> Self {
        Self {
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: String::new(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: String::new(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: Bytes::new(),
            tlvs: Vec::new(),
        }
    }
}

impl MessageBody {
    pub fn new(source_addr: &str, destination_addr: &str, short_message: &[u8]) -> Self {
        Self {
            source_addr: source_addr.to_string(),
            destination_addr: destination_addr.to_string(),
            short_message: Bytes::copy_from_slice(short_message),
            ..Default::default()
        }
    }

    builder_setters! {
        source_addr_ton: TypeOfNumber,
        source_addr_npi: NumericPlanIndicator,
        dest_addr_ton: TypeOfNumber,
        dest_addr_npi: NumericPlanIndicator,
        esm_class: u8,
        registered_delivery: u8,
        data_coding: u8,
    }

    /// Stores `payload` in short_message when it fits, otherwise in a
    /// message_payload TLV with an empty short_message.
    pub fn with_payload(mut self, payload: Bytes) -> Self {
        self.tlvs.retain(|tlv| tlv.tag != TAG_MESSAGE_PAYLOAD);
        if payload.len() > MAX_SHORT_MESSAGE_LEN {
            self.short_message = Bytes::new();
            self.tlvs.push(Tlv::message_payload(payload));
        } else {
            self.short_message = payload;
        }
        self
    }

    /// The user data: message_payload when present, short_message otherwise.
    pub fn payload(&self) -> &Bytes {
        self.tlv(TAG_MESSAGE_PAYLOAD)
            .map(|tlv| &tlv.value)
            .unwrap_or(&self.short_message)
    }

    pub fn tlv(&self, tag: u16) -> Option<&Tlv> {
        self.tlvs.iter().find(|tlv| tlv.tag == tag)
    }

    /// True when esm_class marks this as a delivery receipt or an SME
    /// acknowledgement rather than a mobile-originated message.
    pub fn is_delivery_receipt(&self) -> bool {
        matches!(
            self.esm_class & ESM_MESSAGE_TYPE_MASK,
            ESM_SMSC_DELIVERY_RECEIPT
                | ESM_SME_DELIVERY_ACK
                | ESM_SME_MANUAL_ACK
                | ESM_INTERMEDIATE_NOTIFICATION
        )
    }

    pub(crate) fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let service_type = decode_cstring(buf, MAX_SERVICE_TYPE_LEN, "service_type")?;
        let source_addr_ton = decode_enum(buf, "source_addr_ton")?;
        let source_addr_npi = decode_enum(buf, "source_addr_npi")?;
        let source_addr = decode_cstring(buf, MAX_ADDR_LEN, "source_addr")?;
        let dest_addr_ton = decode_enum(buf, "dest_addr_ton")?;
        let dest_addr_npi = decode_enum(buf, "dest_addr_npi")?;
        let destination_addr = decode_cstring(buf, MAX_ADDR_LEN, "destination_addr")?;
        let esm_class = decode_u8(buf, "esm_class")?;
        let protocol_id = decode_u8(buf, "protocol_id")?;
        let priority_flag = decode_u8(buf, "priority_flag")?;
        let schedule_delivery_time =
            decode_cstring(buf, MAX_TIME_LEN, "schedule_delivery_time")?;
        let validity_period = decode_cstring(buf, MAX_TIME_LEN, "validity_period")?;
        let registered_delivery = decode_u8(buf, "registered_delivery")?;
        let replace_if_present_flag = decode_u8(buf, "replace_if_present_flag")?;
        let data_coding = decode_u8(buf, "data_coding")?;
        let sm_default_msg_id = decode_u8(buf, "sm_default_msg_id")?;
        let sm_length = decode_u8(buf, "sm_length")? as usize;
        let short_message = decode_octets(buf, sm_length, "short_message")?;
        let tlvs = decode_tlvs(buf)?;

        Ok(MessageBody {
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addr_ton,
            dest_addr_npi,
            destination_addr,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            data_coding,
            sm_default_msg_id,
            short_message,
            tlvs,
        })
    }

    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.short_message.len() > MAX_SHORT_MESSAGE_LEN {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: format!(
                    "{} octets exceeds maximum of {}",
                    self.short_message.len(),
                    MAX_SHORT_MESSAGE_LEN
                ),
            });
        }

        encode_cstring(buf, &self.service_type, MAX_SERVICE_TYPE_LEN, "service_type")?;
        buf.put_u8(self.source_addr_ton as u8);
        buf.put_u8(self.source_addr_npi as u8);
        encode_cstring(buf, &self.source_addr, MAX_ADDR_LEN, "source_addr")?;
        buf.put_u8(self.dest_addr_ton as u8);
        buf.put_u8(self.dest_addr_npi as u8);
        encode_cstring(buf, &self.destination_addr, MAX_ADDR_LEN, "destination_addr")?;
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag);
        encode_cstring(
            buf,
            &self.schedule_delivery_time,
            MAX_TIME_LEN,
            "schedule_delivery_time",
        )?;
        encode_cstring(buf, &self.validity_period, MAX_TIME_LEN, "validity_period")?;
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present_flag);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        buf.put_u8(self.short_message.len() as u8);
        buf.put_slice(&self.short_message);
        encode_tlvs(buf, &self.tlvs)
    }
}
