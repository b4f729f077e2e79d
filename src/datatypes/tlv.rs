use crate::codec::CodecError;
use bytes::{BufMut, Bytes, BytesMut};

/// message_payload: body that does not fit in short_message.
pub const TAG_MESSAGE_PAYLOAD: u16 = 0x0424;
/// sc_interface_version, optionally sent in bind responses.
pub const TAG_SC_INTERFACE_VERSION: u16 = 0x0210;
/// receipted_message_id, carried by delivery receipts.
pub const TAG_RECEIPTED_MESSAGE_ID: u16 = 0x001E;
/// message_state, carried by delivery receipts.
pub const TAG_MESSAGE_STATE: u16 = 0x0427;
pub const TAG_USER_MESSAGE_REFERENCE: u16 = 0x0204;
pub const TAG_SAR_MSG_REF_NUM: u16 = 0x020C;
pub const TAG_SAR_TOTAL_SEGMENTS: u16 = 0x020E;
pub const TAG_SAR_SEGMENT_SEQNUM: u16 = 0x020F;

/// An optional parameter in Tag-Length-Value form.
///
/// The length is derived from `value`, so a Tlv can never disagree with its
/// own length field. Tags the gateway does not understand are kept as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn message_payload(payload: impl Into<Bytes>) -> Self {
        Self::new(TAG_MESSAGE_PAYLOAD, payload)
    }

    pub fn sc_interface_version(version: u8) -> Self {
        Self::new(TAG_SC_INTERFACE_VERSION, Bytes::copy_from_slice(&[version]))
    }

    pub fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| {
            CodecError::TlvError(format!(
                "TLV {:#06x} value of {} octets exceeds u16 length",
                self.tag,
                self.value.len()
            ))
        })?;

        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }
}
