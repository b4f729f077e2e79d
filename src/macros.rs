// ABOUTME: Declarative macros shared by the SMPP datatypes
// ABOUTME: Header-only PDU codecs (enquire_link, unbind, generic_nack) and chained setters

/// Encodable/Decodable for a PDU that is nothing but the 16-octet header.
///
/// Any body octets after the header are a decode error.
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;
                if buf.has_remaining() {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: concat!(stringify!($pdu_type), "_body"),
                        reason: format!("{} trailing octets", buf.remaining()),
                    });
                }

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::encode_pdu(
                    buf,
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                    |_| Ok(()),
                )
            }
        }
    };
}

/// Header-only codec plus a `new(sequence_number)` constructor with Ok status.
macro_rules! impl_complete_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        $crate::macros::impl_header_only_pdu!($pdu_type, $command_id);

        impl $pdu_type {
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }
        }
    };
}

/// `field(value) -> Self` setters for builder-style construction.
macro_rules! builder_setters {
    ($($field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

pub(crate) use {builder_setters, impl_complete_header_only_pdu, impl_header_only_pdu};
