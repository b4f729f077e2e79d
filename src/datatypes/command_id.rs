use num_enum::TryFromPrimitive;

/// The command ids this gateway speaks. Anything else on the wire is treated as
/// an unrecognized command and answered with a generic_nack.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    GenericNack = 0x8000_0000,
    SubmitSm = 0x0000_0004,
    SubmitSmResp = 0x8000_0004,
    DeliverSm = 0x0000_0005,
    DeliverSmResp = 0x8000_0005,
    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,
    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,
    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    /// Check if this command_id represents a response PDU
    pub fn is_response(&self) -> bool {
        (*self as u32) & 0x8000_0000 != 0
    }

    /// The response command that answers this request, if any.
    pub fn response(&self) -> Option<CommandId> {
        match self {
            CommandId::SubmitSm => Some(CommandId::SubmitSmResp),
            CommandId::DeliverSm => Some(CommandId::DeliverSmResp),
            CommandId::Unbind => Some(CommandId::UnbindResp),
            CommandId::BindTransceiver => Some(CommandId::BindTransceiverResp),
            CommandId::EnquireLink => Some(CommandId::EnquireLinkResp),
            _ => None,
        }
    }
}
