use num_enum::{FromPrimitive, IntoPrimitive};

/// command_status values from SMPP v3.4 section 5.1.3.
///
/// Requests always carry `Ok`. On responses a non-zero value reports why the
/// request failed; the gateway forwards that failure to the SIP side as a 503.
/// Reserved and SMSC vendor codes (0x400..=0x4FF) are kept verbatim in `Other`.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// ESME_ROK
    Ok = 0x0000_0000,
    /// ESME_RINVMSGLEN
    InvalidMsgLength = 0x0000_0001,
    /// ESME_RINVCMDLEN
    InvalidCommandLength = 0x0000_0002,
    /// ESME_RINVCMDID
    InvalidCommandId = 0x0000_0003,
    /// ESME_RINVBNDSTS
    IncorrectBindStatus = 0x0000_0004,
    /// ESME_RALYBND
    AlreadyBound = 0x0000_0005,
    /// ESME_RINVPRTFLG
    InvalidPriorityFlag = 0x0000_0006,
    /// ESME_RINVREGDLVFLG
    InvalidRegisteredDeliveryFlag = 0x0000_0007,
    /// ESME_RSYSERR
    SystemError = 0x0000_0008,
    /// ESME_RINVSRCADR
    InvalidSourceAddress = 0x0000_000A,
    /// ESME_RINVDSTADR
    InvalidDestinationAddress = 0x0000_000B,
    /// ESME_RINVMSGID
    InvalidMessageId = 0x0000_000C,
    /// ESME_RBINDFAIL
    BindFailed = 0x0000_000D,
    /// ESME_RINVPASWD
    InvalidPassword = 0x0000_000E,
    /// ESME_RINVSYSID
    InvalidSystemId = 0x0000_000F,
    /// ESME_RMSGQFUL
    MessageQueueFull = 0x0000_0014,
    /// ESME_RINVSERTYP
    InvalidServiceType = 0x0000_0015,
    /// ESME_RINVESMCLASS
    InvalidEsmClass = 0x0000_0043,
    /// ESME_RSUBMITFAIL
    SubmitFailed = 0x0000_0045,
    /// ESME_RINVSRCTON
    InvalidSourceTon = 0x0000_0048,
    /// ESME_RINVSRCNPI
    InvalidSourceNpi = 0x0000_0049,
    /// ESME_RINVDSTTON
    InvalidDestinationTon = 0x0000_0050,
    /// ESME_RINVDSTNPI
    InvalidDestinationNpi = 0x0000_0051,
    /// ESME_RINVSYSTYP
    InvalidSystemType = 0x0000_0053,
    /// ESME_RTHROTTLED
    Throttled = 0x0000_0058,
    /// ESME_RINVEXPIRY
    InvalidExpiryTime = 0x0000_0062,
    /// ESME_RX_T_APPN: the receiving application failed temporarily, retry later
    ReceiverTemporaryAppError = 0x0000_0064,
    /// ESME_RX_P_APPN: the receiving application rejected the message permanently
    ReceiverPermanentAppError = 0x0000_0065,
    /// ESME_RX_R_APPN
    ReceiverRejectMessage = 0x0000_0066,
    /// ESME_RINVOPTPARSTREAM
    InvalidOptionalParameterStream = 0x0000_00C0,
    /// ESME_ROPTPARNOTALLWD
    OptionalParameterNotAllowed = 0x0000_00C1,
    /// ESME_RINVPARLEN
    InvalidParameterLength = 0x0000_00C2,
    /// ESME_RMISSINGOPTPARAM
    MissingOptionalParameter = 0x0000_00C3,
    /// ESME_RINVOPTPARAMVAL
    InvalidOptionalParameterValue = 0x0000_00C4,
    /// ESME_RDELIVERYFAILURE
    DeliveryFailed = 0x0000_00FE,
    /// ESME_RUNKNOWNERR
    UnknownError = 0x0000_00FF,
    #[num_enum(catch_all)]
    Other(u32),
}

impl CommandStatus {
    pub fn is_ok(&self) -> bool {
        *self == CommandStatus::Ok
    }

    /// The value carried on the wire
    pub fn code(&self) -> u32 {
        u32::from(*self)
    }
}
