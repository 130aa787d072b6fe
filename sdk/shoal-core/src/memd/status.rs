use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Status {
    // Success indicates the operation completed successfully.
    Success,
    // KeyNotFound occurs when an operation is performed on a key that does not exist.
    KeyNotFound,
    // KeyExists occurs when an operation is performed against a key that exists with
    // a different CAS than the one supplied.
    KeyExists,
    // TooBig occurs when an operation attempts to store more data in a single document
    // than the server is willing to accept.
    TooBig,
    // InvalidArgs occurs when the server receives invalid arguments for an operation.
    InvalidArgs,
    // NotStored occurs when the server fails to store a key.
    NotStored,
    // DeltaBadVal occurs when performing a counter op against a non-numeric document.
    DeltaBadVal,
    // NotMyVbucket occurs when an operation is dispatched to a node which is
    // non-authoritative for a specific vbucket.
    NotMyVbucket,
    // NoBucket occurs when no bucket was selected on a connection.
    NoBucket,
    // Locked occurs when an operation fails due to the document being locked.
    Locked,
    // ConfigOnly occurs when a data operation is performed against a config-only node.
    ConfigOnly,
    // AuthError occurs when the authentication information provided was not valid.
    AuthError,
    // AuthContinue occurs in multi-step authentication when more authentication
    // work is required to complete the exchange.
    AuthContinue,
    // AccessError occurs when the credentials lack permission for the operation.
    AccessError,
    // CommandUnknown occurs when an unknown operation is sent to a server.
    CommandUnknown,
    // NotSupported occurs when an operation is understood but not supported.
    NotSupported,
    // InternalError occurs when internal errors prevent the server from processing
    // the request.
    InternalError,
    // Busy occurs when the server is too busy to process the request right away.
    Busy,
    // TmpFail occurs when a temporary failure is preventing the server from
    // processing the request.
    TmpFail,
    // UnknownCollection occurs when a collection cannot be found.
    UnknownCollection,
    // UnknownScope occurs when a scope cannot be found.
    UnknownScope,
    // DurabilityInvalidLevel occurs when an invalid durability level was requested.
    DurabilityInvalidLevel,
    // DurabilityImpossible occurs when a request carries durability requirements
    // the current topology cannot meet.
    DurabilityImpossible,
    // SyncWriteInProgress occurs when a write is attempted against a key with a
    // durable write pending.
    SyncWriteInProgress,
    // SyncWriteAmbiguous occurs when a durable write did not complete in time and
    // the result is ambiguous.
    SyncWriteAmbiguous,
    // SyncWriteRecommitInProgress occurs while a durable write is being recommitted.
    SyncWriteRecommitInProgress,
    // RangeScanCancelled indicates the range scan was cancelled.
    RangeScanCancelled,
    // RangeScanMore indicates the batch completed and the scan has more results.
    RangeScanMore,
    // RangeScanComplete indicates the scan has completed.
    RangeScanComplete,
    // RangeScanVbUuidNotEqual indicates a vbucket uuid mismatch during scan create.
    RangeScanVbUuidNotEqual,

    SubDocPathNotFound,
    SubDocPathMismatch,
    SubDocPathInvalid,
    SubDocPathTooBig,
    SubDocDocTooDeep,
    SubDocCantInsert,
    SubDocNotJSON,
    SubDocBadRange,
    SubDocBadDelta,
    SubDocPathExists,
    SubDocValueTooDeep,
    SubDocInvalidCombo,
    SubDocMultiPathFailure,
    SubDocSuccessDeleted,
    SubDocXattrInvalidFlagCombo,
    SubDocXattrInvalidKeyCombo,
    SubDocXattrUnknownMacro,
    SubDocMultiPathFailureDeleted,

    Unknown(u16),
}

impl From<Status> for u16 {
    fn from(value: Status) -> Self {
        Self::from(&value)
    }
}

impl From<&Status> for u16 {
    fn from(value: &Status) -> Self {
        match value {
            Status::Success => 0x00,
            Status::KeyNotFound => 0x01,
            Status::KeyExists => 0x02,
            Status::TooBig => 0x03,
            Status::InvalidArgs => 0x04,
            Status::NotStored => 0x05,
            Status::DeltaBadVal => 0x06,
            Status::NotMyVbucket => 0x07,
            Status::NoBucket => 0x08,
            Status::Locked => 0x09,
            Status::ConfigOnly => 0x0d,
            Status::AuthError => 0x20,
            Status::AuthContinue => 0x21,
            Status::AccessError => 0x24,
            Status::CommandUnknown => 0x81,
            Status::NotSupported => 0x83,
            Status::InternalError => 0x84,
            Status::Busy => 0x85,
            Status::TmpFail => 0x86,
            Status::UnknownCollection => 0x88,
            Status::UnknownScope => 0x8c,
            Status::DurabilityInvalidLevel => 0xa0,
            Status::DurabilityImpossible => 0xa1,
            Status::SyncWriteInProgress => 0xa2,
            Status::SyncWriteAmbiguous => 0xa3,
            Status::SyncWriteRecommitInProgress => 0xa4,
            Status::RangeScanCancelled => 0xa5,
            Status::RangeScanMore => 0xa6,
            Status::RangeScanComplete => 0xa7,
            Status::RangeScanVbUuidNotEqual => 0xa8,
            Status::SubDocPathNotFound => 0xc0,
            Status::SubDocPathMismatch => 0xc1,
            Status::SubDocPathInvalid => 0xc2,
            Status::SubDocPathTooBig => 0xc3,
            Status::SubDocDocTooDeep => 0xc4,
            Status::SubDocCantInsert => 0xc5,
            Status::SubDocNotJSON => 0xc6,
            Status::SubDocBadRange => 0xc7,
            Status::SubDocBadDelta => 0xc8,
            Status::SubDocPathExists => 0xc9,
            Status::SubDocValueTooDeep => 0xca,
            Status::SubDocInvalidCombo => 0xcb,
            Status::SubDocMultiPathFailure => 0xcc,
            Status::SubDocSuccessDeleted => 0xcd,
            Status::SubDocXattrInvalidFlagCombo => 0xce,
            Status::SubDocXattrInvalidKeyCombo => 0xcf,
            Status::SubDocXattrUnknownMacro => 0xd0,
            Status::SubDocMultiPathFailureDeleted => 0xd3,

            Status::Unknown(value) => *value,
        }
    }
}

impl From<u16> for Status {
    fn from(value: u16) -> Self {
        match value {
            0x00 => Status::Success,
            0x01 => Status::KeyNotFound,
            0x02 => Status::KeyExists,
            0x03 => Status::TooBig,
            0x04 => Status::InvalidArgs,
            0x05 => Status::NotStored,
            0x06 => Status::DeltaBadVal,
            0x07 => Status::NotMyVbucket,
            0x08 => Status::NoBucket,
            0x09 => Status::Locked,
            0x0d => Status::ConfigOnly,
            0x20 => Status::AuthError,
            0x21 => Status::AuthContinue,
            0x24 => Status::AccessError,
            0x81 => Status::CommandUnknown,
            0x83 => Status::NotSupported,
            0x84 => Status::InternalError,
            0x85 => Status::Busy,
            0x86 => Status::TmpFail,
            0x88 => Status::UnknownCollection,
            0x8c => Status::UnknownScope,
            0xa0 => Status::DurabilityInvalidLevel,
            0xa1 => Status::DurabilityImpossible,
            0xa2 => Status::SyncWriteInProgress,
            0xa3 => Status::SyncWriteAmbiguous,
            0xa4 => Status::SyncWriteRecommitInProgress,
            0xa5 => Status::RangeScanCancelled,
            0xa6 => Status::RangeScanMore,
            0xa7 => Status::RangeScanComplete,
            0xa8 => Status::RangeScanVbUuidNotEqual,
            0xc0 => Status::SubDocPathNotFound,
            0xc1 => Status::SubDocPathMismatch,
            0xc2 => Status::SubDocPathInvalid,
            0xc3 => Status::SubDocPathTooBig,
            0xc4 => Status::SubDocDocTooDeep,
            0xc5 => Status::SubDocCantInsert,
            0xc6 => Status::SubDocNotJSON,
            0xc7 => Status::SubDocBadRange,
            0xc8 => Status::SubDocBadDelta,
            0xc9 => Status::SubDocPathExists,
            0xca => Status::SubDocValueTooDeep,
            0xcb => Status::SubDocInvalidCombo,
            0xcc => Status::SubDocMultiPathFailure,
            0xcd => Status::SubDocSuccessDeleted,
            0xce => Status::SubDocXattrInvalidFlagCombo,
            0xcf => Status::SubDocXattrInvalidKeyCombo,
            0xd0 => Status::SubDocXattrUnknownMacro,
            0xd3 => Status::SubDocMultiPathFailureDeleted,

            _ => Status::Unknown(value),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let txt = match self {
            Status::Success => "success",
            Status::KeyNotFound => "key not found",
            Status::KeyExists => "key exists",
            Status::TooBig => "too big",
            Status::InvalidArgs => "invalid args",
            Status::NotStored => "not stored",
            Status::DeltaBadVal => "bad delta",
            Status::NotMyVbucket => "not my vbucket",
            Status::NoBucket => "no bucket selected",
            Status::Locked => "locked",
            Status::ConfigOnly => "config only",
            Status::AuthError => "authentication error",
            Status::AuthContinue => "authentication continue",
            Status::AccessError => "access error",
            Status::CommandUnknown => "unknown command",
            Status::NotSupported => "not supported",
            Status::InternalError => "internal error",
            Status::Busy => "busy",
            Status::TmpFail => "temporary failure",
            Status::UnknownCollection => "collection unknown",
            Status::UnknownScope => "scope unknown",
            Status::DurabilityInvalidLevel => "durability invalid level",
            Status::DurabilityImpossible => "durability impossible",
            Status::SyncWriteInProgress => "sync write in progress",
            Status::SyncWriteAmbiguous => "sync write ambiguous",
            Status::SyncWriteRecommitInProgress => "sync write recommit in progress",
            Status::RangeScanCancelled => "range scan cancelled",
            Status::RangeScanMore => "range scan more",
            Status::RangeScanComplete => "range scan complete",
            Status::RangeScanVbUuidNotEqual => "range scan vb-uuid not equal",
            Status::SubDocPathNotFound => "subdoc path not found",
            Status::SubDocPathMismatch => "subdoc path mismatch",
            Status::SubDocPathInvalid => "subdoc path invalid",
            Status::SubDocPathTooBig => "subdoc path too big",
            Status::SubDocDocTooDeep => "subdoc document too deep",
            Status::SubDocCantInsert => "subdoc can't insert",
            Status::SubDocNotJSON => "subdoc not JSON",
            Status::SubDocBadRange => "subdoc bad range",
            Status::SubDocBadDelta => "subdoc bad delta",
            Status::SubDocPathExists => "subdoc path exists",
            Status::SubDocValueTooDeep => "subdoc value too deep",
            Status::SubDocInvalidCombo => "subdoc invalid combo",
            Status::SubDocMultiPathFailure => "subdoc multipath failure",
            Status::SubDocSuccessDeleted => "subdoc success deleted",
            Status::SubDocXattrInvalidFlagCombo => "subdoc xattr invalid flag combo",
            Status::SubDocXattrInvalidKeyCombo => "subdoc xattr invalid key combo",
            Status::SubDocXattrUnknownMacro => "subdoc xattr unknown macro",
            Status::SubDocMultiPathFailureDeleted => "subdoc multipath failure deleted",
            Status::Unknown(status) => {
                return write!(f, "unknown status 0x{status:x}");
            }
        };

        write!(f, "{txt}")
    }
}
