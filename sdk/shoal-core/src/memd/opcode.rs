use std::fmt::{Display, Formatter};

use crate::memd::error::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpCode {
    Get,
    Set,
    Add,
    Replace,
    Delete,
    Increment,
    Decrement,
    Noop,
    Append,
    Prepend,
    Touch,
    GAT,
    Hello,
    SASLListMechs,
    SASLAuth,
    SASLStep,
    GetReplica,
    SelectBucket,
    ObserveSeqNo,
    GetLocked,
    UnlockKey,
    GetMeta,
    GetClusterConfig,
    GetCollectionsManifest,
    GetCollectionId,
    SubDocMultiLookup,
    SubDocMultiMutation,
    RangeScanCreate,
    RangeScanContinue,
    RangeScanCancel,
    GetErrorMap,
    Unknown(u8),
}

impl From<OpCode> for u8 {
    fn from(value: OpCode) -> Self {
        match value {
            OpCode::Get => 0x00,
            OpCode::Set => 0x01,
            OpCode::Add => 0x02,
            OpCode::Replace => 0x03,
            OpCode::Delete => 0x04,
            OpCode::Increment => 0x05,
            OpCode::Decrement => 0x06,
            OpCode::Noop => 0x0a,
            OpCode::Append => 0x0e,
            OpCode::Prepend => 0x0f,
            OpCode::Touch => 0x1c,
            OpCode::GAT => 0x1d,
            OpCode::Hello => 0x1f,
            OpCode::SASLListMechs => 0x20,
            OpCode::SASLAuth => 0x21,
            OpCode::SASLStep => 0x22,
            OpCode::GetReplica => 0x83,
            OpCode::SelectBucket => 0x89,
            OpCode::ObserveSeqNo => 0x91,
            OpCode::GetLocked => 0x94,
            OpCode::UnlockKey => 0x95,
            OpCode::GetMeta => 0xa0,
            OpCode::GetClusterConfig => 0xb5,
            OpCode::GetCollectionsManifest => 0xba,
            OpCode::GetCollectionId => 0xbb,
            OpCode::SubDocMultiLookup => 0xd0,
            OpCode::SubDocMultiMutation => 0xd1,
            OpCode::RangeScanCreate => 0xda,
            OpCode::RangeScanContinue => 0xdb,
            OpCode::RangeScanCancel => 0xdc,
            OpCode::GetErrorMap => 0xfe,
            OpCode::Unknown(code) => code,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let code = match value {
            0x00 => OpCode::Get,
            0x01 => OpCode::Set,
            0x02 => OpCode::Add,
            0x03 => OpCode::Replace,
            0x04 => OpCode::Delete,
            0x05 => OpCode::Increment,
            0x06 => OpCode::Decrement,
            0x0a => OpCode::Noop,
            0x0e => OpCode::Append,
            0x0f => OpCode::Prepend,
            0x1c => OpCode::Touch,
            0x1d => OpCode::GAT,
            0x1f => OpCode::Hello,
            0x20 => OpCode::SASLListMechs,
            0x21 => OpCode::SASLAuth,
            0x22 => OpCode::SASLStep,
            0x83 => OpCode::GetReplica,
            0x89 => OpCode::SelectBucket,
            0x91 => OpCode::ObserveSeqNo,
            0x94 => OpCode::GetLocked,
            0x95 => OpCode::UnlockKey,
            0xa0 => OpCode::GetMeta,
            0xb5 => OpCode::GetClusterConfig,
            0xba => OpCode::GetCollectionsManifest,
            0xbb => OpCode::GetCollectionId,
            0xd0 => OpCode::SubDocMultiLookup,
            0xd1 => OpCode::SubDocMultiMutation,
            0xda => OpCode::RangeScanCreate,
            0xdb => OpCode::RangeScanContinue,
            0xdc => OpCode::RangeScanCancel,
            0xfe => OpCode::GetErrorMap,
            _ => OpCode::Unknown(value),
        };

        Ok(code)
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let txt = match self {
            OpCode::Get => "Get",
            OpCode::Set => "Set",
            OpCode::Add => "Add",
            OpCode::Replace => "Replace",
            OpCode::Delete => "Delete",
            OpCode::Increment => "Increment",
            OpCode::Decrement => "Decrement",
            OpCode::Noop => "Noop",
            OpCode::Append => "Append",
            OpCode::Prepend => "Prepend",
            OpCode::Touch => "Touch",
            OpCode::GAT => "Get and touch",
            OpCode::Hello => "Hello",
            OpCode::SASLListMechs => "SASL list mechanisms",
            OpCode::SASLAuth => "SASL auth",
            OpCode::SASLStep => "SASL step",
            OpCode::GetReplica => "Get replica",
            OpCode::SelectBucket => "Select bucket",
            OpCode::ObserveSeqNo => "Observe seqno",
            OpCode::GetLocked => "Get locked",
            OpCode::UnlockKey => "Unlock key",
            OpCode::GetMeta => "Get meta",
            OpCode::GetClusterConfig => "Get cluster config",
            OpCode::GetCollectionsManifest => "Get collections manifest",
            OpCode::GetCollectionId => "Get collection id",
            OpCode::SubDocMultiLookup => "Subdoc multi lookup",
            OpCode::SubDocMultiMutation => "Subdoc multi mutation",
            OpCode::RangeScanCreate => "Range scan create",
            OpCode::RangeScanContinue => "Range scan continue",
            OpCode::RangeScanCancel => "Range scan cancel",
            OpCode::GetErrorMap => "Get error map",
            OpCode::Unknown(code) => {
                return write!(f, "x{:02x}", code);
            }
        };
        write!(f, "{txt}")
    }
}
