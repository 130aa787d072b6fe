use bitflags::bitflags;

use crate::memd::opcode::OpCode;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct SubdocOpFlag: u8 {
        const MKDIR_P = 0x04;
        const XATTR_PATH = 0x10;
        const EXPAND_MACROS = 0x20;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct SubdocDocFlag: u8 {
        const MKDOC = 0x01;
        const ADD_DOC = 0x02;
        const ACCESS_DELETED = 0x04;
        const CREATE_AS_DELETED = 0x08;
        const REVIVE_DOCUMENT = 0x10;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LookupInOpType {
    Get,
    Exists,
    GetCount,
    GetDoc,
}

impl From<LookupInOpType> for OpCode {
    fn from(value: LookupInOpType) -> Self {
        match value {
            LookupInOpType::Get => OpCode::Unknown(0xc5),
            LookupInOpType::Exists => OpCode::Unknown(0xc6),
            LookupInOpType::GetCount => OpCode::Unknown(0xd2),
            LookupInOpType::GetDoc => OpCode::Get,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MutateInOpType {
    DictAdd,
    DictSet,
    Delete,
    Replace,
    ArrayPushLast,
    ArrayPushFirst,
    ArrayInsert,
    ArrayAddUnique,
    Counter,
    SetDoc,
    DeleteDoc,
}

impl From<MutateInOpType> for OpCode {
    fn from(value: MutateInOpType) -> Self {
        match value {
            MutateInOpType::DictAdd => OpCode::Unknown(0xc7),
            MutateInOpType::DictSet => OpCode::Unknown(0xc8),
            MutateInOpType::Delete => OpCode::Unknown(0xc9),
            MutateInOpType::Replace => OpCode::Unknown(0xca),
            MutateInOpType::ArrayPushLast => OpCode::Unknown(0xcb),
            MutateInOpType::ArrayPushFirst => OpCode::Unknown(0xcc),
            MutateInOpType::ArrayInsert => OpCode::Unknown(0xcd),
            MutateInOpType::ArrayAddUnique => OpCode::Unknown(0xce),
            MutateInOpType::Counter => OpCode::Unknown(0xcf),
            MutateInOpType::SetDoc => OpCode::Set,
            MutateInOpType::DeleteDoc => OpCode::Delete,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LookupInOp<'a> {
    pub op: LookupInOpType,
    pub flags: SubdocOpFlag,
    pub path: &'a [u8],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MutateInOp<'a> {
    pub op: MutateInOpType,
    pub flags: SubdocOpFlag,
    pub path: &'a [u8],
    pub value: &'a [u8],
}

// Carried alongside a pending subdoc op so the response decoder knows how
// many per-op result slots to expect.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubdocRequestInfo {
    pub flags: SubdocDocFlag,
    pub op_count: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubDocResult {
    pub err: Option<crate::memd::status::Status>,
    pub value: Option<Vec<u8>>,
}
