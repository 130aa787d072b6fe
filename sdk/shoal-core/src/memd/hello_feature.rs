#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum HelloFeature {
    DataType,
    Tls,
    TcpNoDelay,
    SeqNo,
    Xattr,
    Xerror,
    SelectBucket,
    Snappy,
    Json,
    Duplex,
    ClusterMapNotif,
    UnorderedExec,
    Durations,
    AltRequests,
    SyncReplication,
    Collections,
    PreserveExpiry,
    Unknown(u16),
}

impl From<HelloFeature> for u16 {
    fn from(value: HelloFeature) -> u16 {
        match value {
            HelloFeature::DataType => 0x01,
            HelloFeature::Tls => 0x02,
            HelloFeature::TcpNoDelay => 0x03,
            HelloFeature::SeqNo => 0x04,
            HelloFeature::Xattr => 0x06,
            HelloFeature::Xerror => 0x07,
            HelloFeature::SelectBucket => 0x08,
            HelloFeature::Snappy => 0x0a,
            HelloFeature::Json => 0x0b,
            HelloFeature::Duplex => 0x0c,
            HelloFeature::ClusterMapNotif => 0x0d,
            HelloFeature::UnorderedExec => 0x0e,
            HelloFeature::Durations => 0x0f,
            HelloFeature::AltRequests => 0x10,
            HelloFeature::SyncReplication => 0x11,
            HelloFeature::Collections => 0x12,
            HelloFeature::PreserveExpiry => 0x14,
            HelloFeature::Unknown(code) => code,
        }
    }
}

impl From<u16> for HelloFeature {
    fn from(value: u16) -> Self {
        match value {
            0x01 => HelloFeature::DataType,
            0x02 => HelloFeature::Tls,
            0x03 => HelloFeature::TcpNoDelay,
            0x04 => HelloFeature::SeqNo,
            0x06 => HelloFeature::Xattr,
            0x07 => HelloFeature::Xerror,
            0x08 => HelloFeature::SelectBucket,
            0x0a => HelloFeature::Snappy,
            0x0b => HelloFeature::Json,
            0x0c => HelloFeature::Duplex,
            0x0d => HelloFeature::ClusterMapNotif,
            0x0e => HelloFeature::UnorderedExec,
            0x0f => HelloFeature::Durations,
            0x10 => HelloFeature::AltRequests,
            0x11 => HelloFeature::SyncReplication,
            0x12 => HelloFeature::Collections,
            0x14 => HelloFeature::PreserveExpiry,
            code => HelloFeature::Unknown(code),
        }
    }
}
