/// The durable position of a write: the vbucket it landed on, that vbucket's
/// current uuid, the sequence number assigned to the mutation and the bucket
/// it belongs to.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MutationToken {
    pub partition_id: u16,
    pub partition_uuid: u64,
    pub sequence_number: u64,
    pub bucket_name: String,
}
