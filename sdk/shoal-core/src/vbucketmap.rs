use crate::error::ErrorKind;
use crate::error::Result;
use crate::memd::extframe::make_uleb128_32;

/// The `[vbucket][replica] -> node index` table from a cluster config. Entry
/// slot 0 is the active copy; -1 means no node currently holds that copy.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct VbucketMap {
    entries: Vec<Vec<i16>>,
    num_replicas: usize,
}

impl VbucketMap {
    pub fn new(entries: Vec<Vec<i16>>, num_replicas: usize) -> Result<Self> {
        if entries.is_empty() {
            return Err(ErrorKind::InvalidVbucketMap.into());
        }

        // The routing formula masks the low bits of the hash, which is only
        // sound for power-of-two map sizes. Servers deviating from that are
        // reported as broken configurations.
        if !entries.len().is_power_of_two() {
            return Err(ErrorKind::InvalidVbucketMap.into());
        }

        Ok(Self {
            entries,
            num_replicas,
        })
    }

    pub fn is_valid(&self) -> bool {
        if let Some(entry) = self.entries.first() {
            return !entry.is_empty();
        }

        false
    }

    pub fn num_vbuckets(&self) -> usize {
        self.entries.len()
    }

    pub fn num_replicas(&self) -> usize {
        self.num_replicas
    }

    // The vbucket is selected by the low bits of a CRC32 over the key, with
    // the leb128-encoded collection id prefixed when collections are active.
    pub fn vbucket_by_key(&self, collection_id: u32, key: &[u8]) -> u16 {
        let checksum = if collection_id != 0 {
            let mut prefix_buf = [0u8; 5];
            let prefix_len = make_uleb128_32(collection_id, &mut prefix_buf);

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&prefix_buf[..prefix_len]);
            hasher.update(key);
            hasher.finalize()
        } else {
            crc32fast::hash(key)
        };

        (checksum as usize & (self.entries.len() - 1)) as u16
    }

    pub fn node_by_vbucket(&self, vb_id: u16, vb_server_idx: u32) -> Result<i16> {
        let num_servers = (self.num_replicas as u32) + 1;
        if vb_server_idx >= num_servers {
            return Err(ErrorKind::InvalidArgument {
                msg: format!("invalid replica index {vb_server_idx}"),
            }
            .into());
        }

        if let Some(entry) = self.entries.get(vb_id as usize) {
            if let Some(id) = entry.get(vb_server_idx as usize) {
                Ok(*id)
            } else {
                Ok(-1)
            }
        } else {
            Err(ErrorKind::InvalidArgument {
                msg: format!("invalid vbucket {vb_id}"),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::vbucketmap::VbucketMap;

    #[test]
    fn vbucketmap_with_1024_vbs() {
        let vb_map = VbucketMap::new(vec![vec![]; 1024], 1).unwrap();

        assert_eq!(0x038du16, vb_map.vbucket_by_key(0, &[0]));
        assert_eq!(0x009fu16, vb_map.vbucket_by_key(0, &[0, 1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(0x0286u16, vb_map.vbucket_by_key(0, b"hello"));
        assert_eq!(
            0x00d0u16,
            vb_map.vbucket_by_key(
                0,
                b"hello world, I am a super long key lets see if it works"
            )
        );
    }

    #[test]
    fn vbucketmap_with_64_vbs() {
        let vb_map = VbucketMap::new(vec![vec![]; 64], 1).unwrap();

        assert_eq!(0x000du16, vb_map.vbucket_by_key(0, &[0]));
        assert_eq!(0x001fu16, vb_map.vbucket_by_key(0, &[0, 1, 2, 3, 4, 5, 6, 7]));
        assert_eq!(0x0006u16, vb_map.vbucket_by_key(0, b"hello"));
        assert_eq!(
            0x0010u16,
            vb_map.vbucket_by_key(
                0,
                b"hello world, I am a super long key lets see if it works"
            )
        );
    }

    #[test]
    fn vbucketmap_hashes_collection_prefix() {
        let vb_map = VbucketMap::new(vec![vec![]; 1024], 1).unwrap();

        // The collection id takes part in the hash, so the same key in a
        // different collection may land on a different vbucket.
        assert_eq!(0x01f0u16, vb_map.vbucket_by_key(9, b"hello"));
        assert_eq!(0x0286u16, vb_map.vbucket_by_key(0, b"hello"));

        let vb_map = VbucketMap::new(vec![vec![]; 256], 1).unwrap();
        assert_eq!(0x0043u16, vb_map.vbucket_by_key(200, b"doc-1"));
    }

    #[test]
    fn vbucketmap_is_stable_across_calls() {
        let vb_map = VbucketMap::new(vec![vec![]; 1024], 1).unwrap();
        for _ in 0..4 {
            assert_eq!(
                vb_map.vbucket_by_key(12, b"stable-key"),
                vb_map.vbucket_by_key(12, b"stable-key")
            );
        }
    }

    #[test]
    fn vbucketmap_rejects_non_power_of_two() {
        assert!(VbucketMap::new(vec![vec![]; 48], 1).is_err());
        assert!(VbucketMap::new(vec![vec![]; 13], 1).is_err());
        assert!(VbucketMap::new(vec![], 1).is_err());
    }

    #[test]
    fn node_lookup_respects_replica_index() {
        let vb_map = VbucketMap::new(vec![vec![0, 1], vec![1, -1]], 1).unwrap();

        assert_eq!(vb_map.node_by_vbucket(0, 0).unwrap(), 0);
        assert_eq!(vb_map.node_by_vbucket(0, 1).unwrap(), 1);
        assert_eq!(vb_map.node_by_vbucket(1, 1).unwrap(), -1);
        assert!(vb_map.node_by_vbucket(0, 2).is_err());
        assert!(vb_map.node_by_vbucket(5, 0).is_err());
    }
}
