//! Reader for uncompressed Mercurial v1 bundles.
//!
//! Only the changelog group is interpreted. The layout is:
//!
//! ```text
//! "HG10UN"
//! repeated:
//!   u32 big-endian   length of the whole record, including these 4 bytes
//!   [u8; 20] node    changeset id
//!   [u8; 20] p1      first parent
//!   [u8; 20] p2      second parent (null when absent)
//!   [u8; 20] cs      linked changeset
//!   length - 84      delta payload, skipped
//! ```
//!
//! git-cinnabar writes one changelog record per commit in the requested
//! range, oldest first, so records are paired with commits positionally. The
//! parent chain check is what catches the two falling out of step.

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use tracing::trace;

use crate::bridge::error::{BridgeResult, BundleFormatError};
use crate::bridge::mapping::{ForeignId, IdMapping};
use crate::vcs::CommitInfo;

/// Magic token of an uncompressed changegroup bundle.
pub const BUNDLE_MAGIC: &[u8; 6] = b"HG10UN";

/// Size of the length prefix plus the four node ids.
const RECORD_HEADER_LEN: i64 = 84;

const NODE_LEN: usize = 20;

/// The fixed part of one changelog record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetHeader {
    pub node: ForeignId,
    pub p1: ForeignId,
    pub p2: ForeignId,
    pub changeset: ForeignId,
}

/// Streaming reader over the records of a bundle.
pub struct BundleReader<R> {
    inner: R,
}

impl<R: Read> BundleReader<R> {
    /// Check the magic token and position the reader on the first record.
    pub fn new(mut inner: R) -> Result<Self, BundleFormatError> {
        let mut magic = [0u8; 6];
        let read = read_up_to(&mut inner, &mut magic)
            .map_err(|_| BundleFormatError::Truncated { what: "bundle type" })?;
        if &magic[..read] != BUNDLE_MAGIC {
            return Err(BundleFormatError::BadMagic {
                found: magic[..read].to_vec(),
            });
        }
        Ok(Self { inner })
    }

    /// Read the next record header and skip its payload.
    pub fn next_header(&mut self) -> Result<ChangesetHeader, BundleFormatError> {
        let length = self
            .inner
            .read_u32::<BigEndian>()
            .map_err(|_| BundleFormatError::Truncated { what: "record length" })?;

        let body_size = i64::from(length) - RECORD_HEADER_LEN;
        if body_size < 0 {
            return Err(BundleFormatError::NegativeBodySize { length });
        }

        let node = self.read_node()?;
        let p1 = self.read_node()?;
        let p2 = self.read_node()?;
        let changeset = self.read_node()?;

        // body_size is non-negative and bounded by u32::MAX here
        let body_size = body_size as u64;
        let skipped = io::copy(&mut (&mut self.inner).take(body_size), &mut io::sink())
            .map_err(|_| BundleFormatError::Truncated { what: "record body" })?;
        if skipped != body_size {
            return Err(BundleFormatError::Truncated { what: "record body" });
        }

        Ok(ChangesetHeader {
            node,
            p1,
            p2,
            changeset,
        })
    }

    fn read_node(&mut self) -> Result<ForeignId, BundleFormatError> {
        let mut node = [0u8; NODE_LEN];
        self.inner
            .read_exact(&mut node)
            .map_err(|_| BundleFormatError::Truncated { what: "record header" })?;
        Ok(ForeignId::from_node(&node))
    }
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Pair each commit of `batch` with the next bundle record and record its
/// changeset id.
///
/// `mapping` must already know the changeset of the first commit's parent.
pub fn read_mappings<R: Read>(reader: R, batch: &[CommitInfo], mapping: &mut IdMapping) -> BridgeResult<()> {
    let mut bundle = BundleReader::new(reader)?;

    for commit in batch {
        let header = bundle.next_header()?;

        let parent = commit.parent()?;
        let expected = mapping.get(&parent);
        if expected != Some(&header.p1) {
            return Err(BundleFormatError::ParentMismatch {
                commit: commit.id,
                expected: expected.cloned(),
                found: header.p1,
            }
            .into());
        }

        trace!("{} -> {}", commit.id, header.node);
        mapping.insert(commit.id, header.node);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bridge::error::BridgeError;
    use crate::vcs::{CommitId, Identity, TreeId, VcsError};
    use chrono::{FixedOffset, TimeZone};
    use std::io::Cursor;

    pub(crate) fn node(byte: u8) -> [u8; 20] {
        [byte; 20]
    }

    pub(crate) fn record(node: [u8; 20], p1: [u8; 20], body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(84 + body.len() as u32).to_be_bytes());
        out.extend_from_slice(&node);
        out.extend_from_slice(&p1);
        out.extend_from_slice(&[0u8; 20]);
        out.extend_from_slice(&node);
        out.extend_from_slice(body);
        out
    }

    pub(crate) fn bundle(records: &[Vec<u8>]) -> Vec<u8> {
        let mut out = BUNDLE_MAGIC.to_vec();
        for r in records {
            out.extend_from_slice(r);
        }
        out
    }

    fn commit_id(byte: u8) -> CommitId {
        CommitId::new(git2::Oid::from_bytes(&[byte; 20]).unwrap())
    }

    fn fake_commit(id: u8, parents: &[u8]) -> CommitInfo {
        let when = FixedOffset::east_opt(0).unwrap().timestamp_opt(0, 0).unwrap();
        let identity = Identity::new("Test", "test@test.com", when);
        CommitInfo {
            id: commit_id(id),
            tree_id: TreeId::new(git2::Oid::zero()),
            parent_ids: parents.iter().map(|p| commit_id(*p)).collect(),
            message: format!("commit {id}"),
            message_bytes: format!("commit {id}").into_bytes(),
            message_encoding: None,
            author: identity.clone(),
            committer: identity,
        }
    }

    fn seeded_mapping() -> IdMapping {
        let mut mapping = IdMapping::new();
        mapping.insert(commit_id(1), ForeignId::from_node(&node(0xa1)));
        mapping
    }

    #[test]
    fn test_reads_chain() {
        let data = bundle(&[
            record(node(0xa2), node(0xa1), b"payload one"),
            record(node(0xa3), node(0xa2), b""),
        ]);
        let batch = vec![fake_commit(2, &[1]), fake_commit(3, &[2])];
        let mut mapping = seeded_mapping();

        read_mappings(Cursor::new(data), &batch, &mut mapping).unwrap();

        assert_eq!(mapping.get(&commit_id(2)), Some(&ForeignId::from_node(&node(0xa2))));
        assert_eq!(mapping.get(&commit_id(3)), Some(&ForeignId::from_node(&node(0xa3))));
    }

    #[test]
    fn test_header_fields() {
        let data = bundle(&[record(node(0xa2), node(0xa1), b"xyz")]);
        let mut reader = BundleReader::new(Cursor::new(data)).unwrap();
        let header = reader.next_header().unwrap();

        assert_eq!(header.node, ForeignId::from_node(&node(0xa2)));
        assert_eq!(header.p1, ForeignId::from_node(&node(0xa1)));
        assert!(header.p2.is_null());
        assert_eq!(header.changeset, header.node);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = bundle(&[record(node(0xa2), node(0xa1), b"")]);
        data[2] = b'2';
        let result = read_mappings(Cursor::new(data), &[fake_commit(2, &[1])], &mut seeded_mapping());
        assert!(matches!(
            result,
            Err(BridgeError::Format(BundleFormatError::BadMagic { .. }))
        ));
    }

    #[test]
    fn test_short_stream_is_bad_magic() {
        let result = BundleReader::new(Cursor::new(b"HG".to_vec()));
        assert!(matches!(result, Err(BundleFormatError::BadMagic { found }) if found == b"HG"));
    }

    #[test]
    fn test_negative_body_size() {
        let mut data = BUNDLE_MAGIC.to_vec();
        data.extend_from_slice(&83u32.to_be_bytes());
        data.extend_from_slice(&[0u8; 80]);

        let result = read_mappings(Cursor::new(data), &[fake_commit(2, &[1])], &mut seeded_mapping());
        assert!(matches!(
            result,
            Err(BridgeError::Format(BundleFormatError::NegativeBodySize { length: 83 }))
        ));
    }

    #[test]
    fn test_parent_mismatch() {
        let data = bundle(&[
            record(node(0xa2), node(0xa1), b""),
            record(node(0xa3), node(0xff), b""),
        ]);
        let batch = vec![fake_commit(2, &[1]), fake_commit(3, &[2])];
        let mut mapping = seeded_mapping();

        let result = read_mappings(Cursor::new(data), &batch, &mut mapping);
        match result {
            Err(BridgeError::Format(BundleFormatError::ParentMismatch { commit, expected, found })) => {
                assert_eq!(commit, commit_id(3));
                assert_eq!(expected, Some(ForeignId::from_node(&node(0xa2))));
                assert_eq!(found, ForeignId::from_node(&node(0xff)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // records before the mismatch stay recorded
        assert!(mapping.contains(&commit_id(2)));
        assert!(!mapping.contains(&commit_id(3)));
    }

    #[test]
    fn test_unknown_base_is_mismatch() {
        let data = bundle(&[record(node(0xa2), node(0xa1), b"")]);
        let result = read_mappings(Cursor::new(data), &[fake_commit(2, &[1])], &mut IdMapping::new());
        assert!(matches!(
            result,
            Err(BridgeError::Format(BundleFormatError::ParentMismatch { expected: None, .. }))
        ));
    }

    #[test]
    fn test_truncated_body() {
        let mut data = bundle(&[record(node(0xa2), node(0xa1), b"0123456789")]);
        data.truncate(data.len() - 3);

        let result = read_mappings(Cursor::new(data), &[fake_commit(2, &[1])], &mut seeded_mapping());
        assert!(matches!(
            result,
            Err(BridgeError::Format(BundleFormatError::Truncated { what: "record body" }))
        ));
    }

    #[test]
    fn test_merge_commit_in_batch() {
        let data = bundle(&[record(node(0xa2), node(0xa1), b"")]);
        let result = read_mappings(Cursor::new(data), &[fake_commit(2, &[1, 9])], &mut seeded_mapping());
        assert!(matches!(
            result,
            Err(BridgeError::Vcs(VcsError::MergeCommitUnsupported(_)))
        ));
    }
}
