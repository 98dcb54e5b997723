//! # Counter Metadata
//!
//! Immutable description of a counter layout, and the indexing every
//! container bound to it relies on.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::{Error, Result, AVAIL_MASK_BITS, MAX_CLOCK_DOMAINS, MAX_VALUES_PER_BLOCK, VALUE_BYTES};

// =============================================================================
// DESCRIPTIONS
// =============================================================================

/// Description of one block type within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescription {
    /// Backend-specific block type id
    pub type_id: u64,
    /// Number of instances of this block
    pub inst_cnt: usize,
    /// Number of header values per instance
    pub hdr_cnt: usize,
    /// Number of counter values per instance
    pub ctr_cnt: usize,
}

impl BlockDescription {
    /// Header plus counter values per instance
    #[inline]
    pub const fn values_count(&self) -> usize {
        self.hdr_cnt + self.ctr_cnt
    }
}

/// Description of one group of blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    /// Backend-specific group type id
    pub type_id: u64,
    /// Blocks in this group, in layout order
    pub blocks: Vec<BlockDescription>,
}

/// Full layout description used to build [`Metadata`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    /// Groups, in layout order
    pub groups: Vec<GroupDescription>,
    /// Bit `i` set if block instance `i` physically exists
    pub avail_mask: u64,
    /// Number of clock domains
    pub clk_cnt: usize,
}

// =============================================================================
// METADATA
// =============================================================================

/// Resolved layout of one block type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMetadata {
    type_id: u64,
    inst_cnt: usize,
    hdr_cnt: usize,
    ctr_cnt: usize,
    /// Flat index of instance 0 (enable-map entry and availability bit)
    instance_index: usize,
    /// Dump-buffer value offset of instance 0
    dump_buf_index: usize,
}

impl BlockMetadata {
    /// Block type id
    #[inline]
    pub fn type_id(&self) -> u64 {
        self.type_id
    }

    /// Number of instances
    #[inline]
    pub fn instance_count(&self) -> usize {
        self.inst_cnt
    }

    /// Header values per instance
    #[inline]
    pub fn headers_count(&self) -> usize {
        self.hdr_cnt
    }

    /// Counter values per instance
    #[inline]
    pub fn counters_count(&self) -> usize {
        self.ctr_cnt
    }

    /// Total values per instance
    #[inline]
    pub fn values_count(&self) -> usize {
        self.hdr_cnt + self.ctr_cnt
    }

    /// Flat index of the given instance
    #[inline]
    pub fn instance_index(&self, inst: usize) -> usize {
        self.instance_index + inst
    }

    /// Dump-buffer value offset of the given instance
    #[inline]
    pub fn dump_buf_offset(&self, inst: usize) -> usize {
        self.dump_buf_index + inst * self.values_count()
    }
}

/// Resolved layout of one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMetadata {
    type_id: u64,
    blocks: Vec<BlockMetadata>,
}

impl GroupMetadata {
    /// Group type id
    #[inline]
    pub fn type_id(&self) -> u64 {
        self.type_id
    }

    /// Blocks in layout order
    #[inline]
    pub fn blocks(&self) -> &[BlockMetadata] {
        &self.blocks
    }
}

/// Position of one block instance within a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInstance {
    /// Group index
    pub group: usize,
    /// Block index within the group
    pub block: usize,
    /// Instance index within the block
    pub instance: usize,
    /// Flat index over all instances (also the availability bit)
    pub index: usize,
}

/// Immutable counter layout
///
/// Shared between sessions as `Arc<Metadata>`. Containers created from the
/// same `Arc` are considered bound to the same metadata.
#[derive(Debug, PartialEq, Eq)]
pub struct Metadata {
    groups: Vec<GroupMetadata>,
    avail_mask: u64,
    clk_cnt: usize,
    instance_count: usize,
    dump_buf_values: usize,
}

impl Metadata {
    /// Build metadata from a layout description
    pub fn new(desc: &Description) -> Result<Arc<Self>> {
        if desc.groups.is_empty() || desc.clk_cnt > MAX_CLOCK_DOMAINS {
            return Err(Error::InvalidParameter);
        }

        let mut instance_count = 0usize;
        for group in &desc.groups {
            if group.blocks.is_empty() {
                return Err(Error::InvalidParameter);
            }
            for blk in &group.blocks {
                if blk.values_count() == 0 || blk.values_count() > MAX_VALUES_PER_BLOCK {
                    return Err(Error::InvalidParameter);
                }
                instance_count = instance_count.saturating_add(blk.inst_cnt);
            }
        }

        if instance_count > AVAIL_MASK_BITS {
            log::warn!(
                "hwcnt: layout has {} block instances, limit is {}",
                instance_count,
                AVAIL_MASK_BITS
            );
            return Err(Error::CapacityExceeded {
                instances: instance_count,
                limit: AVAIL_MASK_BITS,
            });
        }

        let mut groups = Vec::new();
        groups
            .try_reserve_exact(desc.groups.len())
            .map_err(|_| Error::OutOfMemory)?;

        let mut instance_index = 0;
        let mut dump_buf_index = 0;
        for group in &desc.groups {
            let mut blocks = Vec::new();
            blocks
                .try_reserve_exact(group.blocks.len())
                .map_err(|_| Error::OutOfMemory)?;

            for blk in &group.blocks {
                blocks.push(BlockMetadata {
                    type_id: blk.type_id,
                    inst_cnt: blk.inst_cnt,
                    hdr_cnt: blk.hdr_cnt,
                    ctr_cnt: blk.ctr_cnt,
                    instance_index,
                    dump_buf_index,
                });
                instance_index += blk.inst_cnt;
                dump_buf_index += blk.inst_cnt * blk.values_count();
            }

            groups.push(GroupMetadata {
                type_id: group.type_id,
                blocks,
            });
        }

        Ok(Arc::new(Self {
            groups,
            avail_mask: desc.avail_mask,
            clk_cnt: desc.clk_cnt,
            instance_count,
            dump_buf_values: dump_buf_index,
        }))
    }

    /// Groups in layout order
    #[inline]
    pub fn groups(&self) -> &[GroupMetadata] {
        &self.groups
    }

    /// Number of groups
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Type id of a group
    #[inline]
    pub fn group_type(&self, grp: usize) -> u64 {
        self.groups[grp].type_id
    }

    /// Number of blocks in a group
    #[inline]
    pub fn block_count(&self, grp: usize) -> usize {
        self.groups[grp].blocks.len()
    }

    /// Resolved layout of a block
    #[inline]
    pub fn block(&self, grp: usize, blk: usize) -> &BlockMetadata {
        &self.groups[grp].blocks[blk]
    }

    /// Type id of a block
    #[inline]
    pub fn block_type(&self, grp: usize, blk: usize) -> u64 {
        self.block(grp, blk).type_id
    }

    /// Instance count of a block
    #[inline]
    pub fn block_instance_count(&self, grp: usize, blk: usize) -> usize {
        self.block(grp, blk).inst_cnt
    }

    /// Header values per instance of a block
    #[inline]
    pub fn block_headers_count(&self, grp: usize, blk: usize) -> usize {
        self.block(grp, blk).hdr_cnt
    }

    /// Counter values per instance of a block
    #[inline]
    pub fn block_counters_count(&self, grp: usize, blk: usize) -> usize {
        self.block(grp, blk).ctr_cnt
    }

    /// Total values per instance of a block
    #[inline]
    pub fn block_values_count(&self, grp: usize, blk: usize) -> usize {
        self.block(grp, blk).values_count()
    }

    /// Availability mask over all block instances
    #[inline]
    pub fn avail_mask(&self) -> u64 {
        self.avail_mask
    }

    /// Whether a block instance physically exists
    pub fn instance_available(&self, grp: usize, blk: usize, inst: usize) -> bool {
        let bit = self.block(grp, blk).instance_index(inst);
        self.avail_mask & (1u64 << bit) != 0
    }

    /// Number of clock domains
    #[inline]
    pub fn clk_cnt(&self) -> usize {
        self.clk_cnt
    }

    /// Total number of block instances
    #[inline]
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Number of 32-bit values in a dump buffer
    #[inline]
    pub fn dump_buf_values(&self) -> usize {
        self.dump_buf_values
    }

    /// Size of a dump buffer in bytes
    #[inline]
    pub fn dump_buf_bytes(&self) -> usize {
        self.dump_buf_values * VALUE_BYTES
    }

    /// Walk every block instance in layout order
    pub fn block_instances(&self) -> impl Iterator<Item = BlockInstance> + '_ {
        self.groups.iter().enumerate().flat_map(|(group, grp)| {
            grp.blocks.iter().enumerate().flat_map(move |(block, blk)| {
                (0..blk.inst_cnt).map(move |instance| BlockInstance {
                    group,
                    block,
                    instance,
                    index: blk.instance_index(instance),
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn block(type_id: u64, inst_cnt: usize) -> BlockDescription {
        BlockDescription {
            type_id,
            inst_cnt,
            hdr_cnt: 4,
            ctr_cnt: 60,
        }
    }

    fn desc(blocks: Vec<BlockDescription>) -> Description {
        Description {
            groups: vec![GroupDescription { type_id: 7, blocks }],
            avail_mask: u64::MAX,
            clk_cnt: 1,
        }
    }

    #[test]
    fn test_layout_offsets() {
        let md = Metadata::new(&desc(vec![block(1, 1), block(2, 3), block(3, 2)])).unwrap();

        assert_eq!(md.instance_count(), 6);
        assert_eq!(md.dump_buf_values(), 6 * 64);
        assert_eq!(md.dump_buf_bytes(), 6 * 64 * 4);
        assert_eq!(md.block(0, 1).dump_buf_offset(0), 64);
        assert_eq!(md.block(0, 1).dump_buf_offset(2), 192);
        assert_eq!(md.block(0, 2).instance_index(1), 5);
        assert_eq!(md.group_type(0), 7);
        assert_eq!(md.block_type(0, 2), 3);
    }

    #[test]
    fn test_iteration_order() {
        let md = Metadata::new(&desc(vec![block(1, 1), block(2, 0), block(3, 2)])).unwrap();
        let walk: Vec<_> = md
            .block_instances()
            .map(|bi| (bi.block, bi.instance, bi.index))
            .collect();
        assert_eq!(walk, vec![(0, 0, 0), (2, 0, 1), (2, 1, 2)]);
    }

    #[test]
    fn test_capacity_boundary() {
        assert!(Metadata::new(&desc(vec![block(1, 60), block(2, 4)])).is_ok());
        assert_eq!(
            Metadata::new(&desc(vec![block(1, 60), block(2, 5)])),
            Err(Error::CapacityExceeded {
                instances: 65,
                limit: 64
            })
        );
    }

    #[test]
    fn test_rejects_bad_descriptions() {
        let empty = Description {
            groups: vec![],
            avail_mask: 0,
            clk_cnt: 0,
        };
        assert_eq!(Metadata::new(&empty), Err(Error::InvalidParameter));

        let oversized = BlockDescription {
            type_id: 1,
            inst_cnt: 1,
            hdr_cnt: 4,
            ctr_cnt: 125,
        };
        assert_eq!(
            Metadata::new(&desc(vec![oversized])),
            Err(Error::InvalidParameter)
        );

        let mut clocks = desc(vec![block(1, 1)]);
        clocks.clk_cnt = MAX_CLOCK_DOMAINS + 1;
        assert_eq!(Metadata::new(&clocks), Err(Error::InvalidParameter));
    }

    #[test]
    fn test_instance_availability() {
        let mut d = desc(vec![block(1, 1), block(2, 3)]);
        d.avail_mask = 0b1011;
        let md = Metadata::new(&d).unwrap();

        assert!(md.instance_available(0, 0, 0));
        assert!(md.instance_available(0, 1, 0));
        assert!(!md.instance_available(0, 1, 1));
        assert!(md.instance_available(0, 1, 2));
    }
}
