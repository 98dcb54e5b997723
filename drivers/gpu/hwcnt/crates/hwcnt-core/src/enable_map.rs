//! # Enable Maps
//!
//! Per-value request bitmaps, one 128-bit entry per block instance.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::{Error, Metadata, Result, BITFIELD_BITS, BLOCK_ENABLE_MAP_WORDS};

/// Enable bitmap of one block instance; bit `n` of the whole array requests
/// value `n` of the block.
pub type BlockEnableMap = [u64; BLOCK_ENABLE_MAP_WORDS];

/// Bits covering the first `values` values of a block
fn values_mask(values: usize) -> BlockEnableMap {
    let mut mask = [0u64; BLOCK_ENABLE_MAP_WORDS];
    for (word, m) in mask.iter_mut().enumerate() {
        let bits = values.saturating_sub(word * BITFIELD_BITS).min(BITFIELD_BITS);
        *m = low_bits(bits);
    }
    mask
}

#[inline]
fn low_bits(bits: usize) -> u64 {
    if bits >= u64::BITS as usize {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Request bitmap for every value of every block instance of a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnableMap {
    metadata: Arc<Metadata>,
    blocks: Vec<BlockEnableMap>,
    clk_enable_map: u64,
}

impl EnableMap {
    /// Allocate an enable map with nothing enabled
    pub fn new(metadata: &Arc<Metadata>) -> Result<Self> {
        let mut blocks = Vec::new();
        blocks
            .try_reserve_exact(metadata.instance_count())
            .map_err(|_| Error::OutOfMemory)?;
        blocks.resize(metadata.instance_count(), [0; BLOCK_ENABLE_MAP_WORDS]);

        Ok(Self {
            metadata: Arc::clone(metadata),
            blocks,
            clk_enable_map: 0,
        })
    }

    /// Metadata this map is bound to
    #[inline]
    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// Whether this map is bound to `metadata`
    #[inline]
    pub fn is_bound_to(&self, metadata: &Arc<Metadata>) -> bool {
        Arc::ptr_eq(&self.metadata, metadata)
    }

    #[inline]
    fn index(&self, grp: usize, blk: usize, inst: usize) -> usize {
        self.metadata.block(grp, blk).instance_index(inst)
    }

    /// Bitmap of one block instance
    #[inline]
    pub fn block_instance(&self, grp: usize, blk: usize, inst: usize) -> &BlockEnableMap {
        &self.blocks[self.index(grp, blk, inst)]
    }

    /// Mutable bitmap of one block instance
    #[inline]
    pub fn block_instance_mut(&mut self, grp: usize, blk: usize, inst: usize) -> &mut BlockEnableMap {
        let idx = self.index(grp, blk, inst);
        &mut self.blocks[idx]
    }

    /// Whether any value of a block instance is enabled
    pub fn block_enabled(&self, grp: usize, blk: usize, inst: usize) -> bool {
        let mask = values_mask(self.metadata.block_values_count(grp, blk));
        self.block_instance(grp, blk, inst)
            .iter()
            .zip(mask.iter())
            .any(|(bits, m)| bits & m != 0)
    }

    /// Whether any value of any block instance, or any clock, is enabled
    pub fn any_enabled(&self) -> bool {
        let clk_mask = low_bits(self.metadata.clk_cnt());
        self.clk_enable_map & clk_mask != 0
            || self
                .metadata
                .block_instances()
                .any(|bi| self.block_enabled(bi.group, bi.block, bi.instance))
    }

    /// Enable every value of one block instance
    pub fn enable_block_instance(&mut self, grp: usize, blk: usize, inst: usize) {
        let mask = values_mask(self.metadata.block_values_count(grp, blk));
        *self.block_instance_mut(grp, blk, inst) = mask;
    }

    /// Enable every value of every block instance and every clock
    pub fn enable_all(&mut self) {
        let metadata = Arc::clone(&self.metadata);
        for bi in metadata.block_instances() {
            self.enable_block_instance(bi.group, bi.block, bi.instance);
        }
        self.clk_enable_map = low_bits(metadata.clk_cnt());
    }

    /// Disable everything
    pub fn disable_all(&mut self) {
        self.blocks.fill([0; BLOCK_ENABLE_MAP_WORDS]);
        self.clk_enable_map = 0;
    }

    /// Enable one value of a block instance
    pub fn enable_value(&mut self, grp: usize, blk: usize, inst: usize, val: usize) {
        debug_assert!(val < self.metadata.block_values_count(grp, blk));
        let map = self.block_instance_mut(grp, blk, inst);
        map[val / BITFIELD_BITS] |= 1u64 << (val % BITFIELD_BITS);
    }

    /// Disable one value of a block instance
    pub fn disable_value(&mut self, grp: usize, blk: usize, inst: usize, val: usize) {
        debug_assert!(val < self.metadata.block_values_count(grp, blk));
        let map = self.block_instance_mut(grp, blk, inst);
        map[val / BITFIELD_BITS] &= !(1u64 << (val % BITFIELD_BITS));
    }

    /// Whether one value of a block instance is enabled
    pub fn value_enabled(&self, grp: usize, blk: usize, inst: usize, val: usize) -> bool {
        let map = self.block_instance(grp, blk, inst);
        map[val / BITFIELD_BITS] & (1u64 << (val % BITFIELD_BITS)) != 0
    }

    /// Clock-domain enable mask
    #[inline]
    pub fn clk_enable_map(&self) -> u64 {
        self.clk_enable_map
    }

    /// Enable cycle counting for a clock domain
    pub fn enable_clock(&mut self, clk: usize) -> Result<()> {
        if clk >= self.metadata.clk_cnt() {
            return Err(Error::InvalidParameter);
        }
        self.clk_enable_map |= 1u64 << clk;
        Ok(())
    }

    /// Whether cycle counting is enabled for a clock domain
    #[inline]
    pub fn clock_enabled(&self, clk: usize) -> bool {
        clk < self.metadata.clk_cnt() && self.clk_enable_map & (1u64 << clk) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockDescription, Description, GroupDescription};
    use alloc::vec;

    fn metadata(clk_cnt: usize) -> Arc<Metadata> {
        let blk = |type_id, inst_cnt| BlockDescription {
            type_id,
            inst_cnt,
            hdr_cnt: 4,
            ctr_cnt: 60,
        };
        Metadata::new(&Description {
            groups: vec![GroupDescription {
                type_id: 0,
                blocks: vec![blk(1, 1), blk(2, 2)],
            }],
            avail_mask: 0b111,
            clk_cnt,
        })
        .unwrap()
    }

    #[test]
    fn test_values_mask() {
        assert_eq!(values_mask(64), [u64::MAX, 0]);
        assert_eq!(values_mask(4), [0xF, 0]);
        assert_eq!(values_mask(70), [u64::MAX, 0x3F]);
        assert_eq!(values_mask(128), [u64::MAX, u64::MAX]);
    }

    #[test]
    fn test_new_map_is_empty() {
        let md = metadata(1);
        let map = EnableMap::new(&md).unwrap();
        assert!(map.is_bound_to(&md));
        assert!(!map.any_enabled());
        assert!(!map.block_enabled(0, 1, 1));
    }

    #[test]
    fn test_enable_all_and_disable_all() {
        let md = metadata(2);
        let mut map = EnableMap::new(&md).unwrap();

        map.enable_all();
        assert_eq!(*map.block_instance(0, 1, 1), [u64::MAX, 0]);
        assert_eq!(map.clk_enable_map(), 0b11);
        assert!(map.any_enabled());

        map.disable_all();
        assert!(!map.any_enabled());
    }

    #[test]
    fn test_single_value() {
        let md = metadata(0);
        let mut map = EnableMap::new(&md).unwrap();

        map.enable_value(0, 1, 1, 63);
        assert!(map.value_enabled(0, 1, 1, 63));
        assert!(map.block_enabled(0, 1, 1));
        assert!(!map.block_enabled(0, 1, 0));

        map.disable_value(0, 1, 1, 63);
        assert!(!map.block_enabled(0, 1, 1));
    }

    #[test]
    fn test_bits_past_value_count_do_not_enable_block() {
        let md = metadata(0);
        let mut map = EnableMap::new(&md).unwrap();
        map.block_instance_mut(0, 0, 0)[1] = 1;
        assert!(!map.block_enabled(0, 0, 0));
    }

    #[test]
    fn test_clock_enable() {
        let md = metadata(1);
        let mut map = EnableMap::new(&md).unwrap();
        assert!(map.enable_clock(0).is_ok());
        assert!(map.clock_enabled(0));
        assert_eq!(map.enable_clock(1), Err(Error::InvalidParameter));
        assert!(!map.clock_enabled(1));
    }

    #[test]
    fn test_binding_is_by_identity() {
        let a = metadata(0);
        let b = metadata(0);
        let map = EnableMap::new(&a).unwrap();
        assert_eq!(*a, *b);
        assert!(!map.is_bound_to(&b));
    }
}
