//! # Dump Buffers
//!
//! Collected counter values, laid out block instance after block instance as
//! described by the bound [`Metadata`].

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::{EnableMap, Error, Metadata, Result};

// =============================================================================
// BLOCK OPERATIONS
// =============================================================================

/// Overwrite a block instance with source values
#[inline]
pub fn block_copy(dst: &mut [u32], src: &[u32]) {
    dst.copy_from_slice(src);
}

/// Add source values into a block instance, wrapping at 32 bits
#[inline]
pub fn block_accumulate(dst: &mut [u32], src: &[u32]) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter_mut().zip(src) {
        *d = d.wrapping_add(*s);
    }
}

/// Zero a block instance
#[inline]
pub fn block_zero(dst: &mut [u32]) {
    dst.fill(0);
}

// =============================================================================
// DUMP BUFFER
// =============================================================================

/// Counter values for every block instance of a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpBuffer {
    metadata: Arc<Metadata>,
    values: Vec<u32>,
    /// Cycle counts, one per clock domain
    clk_cnt_buf: Vec<u64>,
}

impl DumpBuffer {
    /// Allocate a zeroed dump buffer
    pub fn new(metadata: &Arc<Metadata>) -> Result<Self> {
        let mut values = Vec::new();
        values
            .try_reserve_exact(metadata.dump_buf_values())
            .map_err(|_| Error::OutOfMemory)?;
        values.resize(metadata.dump_buf_values(), 0);

        let mut clk_cnt_buf = Vec::new();
        clk_cnt_buf
            .try_reserve_exact(metadata.clk_cnt())
            .map_err(|_| Error::OutOfMemory)?;
        clk_cnt_buf.resize(metadata.clk_cnt(), 0);

        Ok(Self {
            metadata: Arc::clone(metadata),
            values,
            clk_cnt_buf,
        })
    }

    /// Metadata this buffer is bound to
    #[inline]
    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// Whether this buffer is bound to `metadata`
    #[inline]
    pub fn is_bound_to(&self, metadata: &Arc<Metadata>) -> bool {
        Arc::ptr_eq(&self.metadata, metadata)
    }

    /// All values, in layout order
    #[inline]
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Values of one block instance
    pub fn block_instance(&self, grp: usize, blk: usize, inst: usize) -> &[u32] {
        let block = self.metadata.block(grp, blk);
        let start = block.dump_buf_offset(inst);
        &self.values[start..start + block.values_count()]
    }

    /// Mutable values of one block instance
    pub fn block_instance_mut(&mut self, grp: usize, blk: usize, inst: usize) -> &mut [u32] {
        let block = self.metadata.block(grp, blk);
        let start = block.dump_buf_offset(inst);
        let end = start + block.values_count();
        &mut self.values[start..end]
    }

    /// Cycle counts, one per clock domain
    #[inline]
    pub fn clk_cnt_buf(&self) -> &[u64] {
        &self.clk_cnt_buf
    }

    /// Mutable cycle counts
    #[inline]
    pub fn clk_cnt_buf_mut(&mut self) -> &mut [u64] {
        &mut self.clk_cnt_buf
    }

    /// Zero every value and cycle count
    pub fn zero(&mut self) {
        self.values.fill(0);
        self.clk_cnt_buf.fill(0);
    }

    /// Zero the values and cycle counts that `enable_map` does not request
    pub fn zero_non_enabled(&mut self, enable_map: &EnableMap) -> Result<()> {
        if !enable_map.is_bound_to(&self.metadata) {
            return Err(Error::MetadataMismatch);
        }

        let metadata = Arc::clone(&self.metadata);
        for bi in metadata.block_instances() {
            let blk = self.block_instance_mut(bi.group, bi.block, bi.instance);
            for (val, v) in blk.iter_mut().enumerate() {
                if !enable_map.value_enabled(bi.group, bi.block, bi.instance, val) {
                    *v = 0;
                }
            }
        }

        for (clk, cycles) in self.clk_cnt_buf.iter_mut().enumerate() {
            if !enable_map.clock_enabled(clk) {
                *cycles = 0;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockDescription, Description, GroupDescription};
    use alloc::vec;

    fn metadata() -> Arc<Metadata> {
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
            clk_cnt: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_accumulate_wraps() {
        let mut dst = [u32::MAX, 5, 0];
        block_accumulate(&mut dst, &[2, 5, 0]);
        assert_eq!(dst, [1, 10, 0]);
    }

    #[test]
    fn test_copy_and_zero() {
        let mut dst = [0u32; 4];
        block_copy(&mut dst, &[1, 2, 3, 4]);
        assert_eq!(dst, [1, 2, 3, 4]);
        block_zero(&mut dst);
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    fn test_new_buffer_is_zeroed() {
        let md = metadata();
        let buf = DumpBuffer::new(&md).unwrap();
        assert_eq!(buf.values().len(), 3 * 64);
        assert!(buf.values().iter().all(|&v| v == 0));
        assert_eq!(buf.clk_cnt_buf(), &[0, 0]);
    }

    #[test]
    fn test_block_instance_slices() {
        let md = metadata();
        let mut buf = DumpBuffer::new(&md).unwrap();
        buf.block_instance_mut(0, 1, 1).fill(9);

        assert_eq!(buf.block_instance(0, 1, 1).len(), 64);
        assert!(buf.values()[128..].iter().all(|&v| v == 9));
        assert!(buf.values()[..128].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_zero_non_enabled() {
        let md = metadata();
        let mut buf = DumpBuffer::new(&md).unwrap();
        buf.values.fill(3);
        buf.clk_cnt_buf_mut().fill(100);

        let mut map = EnableMap::new(&md).unwrap();
        map.enable_value(0, 1, 0, 5);
        map.enable_clock(1).unwrap();

        buf.zero_non_enabled(&map).unwrap();
        assert_eq!(buf.block_instance(0, 1, 0)[5], 3);
        assert_eq!(buf.values().iter().filter(|&&v| v != 0).count(), 1);
        assert_eq!(buf.clk_cnt_buf(), &[0, 100]);
    }

    #[test]
    fn test_zero_non_enabled_rejects_foreign_map() {
        let mut buf = DumpBuffer::new(&metadata()).unwrap();
        let map = EnableMap::new(&metadata()).unwrap();
        assert_eq!(buf.zero_non_enabled(&map), Err(Error::MetadataMismatch));
    }
}
