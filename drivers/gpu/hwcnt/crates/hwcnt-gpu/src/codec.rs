//! # Enable-Map Codec
//!
//! Conversion between the 128-bit per-value enable abstraction and the
//! 32-bit PRFCNT_*_EN registers.
//!
//! ## Packing
//!
//! One physical bit enables four consecutive values, so the conversion is
//! lossy: requesting a single value turns on its three neighbours as well.
//!
//! ```text
//!  abstract lo: [ 63..60 | ... | 7..4 | 3..0 ]   ──▶ physical bits 15..0
//!  abstract hi: [ 63..60 | ... | 7..4 | 3..0 ]   ──▶ physical bits 31..16
//! ```

use alloc::sync::Arc;

use hwcnt_core::EnableMap;

use crate::block::{v5_block_type, BlockRole};
use crate::layout::CounterSet;

/// Abstract values per physical enable bit
const VALUES_PER_PHYSICAL_BIT: u32 = 4;
/// Physical bits covering one 64-bit abstract word
const PHYSICAL_BITS_PER_WORD: u32 = u64::BITS / VALUES_PER_PHYSICAL_BIT;

fn pack_word(word: u64) -> u16 {
    (0..PHYSICAL_BITS_PER_WORD).fold(0u16, |packed, bit| {
        let group = (word >> (bit * VALUES_PER_PHYSICAL_BIT)) & 0xF;
        if group != 0 {
            packed | (1 << bit)
        } else {
            packed
        }
    })
}

fn unpack_word(packed: u16) -> u64 {
    (0..PHYSICAL_BITS_PER_WORD).fold(0u64, |word, bit| {
        if packed & (1 << bit) != 0 {
            word | (0xF << (bit * VALUES_PER_PHYSICAL_BIT))
        } else {
            word
        }
    })
}

/// Pack a 128-bit block enable map into a 32-bit physical enable map
#[inline]
pub fn block_map_to_physical(lo: u64, hi: u64) -> u32 {
    u32::from(pack_word(lo)) | (u32::from(pack_word(hi)) << 16)
}

/// Unpack a 32-bit physical enable map into `(lo, hi)` 64-bit halves
#[inline]
pub fn block_map_from_physical(phys: u32) -> (u64, u64) {
    (unpack_word(phys as u16), unpack_word((phys >> 16) as u16))
}

// =============================================================================
// PHYSICAL ENABLE MAP
// =============================================================================

/// Register-level enable bitmaps, one per block role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicalEnableMap {
    /// Front-end (PRFCNT_JM_EN / PRFCNT_CSHW_EN)
    pub fe_bm: u32,
    /// Shader cores (PRFCNT_SHADER_EN)
    pub shader_bm: u32,
    /// Tiler (PRFCNT_TILER_EN)
    pub tiler_bm: u32,
    /// Memory system (PRFCNT_MMU_L2_EN)
    pub mmu_l2_bm: u32,
}

impl PhysicalEnableMap {
    /// Bitmap for a role
    pub fn role(&self, role: BlockRole) -> u32 {
        match role {
            BlockRole::FrontEnd => self.fe_bm,
            BlockRole::Tiler => self.tiler_bm,
            BlockRole::Memsys => self.mmu_l2_bm,
            BlockRole::ShaderCore => self.shader_bm,
        }
    }
}

/// Collapse an enable map into the physical registers
///
/// Every instance of a role shares one register, so the role bitmap is the
/// union of its instances. Undefined blocks contribute nothing.
pub fn enable_map_to_physical(src: &EnableMap) -> PhysicalEnableMap {
    let metadata = src.metadata();

    let mut fe_bm = 0u64;
    let mut shader_bm = 0u64;
    let mut tiler_bm = 0u64;
    let mut mmu_l2_bm = 0u64;

    for bi in metadata.block_instances() {
        let blk_map = src.block_instance(bi.group, bi.block, bi.instance);
        match v5_block_type(metadata, bi.group, bi.block).role() {
            None => {}
            Some(BlockRole::FrontEnd) => fe_bm |= blk_map[0],
            Some(BlockRole::Tiler) => tiler_bm |= blk_map[0],
            Some(BlockRole::ShaderCore) => shader_bm |= blk_map[0],
            Some(BlockRole::Memsys) => mmu_l2_bm |= blk_map[0],
        }
    }

    PhysicalEnableMap {
        fe_bm: block_map_to_physical(fe_bm, 0),
        shader_bm: block_map_to_physical(shader_bm, 0),
        tiler_bm: block_map_to_physical(tiler_bm, 0),
        mmu_l2_bm: block_map_to_physical(mmu_l2_bm, 0),
    }
}

/// Expand physical registers back into an enable map
///
/// Each role's bitmap is written to every instance of that role; undefined
/// blocks are left as they are.
pub fn enable_map_from_physical(dst: &mut EnableMap, src: &PhysicalEnableMap) {
    let metadata = Arc::clone(dst.metadata());
    for bi in metadata.block_instances() {
        let Some(role) = v5_block_type(&metadata, bi.group, bi.block).role() else {
            continue;
        };
        let (bm, _) = block_map_from_physical(src.role(role));
        dst.block_instance_mut(bi.group, bi.block, bi.instance)[0] = bm;
    }
}

// =============================================================================
// COUNTER SET
// =============================================================================

/// Counter set selector as programmed into PRFCNT_CONFIG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PhysicalSet {
    /// Primary counters
    Primary = 0,
    /// Secondary counters
    Secondary = 1,
    /// Tertiary counters
    Tertiary = 2,
}

/// Map a counter set to its register encoding
pub const fn set_to_physical(set: CounterSet) -> PhysicalSet {
    match set {
        CounterSet::Primary => PhysicalSet::Primary,
        CounterSet::Secondary => PhysicalSet::Secondary,
        CounterSet::Tertiary => PhysicalSet::Tertiary,
    }
}

impl From<CounterSet> for PhysicalSet {
    fn from(set: CounterSet) -> Self {
        set_to_physical(set)
    }
}
