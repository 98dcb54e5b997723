//! # HWCNT GPU
//!
//! v5 GPU backend for the hardware counter containers in `hwcnt-core`.
//!
//! ## Pipeline
//!
//! ```text
//!  GpuInfo ──▶ layout ──▶ metadata ──▶ Arc<Metadata>
//!                                         │
//!       EnableMap ◀──── codec ────▶ PhysicalEnableMap (PRFCNT_*_EN)
//!           │
//!  raw dump ─┴──▶ dump ──▶ DumpBuffer ──▶ header (PRFCNT_EN patch)
//! ```
//!
//! - [`layout`]: block types, instance counts and availability for a GPU
//! - [`metadata`]: job-manager and command-stream metadata construction
//! - [`codec`]: enable map to and from physical register bitmaps
//! - [`dump`]: merging raw dumps, copying or accumulating
//! - [`header`]: writing the physical enable bitmap back into dump headers
//!
//! Every operation is a synchronous transform over caller-owned buffers.
//! Metadata is immutable once built; maps and buffers rely on `&mut` for
//! their single writer.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod block;
pub mod codec;
pub mod dump;
pub mod header;
pub mod layout;
pub mod metadata;

// Re-exports for convenience
pub use block::{BlockRole, GroupType, V5BlockType};
pub use codec::{
    block_map_from_physical, block_map_to_physical, enable_map_from_physical,
    enable_map_to_physical, set_to_physical, PhysicalEnableMap, PhysicalSet,
};
pub use dump::{csf_dump_get, dump_get, jm_dump_get, CoreAvailability};
pub use header::patch_dump_headers;
pub use layout::{ChipFamily, CounterSet, GpuInfo, V5Layout};
pub use metadata::{
    create_metadata, csf_metadata_create, csf_metadata_destroy, jm_metadata_create,
    jm_metadata_destroy, JmMetadata,
};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use hwcnt_core::{DumpBuffer, EnableMap};

    #[test]
    fn test_dump_cycle() {
        let gpu = GpuInfo {
            l2_count: 2,
            core_mask: 0b1101,
            clk_cnt: 1,
        };
        let jm = jm_metadata_create(&gpu, CounterSet::Primary).unwrap();
        let md = &jm.metadata;

        // Client asks for a single shader counter and a single L2 counter
        let mut requested = EnableMap::new(md).unwrap();
        requested.enable_value(0, 3, 0, 5);
        requested.enable_value(0, 2, 1, 40);

        // What the hardware will actually collect
        let phys = enable_map_to_physical(&requested);
        assert_eq!(phys.shader_bm, 0x2);
        assert_eq!(phys.mmu_l2_bm, 0x400);
        assert_eq!(phys.fe_bm, 0);

        let mut collected = EnableMap::new(md).unwrap();
        enable_map_from_physical(&mut collected, &phys);
        assert!(collected.block_enabled(0, 3, 3));
        assert!(collected.block_enabled(0, 2, 0));
        assert!(!collected.block_enabled(0, 0, 0));

        let src = vec![0x01u8; jm.dump_bytes];
        let mut buf = DumpBuffer::new(md).unwrap();
        jm_dump_get(&mut buf, &src, &collected, gpu.core_mask, true).unwrap();
        jm_dump_get(&mut buf, &src, &collected, gpu.core_mask, true).unwrap();
        patch_dump_headers(&mut buf, &collected);

        // Core 1 is missing from the mask, core 3 is present
        assert_eq!(buf.block_instance(0, 3, 1)[10], 0);
        assert_eq!(buf.block_instance(0, 3, 3)[10], 0x0202_0202);
        assert_eq!(buf.block_instance(0, 3, 3)[2], 0x2);
        assert_eq!(buf.block_instance(0, 0, 0)[10], 0);
        assert_eq!(buf.block_instance(0, 2, 0)[2], 0x400);

        jm_metadata_destroy(Some(jm.metadata.clone()));
        assert_eq!(set_to_physical(CounterSet::Primary), PhysicalSet::Primary);
    }
}
