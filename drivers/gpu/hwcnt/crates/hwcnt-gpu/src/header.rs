//! # Dump Header Patching
//!
//! Rewrites the PRFCNT_EN header of every block so a dump reports the
//! enable state it was actually collected with.

use alloc::sync::Arc;

use hwcnt_core::{contract_violation, DumpBuffer, EnableMap};

use crate::block::{GroupType, V5_PRFCNT_EN_HEADER};
use crate::codec::block_map_to_physical;

/// Store each block instance's packed enable bitmap in header word 2
pub fn patch_dump_headers(buf: &mut DumpBuffer, enable_map: &EnableMap) {
    if !enable_map.is_bound_to(buf.metadata()) {
        contract_violation(format_args!(
            "patching dump headers with an enable map from different metadata"
        ));
    }

    let metadata = Arc::clone(buf.metadata());
    for bi in metadata.block_instances() {
        let grp_type = metadata.group_type(bi.group);
        if GroupType::from_id(grp_type).is_none() {
            contract_violation(format_args!(
                "group {} has non-v5 type {:#x}",
                bi.group, grp_type
            ));
        }

        let blk_map = enable_map.block_instance(bi.group, bi.block, bi.instance);
        let prfcnt_en = block_map_to_physical(blk_map[0], 0);
        buf.block_instance_mut(bi.group, bi.block, bi.instance)[V5_PRFCNT_EN_HEADER] = prfcnt_en;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{CounterSet, GpuInfo};
    use crate::metadata::jm_metadata_create;
    use hwcnt_core::Metadata;

    fn metadata() -> Arc<Metadata> {
        let gpu = GpuInfo {
            l2_count: 1,
            core_mask: 0b11,
            clk_cnt: 1,
        };
        jm_metadata_create(&gpu, CounterSet::Primary).unwrap().metadata
    }

    #[test]
    fn test_front_end_header() {
        let md = metadata();
        let mut map = EnableMap::new(&md).unwrap();
        for val in 0..4 {
            map.enable_value(0, 0, 0, val);
        }
        let mut buf = DumpBuffer::new(&md).unwrap();

        patch_dump_headers(&mut buf, &map);

        assert_eq!(buf.block_instance(0, 0, 0)[V5_PRFCNT_EN_HEADER], 0x0000_0001);
        assert_eq!(buf.block_instance(0, 1, 0)[V5_PRFCNT_EN_HEADER], 0);
    }

    #[test]
    fn test_only_header_slot_is_written() {
        let md = metadata();
        let mut map = EnableMap::new(&md).unwrap();
        map.enable_all();
        let mut buf = DumpBuffer::new(&md).unwrap();
        for bi in md.block_instances() {
            buf.block_instance_mut(bi.group, bi.block, bi.instance).fill(0xAB);
        }

        patch_dump_headers(&mut buf, &map);

        for bi in md.block_instances() {
            let blk = buf.block_instance(bi.group, bi.block, bi.instance);
            assert_eq!(blk[V5_PRFCNT_EN_HEADER], 0xFFFF);
            assert!(blk
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != V5_PRFCNT_EN_HEADER)
                .all(|(_, &v)| v == 0xAB));
        }
    }

    #[test]
    fn test_headers_are_per_instance() {
        let md = metadata();
        let mut map = EnableMap::new(&md).unwrap();
        map.enable_value(0, 3, 1, 62);
        let mut buf = DumpBuffer::new(&md).unwrap();

        patch_dump_headers(&mut buf, &map);

        assert_eq!(buf.block_instance(0, 3, 0)[V5_PRFCNT_EN_HEADER], 0);
        assert_eq!(buf.block_instance(0, 3, 1)[V5_PRFCNT_EN_HEADER], 0x8000);
    }

    #[test]
    #[should_panic(expected = "different metadata")]
    fn test_foreign_enable_map_is_fatal() {
        let map = EnableMap::new(&metadata()).unwrap();
        let mut buf = DumpBuffer::new(&metadata()).unwrap();
        patch_dump_headers(&mut buf, &map);
    }
}
