//! # Dump Merge Engine
//!
//! Copies or accumulates a raw hardware dump into a [`DumpBuffer`].
//!
//! The raw dump is a flat run of native-endian 32-bit words, one full block
//! record per block instance in metadata order. Every record is stepped over
//! whether or not it is merged, so the source offset always tracks the
//! layout.

use alloc::sync::Arc;

use hwcnt_core::{
    block_accumulate, block_copy, block_zero, DumpBuffer, EnableMap, Error, Result,
    MAX_VALUES_PER_BLOCK, VALUE_BYTES,
};

use crate::block::v5_block_type;
use crate::layout::ChipFamily;

/// How shader-core availability is resolved while merging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreAvailability {
    /// Job-manager dumps: bit `n` of the mask covers the `n`th shader-core
    /// instance, one bit consumed per shader-core block whether or not it is
    /// enabled
    Mask(u64),
    /// Command-stream dumps: availability was applied before the dump
    Resolved,
}

/// Decode one block record from the raw dump
fn read_block<'a>(src: &[u8], word_offset: usize, out: &'a mut [u32]) -> &'a [u32] {
    let start = word_offset * VALUE_BYTES;
    let bytes = &src[start..start + out.len() * VALUE_BYTES];
    for (v, b) in out.iter_mut().zip(bytes.chunks_exact(VALUE_BYTES)) {
        *v = u32::from_ne_bytes([b[0], b[1], b[2], b[3]]);
    }
    out
}

/// Merge a raw dump into `dst`
///
/// For every enabled block instance the source record is copied, or added
/// with 32-bit wraparound when `accumulate` is set. Under
/// [`CoreAvailability::Mask`] a shader core whose mask bit is clear
/// contributes nothing: its destination is zeroed when copying and left
/// alone when accumulating.
pub fn dump_get(
    dst: &mut DumpBuffer,
    src: &[u8],
    enable_map: &EnableMap,
    availability: CoreAvailability,
    accumulate: bool,
) -> Result<()> {
    if !enable_map.is_bound_to(dst.metadata()) {
        log::warn!("hwcnt: dump destination and enable map use different metadata");
        return Err(Error::MetadataMismatch);
    }
    if src.is_empty() {
        return Err(Error::InvalidParameter);
    }

    let metadata = Arc::clone(dst.metadata());
    let required = metadata.dump_buf_bytes();
    if src.len() < required {
        log::warn!(
            "hwcnt: raw dump is {} bytes, layout needs {}",
            src.len(),
            required
        );
        return Err(Error::SourceTooSmall {
            required,
            provided: src.len(),
        });
    }

    let mut core_mask = match availability {
        CoreAvailability::Mask(mask) => Some(mask),
        CoreAvailability::Resolved => None,
    };
    let mut scratch = [0u32; MAX_VALUES_PER_BLOCK];
    let mut src_offset = 0;

    for bi in metadata.block_instances() {
        let val_cnt = metadata.block_values_count(bi.group, bi.block);
        let is_shader_core =
            core_mask.is_some() && v5_block_type(&metadata, bi.group, bi.block).is_shader();

        if enable_map.block_enabled(bi.group, bi.block, bi.instance) {
            let dst_blk = dst.block_instance_mut(bi.group, bi.block, bi.instance);
            let core_present = !is_shader_core || core_mask.map_or(true, |mask| mask & 1 != 0);

            if core_present {
                let src_blk = read_block(src, src_offset, &mut scratch[..val_cnt]);
                if accumulate {
                    block_accumulate(dst_blk, src_blk);
                } else {
                    block_copy(dst_blk, src_blk);
                }
            } else if !accumulate {
                block_zero(dst_blk);
            }
        }

        src_offset += val_cnt;
        if is_shader_core {
            core_mask = core_mask.map(|mask| mask >> 1);
        }
    }

    Ok(())
}

/// Merge a job-manager dump, resolving shader availability from
/// `pm_core_mask`
pub fn jm_dump_get(
    dst: &mut DumpBuffer,
    src: &[u8],
    enable_map: &EnableMap,
    pm_core_mask: u64,
    accumulate: bool,
) -> Result<()> {
    let availability = ChipFamily::JobManager.core_availability(pm_core_mask);
    dump_get(dst, src, enable_map, availability, accumulate)
}

/// Merge a command-stream dump; every enabled block is merged
pub fn csf_dump_get(
    dst: &mut DumpBuffer,
    src: &[u8],
    enable_map: &EnableMap,
    accumulate: bool,
) -> Result<()> {
    dump_get(dst, src, enable_map, CoreAvailability::Resolved, accumulate)
}
