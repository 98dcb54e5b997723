//! # Block Layout Planner
//!
//! Works out which block type fills each v5 role, how many instances each
//! role has, and which instances physically exist, for one GPU.
//!
//! ```text
//!  instance:  0    1      2 .. 2+L2-1        2+L2 .. 2+L2+fls(core_mask)-1
//!           ┌────┬───────┬──────────────────┬──────────────────────────────┐
//!           │ FE │ TILER │ MEMSYS × L2      │ SC × fls(core_mask)          │
//!           └────┴───────┴──────────────────┴──────────────────────────────┘
//!  avail:     1    1      1 ... 1            core_mask bits
//! ```

use alloc::vec::Vec;

use hwcnt_core::{
    BlockDescription, Description, Error, GroupDescription, Result, AVAIL_MASK_BITS, VALUE_BYTES,
};

use crate::block::{
    BlockRole, GroupType, V5BlockType, V5_BLOCK_TYPE_COUNT, V5_COUNTERS_PER_BLOCK,
    V5_HEADERS_PER_BLOCK, V5_VALUES_PER_BLOCK,
};
use crate::dump::CoreAvailability;

// =============================================================================
// CHIP DESCRIPTION
// =============================================================================

/// Counter information for the current GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuInfo {
    /// Number of L2 cache slices (memsys blocks)
    pub l2_count: usize,
    /// Bit `i` set if shader core `i` exists
    pub core_mask: u64,
    /// Number of clock domains
    pub clk_cnt: usize,
}

/// Counter set selected for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterSet {
    /// Primary counters
    Primary,
    /// Secondary counters
    Secondary,
    /// Tertiary counters
    Tertiary,
}

/// GPU family, which decides the block types available and how raw dumps
/// are framed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipFamily {
    /// Legacy job-manager GPUs: flat dumps, shader availability resolved
    /// while merging
    JobManager,
    /// Command-stream frontend GPUs: shader availability resolved before
    /// the dump reaches this layer
    CommandStream,
}

impl ChipFamily {
    /// Whether this is the command-stream frontend family
    #[inline]
    pub const fn is_csf(self) -> bool {
        matches!(self, Self::CommandStream)
    }

    /// Availability policy for dumps of this family
    pub const fn core_availability(self, pm_core_mask: u64) -> CoreAvailability {
        match self {
            Self::JobManager => CoreAvailability::Mask(pm_core_mask),
            Self::CommandStream => CoreAvailability::Resolved,
        }
    }
}

// =============================================================================
// BLOCK TYPE TABLE
// =============================================================================

/// Block type filling `role` for a counter set and chip family
pub const fn block_type(role: BlockRole, set: CounterSet, family: ChipFamily) -> V5BlockType {
    let csf = family.is_csf();
    match (role, set) {
        (BlockRole::FrontEnd, CounterSet::Primary) => V5BlockType::Fe,
        (BlockRole::FrontEnd, CounterSet::Secondary) if csf => V5BlockType::Fe2,
        (BlockRole::FrontEnd, CounterSet::Tertiary) if csf => V5BlockType::Fe3,
        (BlockRole::FrontEnd, _) => V5BlockType::Undefined,

        (BlockRole::Tiler, CounterSet::Primary) => V5BlockType::Tiler,
        (BlockRole::Tiler, _) => V5BlockType::Undefined,

        (BlockRole::Memsys, CounterSet::Primary) => V5BlockType::Memsys,
        (BlockRole::Memsys, CounterSet::Secondary) => V5BlockType::Memsys2,
        (BlockRole::Memsys, CounterSet::Tertiary) => V5BlockType::Undefined,

        (BlockRole::ShaderCore, CounterSet::Primary) => V5BlockType::Sc,
        (BlockRole::ShaderCore, CounterSet::Secondary) => V5BlockType::Sc2,
        (BlockRole::ShaderCore, CounterSet::Tertiary) if csf => V5BlockType::Sc3,
        (BlockRole::ShaderCore, CounterSet::Tertiary) => V5BlockType::Undefined,
    }
}

// =============================================================================
// INSTANCE ARITHMETIC
// =============================================================================

/// Shader-core instances needed to cover a possibly sparse core mask
///
/// This is the index of the highest set bit plus one, not the population
/// count: cores missing from the middle of the mask still take a slot.
#[inline]
pub const fn shader_core_count(core_mask: u64) -> usize {
    (u64::BITS - core_mask.leading_zeros()) as usize
}

/// Front-end, tiler and memsys instances
#[inline]
pub const fn non_shader_count(info: &GpuInfo) -> usize {
    info.l2_count.saturating_add(2)
}

/// Availability mask for a GPU
///
/// Non-shader blocks always exist; shader cores mirror the core mask.
pub fn avail_mask(info: &GpuInfo) -> u64 {
    let non_sc = non_shader_count(info);
    let non_sc_mask = match u32::try_from(non_sc) {
        Ok(bits) if bits < u64::BITS => (1u64 << bits) - 1,
        _ => u64::MAX,
    };
    let sc_mask = u32::try_from(non_sc)
        .ok()
        .and_then(|shift| info.core_mask.checked_shl(shift))
        .unwrap_or(0);
    non_sc_mask | sc_mask
}

/// Raw dump size of a job-manager GPU, in bytes
///
/// Saturates for layouts too large to plan.
pub const fn jm_dump_bytes(info: &GpuInfo) -> usize {
    non_shader_count(info)
        .saturating_add(shader_core_count(info.core_mask))
        .saturating_mul(V5_VALUES_PER_BLOCK * VALUE_BYTES)
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Planned v5 layout for one GPU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V5Layout {
    blocks: [BlockDescription; V5_BLOCK_TYPE_COUNT],
    avail_mask: u64,
    clk_cnt: usize,
}

impl V5Layout {
    /// Plan the layout for a GPU
    pub fn plan(info: &GpuInfo, family: ChipFamily, set: CounterSet) -> Result<Self> {
        let non_sc = non_shader_count(info);
        let sc = shader_core_count(info.core_mask);
        let instances = non_sc.saturating_add(sc);

        // 64-bit availability mask cannot describe more instances
        if instances > AVAIL_MASK_BITS {
            log::warn!(
                "hwcnt: {} L2 slices and {} shader cores exceed {} block instances",
                info.l2_count,
                sc,
                AVAIL_MASK_BITS
            );
            return Err(Error::CapacityExceeded {
                instances,
                limit: AVAIL_MASK_BITS,
            });
        }

        let describe = |role, inst_cnt| BlockDescription {
            type_id: block_type(role, set, family).id(),
            inst_cnt,
            hdr_cnt: V5_HEADERS_PER_BLOCK,
            ctr_cnt: V5_COUNTERS_PER_BLOCK,
        };

        Ok(Self {
            blocks: [
                describe(BlockRole::FrontEnd, 1),
                describe(BlockRole::Tiler, 1),
                describe(BlockRole::Memsys, info.l2_count),
                describe(BlockRole::ShaderCore, sc),
            ],
            avail_mask: avail_mask(info),
            clk_cnt: info.clk_cnt,
        })
    }

    /// Block descriptions: front-end, tiler, memsys, shader core
    #[inline]
    pub fn blocks(&self) -> &[BlockDescription; V5_BLOCK_TYPE_COUNT] {
        &self.blocks
    }

    /// Availability mask
    #[inline]
    pub fn avail_mask(&self) -> u64 {
        self.avail_mask
    }

    /// Total block instances
    pub fn instance_count(&self) -> usize {
        self.blocks.iter().map(|b| b.inst_cnt).sum()
    }

    /// Container description with a single v5 group
    pub fn description(&self) -> Description {
        let mut groups = Vec::with_capacity(1);
        groups.push(GroupDescription {
            type_id: GroupType::V5.id(),
            blocks: self.blocks.to_vec(),
        });
        Description {
            groups,
            avail_mask: self.avail_mask,
            clk_cnt: self.clk_cnt,
        }
    }
}
