//! # v5 Block Types
//!
//! Group and block type ids of the v5 counter layout, and the roles they
//! fill.

use hwcnt_core::{contract_violation, Metadata};

// =============================================================================
// LAYOUT CONSTANTS
// =============================================================================

/// Block descriptions in one v5 group
pub const V5_BLOCK_TYPE_COUNT: usize = 4;
/// Header values per v5 block instance
pub const V5_HEADERS_PER_BLOCK: usize = 4;
/// Counter values per v5 block instance
pub const V5_COUNTERS_PER_BLOCK: usize = 60;
/// Values per v5 block instance
pub const V5_VALUES_PER_BLOCK: usize = V5_HEADERS_PER_BLOCK + V5_COUNTERS_PER_BLOCK;
/// Header slot holding the block's physical enable bitmap (PRFCNT_EN)
pub const V5_PRFCNT_EN_HEADER: usize = 2;

static_assertions::const_assert_eq!(V5_VALUES_PER_BLOCK, 64);
static_assertions::const_assert!(V5_VALUES_PER_BLOCK <= hwcnt_core::BITFIELD_BITS);
static_assertions::const_assert!(V5_PRFCNT_EN_HEADER < V5_HEADERS_PER_BLOCK);

// =============================================================================
// GROUP TYPE
// =============================================================================

/// Group type ids understood by this backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum GroupType {
    /// v5 layout: front-end, tiler, memsys, shader cores
    V5 = 0x10,
}

impl GroupType {
    /// Raw id stored in the metadata
    #[inline]
    pub const fn id(self) -> u64 {
        self as u64
    }

    /// Decode a raw id
    pub const fn from_id(id: u64) -> Option<Self> {
        match id {
            0x10 => Some(Self::V5),
            _ => None,
        }
    }
}

// =============================================================================
// BLOCK TYPE
// =============================================================================

/// Role a block plays in the v5 layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockRole {
    /// Job manager / command stream front-end
    FrontEnd,
    /// Tiler
    Tiler,
    /// Memory system (one instance per L2 slice)
    Memsys,
    /// Shader core
    ShaderCore,
}

/// v5 block type ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum V5BlockType {
    /// No physical block for this role and counter set; occupies layout
    /// space but never contributes
    Undefined = 0x10,
    /// Front-end, primary set
    Fe,
    /// Front-end, secondary set
    Fe2,
    /// Front-end, tertiary set
    Fe3,
    /// Tiler, primary set
    Tiler,
    /// Shader core, primary set
    Sc,
    /// Shader core, secondary set
    Sc2,
    /// Shader core, tertiary set
    Sc3,
    /// Memory system, primary set
    Memsys,
    /// Memory system, secondary set
    Memsys2,
}

impl V5BlockType {
    const ALL: [Self; 10] = [
        Self::Undefined,
        Self::Fe,
        Self::Fe2,
        Self::Fe3,
        Self::Tiler,
        Self::Sc,
        Self::Sc2,
        Self::Sc3,
        Self::Memsys,
        Self::Memsys2,
    ];

    /// Raw id stored in the metadata
    #[inline]
    pub const fn id(self) -> u64 {
        self as u64
    }

    /// Decode a raw id
    pub fn from_id(id: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.id() == id)
    }

    /// Role of this block, `None` for [`V5BlockType::Undefined`]
    pub const fn role(self) -> Option<BlockRole> {
        match self {
            Self::Undefined => None,
            Self::Fe | Self::Fe2 | Self::Fe3 => Some(BlockRole::FrontEnd),
            Self::Tiler => Some(BlockRole::Tiler),
            Self::Sc | Self::Sc2 | Self::Sc3 => Some(BlockRole::ShaderCore),
            Self::Memsys | Self::Memsys2 => Some(BlockRole::Memsys),
        }
    }

    /// Whether this is a shader-core block
    #[inline]
    pub const fn is_shader(self) -> bool {
        matches!(self.role(), Some(BlockRole::ShaderCore))
    }
}

/// Decode the v5 type of a block, treating anything else as a broken
/// contract.
///
/// Metadata handed to this backend is always built by
/// [`crate::metadata`], so a foreign group type, block type or value count
/// means the caller mixed up layouts.
pub fn v5_block_type(metadata: &Metadata, grp: usize, blk: usize) -> V5BlockType {
    let grp_type = metadata.group_type(grp);
    if GroupType::from_id(grp_type).is_none() {
        contract_violation(format_args!("group {} has non-v5 type {:#x}", grp, grp_type));
    }

    let values = metadata.block_values_count(grp, blk);
    if values != V5_VALUES_PER_BLOCK {
        contract_violation(format_args!(
            "v5 block {}.{} has {} values, expected {}",
            grp, blk, values, V5_VALUES_PER_BLOCK
        ));
    }

    let blk_type = metadata.block_type(grp, blk);
    match V5BlockType::from_id(blk_type) {
        Some(t) => t,
        None => contract_violation(format_args!(
            "block {}.{} has non-v5 type {:#x}",
            grp, blk, blk_type
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ids_are_stable() {
        assert_eq!(GroupType::V5.id(), 0x10);
        assert_eq!(V5BlockType::Undefined.id(), 0x10);
        assert_eq!(V5BlockType::Fe.id(), 0x11);
        assert_eq!(V5BlockType::Sc.id(), 0x15);
        assert_eq!(V5BlockType::Memsys2.id(), 0x19);
    }

    #[test]
    fn test_id_roundtrip() {
        for t in V5BlockType::ALL {
            assert_eq!(V5BlockType::from_id(t.id()), Some(t));
        }
        assert_eq!(V5BlockType::from_id(0x0F), None);
        assert_eq!(V5BlockType::from_id(0x1A), None);
        assert_eq!(GroupType::from_id(0x11), None);
    }

    #[test]
    fn test_roles() {
        assert_eq!(V5BlockType::Undefined.role(), None);
        assert_eq!(V5BlockType::Fe3.role(), Some(BlockRole::FrontEnd));
        assert_eq!(V5BlockType::Memsys2.role(), Some(BlockRole::Memsys));
        assert!(V5BlockType::Sc2.is_shader());
        assert!(!V5BlockType::Tiler.is_shader());
        assert!(!V5BlockType::Undefined.is_shader());
    }
}
