//! # HWCNT Core
//!
//! Generic hardware counter containers shared by every GPU backend.
//!
//! A counter layout is described once as groups of blocks, each block having
//! a number of instances and a fixed number of header and counter values.
//! From that description this crate builds immutable [`Metadata`], and the
//! two per-session containers bound to it:
//!
//! - [`EnableMap`]: which values of each block instance are requested
//! - [`DumpBuffer`]: the collected 32-bit values of each block instance
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        hwcnt-core                           │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Description │─▶│  Metadata   │◀─│ EnableMap           │  │
//! │  │ (groups,    │  │ (Arc, read  │  │ DumpBuffer          │  │
//! │  │  blocks)    │  │  only)      │  │ (bound per session) │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Iteration over block instances is deterministic: groups in order, blocks
//! in order within a group, instances in order within a block. The flat
//! position of an instance in that walk is also its bit in the availability
//! mask.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod dump_buffer;
pub mod enable_map;
pub mod error;
pub mod metadata;

// Re-exports for convenience
pub use dump_buffer::{block_accumulate, block_copy, block_zero, DumpBuffer};
pub use enable_map::{BlockEnableMap, EnableMap};
pub use error::{contract_violation, Error, Result};
pub use metadata::{
    BlockDescription, BlockInstance, BlockMetadata, Description, GroupDescription, GroupMetadata,
    Metadata,
};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Size of one counter value in bytes
pub const VALUE_BYTES: usize = 4;

/// Number of bits in the availability mask
pub const AVAIL_MASK_BITS: usize = 64;

/// Number of values covered by one enable-map word
pub const BITFIELD_BITS: usize = 64;

/// Number of enable-map words per block instance
pub const BLOCK_ENABLE_MAP_WORDS: usize = 2;

/// Largest number of values a block may hold
pub const MAX_VALUES_PER_BLOCK: usize = BITFIELD_BITS * BLOCK_ENABLE_MAP_WORDS;

/// Largest number of clock domains a layout may carry
pub const MAX_CLOCK_DOMAINS: usize = 64;

static_assertions::const_assert_eq!(VALUE_BYTES, core::mem::size_of::<u32>());
static_assertions::const_assert!(MAX_VALUES_PER_BLOCK >= 128);
static_assertions::const_assert!(AVAIL_MASK_BITS <= u64::BITS as usize);
