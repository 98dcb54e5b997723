//! # Metadata Builder
//!
//! Turns a planned [`V5Layout`] into container [`Metadata`] for either GPU
//! family.

use alloc::sync::Arc;

use hwcnt_core::{contract_violation, Metadata, Result};

use crate::layout::{jm_dump_bytes, ChipFamily, CounterSet, GpuInfo, V5Layout};

/// Metadata for a job-manager GPU, with the raw dump size it expects
#[derive(Debug, Clone)]
pub struct JmMetadata {
    /// Counter layout
    pub metadata: Arc<Metadata>,
    /// Bytes the GPU writes per counter dump
    pub dump_bytes: usize,
}

/// Build v5 metadata for a GPU of the given family
pub fn create_metadata(info: &GpuInfo, family: ChipFamily, set: CounterSet) -> Result<Arc<Metadata>> {
    let layout = V5Layout::plan(info, family, set)?;
    let metadata = Metadata::new(&layout.description())?;

    log::debug!(
        "hwcnt: {:?} v5 metadata, {:?} set, {} instances, avail {:#018x}, {} bytes",
        family,
        set,
        metadata.instance_count(),
        metadata.avail_mask(),
        metadata.dump_buf_bytes()
    );

    Ok(metadata)
}

/// Build metadata for a job-manager GPU
///
/// The flat hardware dump and the container layout must agree exactly; a
/// mismatch is an internal inconsistency, not a caller error.
pub fn jm_metadata_create(info: &GpuInfo, set: CounterSet) -> Result<JmMetadata> {
    let metadata = create_metadata(info, ChipFamily::JobManager, set)?;
    // Planning bounded the instance count, so the size cannot overflow
    let dump_bytes = jm_dump_bytes(info);

    if dump_bytes != metadata.dump_buf_bytes() {
        contract_violation(format_args!(
            "job manager dump is {} bytes, metadata describes {}",
            dump_bytes,
            metadata.dump_buf_bytes()
        ));
    }

    Ok(JmMetadata {
        metadata,
        dump_bytes,
    })
}

/// Release job-manager metadata; `None` is a no-op
pub fn jm_metadata_destroy(metadata: Option<Arc<Metadata>>) {
    destroy(metadata);
}

/// Build metadata for a command-stream frontend GPU
pub fn csf_metadata_create(info: &GpuInfo, set: CounterSet) -> Result<Arc<Metadata>> {
    create_metadata(info, ChipFamily::CommandStream, set)
}

/// Release command-stream metadata; `None` is a no-op
pub fn csf_metadata_destroy(metadata: Option<Arc<Metadata>>) {
    destroy(metadata);
}

fn destroy(metadata: Option<Arc<Metadata>>) {
    let Some(metadata) = metadata else {
        return;
    };

    // Sessions still holding maps or buffers keep the layout alive
    log::debug!(
        "hwcnt: releasing metadata ({} other references)",
        Arc::strong_count(&metadata) - 1
    );
    drop(metadata);
}
