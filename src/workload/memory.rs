//! Steady-state memory pressure.

use std::collections::TryReserveError;

const MIB: usize = 1024 * 1024;

/// A block of memory allocated once at startup and held for the process
/// lifetime. Every byte is written so the pages are resident.
#[derive(Debug)]
pub struct MemoryBallast {
    block: Vec<u8>,
}

impl MemoryBallast {
    /// Allocate `mib` MiB. Zero allocates nothing.
    pub fn allocate(mib: u64) -> Result<Self, TryReserveError> {
        let len = usize::try_from(mib).unwrap_or(usize::MAX).saturating_mul(MIB);
        let mut block = Vec::new();
        block.try_reserve_exact(len)?;
        block.resize(len, 0xA5);
        Ok(Self { block })
    }

    /// Size of the ballast in bytes.
    pub fn len(&self) -> usize {
        self.block.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }
}
