//! Free-block bitmap: one byte per data block, 0 = free, 1 = allocated.
//!
//! Kept as one byte per slot (not bit-packed) to match the original
//! `bitmap_entry_t` layout and keep the read/write path a straight memcpy
//! of the in-memory `Vec<u8>` to/from disk.

use super::layout::{DATA_BLOCKS_OFFSET, MAX_DATA_BLOCKS_SCALED_DOWN};
use crate::error::SfsError;

pub struct Bitmap {
    slots: Vec<u8>,
}

impl Bitmap {
    pub fn empty() -> Self {
        Self {
            slots: vec![0; MAX_DATA_BLOCKS_SCALED_DOWN as usize],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.len(), MAX_DATA_BLOCKS_SCALED_DOWN as usize);
        Self { slots: bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.slots
    }

    /// Whether the slot backing the given absolute LBA is currently
    /// claimed. Slot indices, not LBAs, are stored directly; `lba` must
    /// already have `DATA_BLOCKS_OFFSET` subtracted by the caller.
    fn is_allocated(&self, slot: u32) -> bool {
        self.slots[slot as usize] != 0
    }

    /// Finds and claims the first free slot, returning its absolute LBA.
    pub fn allocate(&mut self) -> Result<u32, SfsError> {
        let slot = self
            .slots
            .iter()
            .position(|&b| b == 0)
            .ok_or(SfsError::BlocksExhausted)?;
        self.slots[slot] = 1;
        Ok(slot as u32 + DATA_BLOCKS_OFFSET)
    }

    /// Frees the slot backing the given absolute LBA. A no-op (rather than a
    /// panic) for LBA 0, since callers routinely pass through unallocated
    /// pointers when walking an inode's block list.
    pub fn free(&mut self, lba: u32) {
        if lba == 0 {
            return;
        }
        let slot = (lba - DATA_BLOCKS_OFFSET) as usize;
        debug_assert!(
            self.is_allocated(slot as u32),
            "double free of bitmap slot {slot} (lba {lba})"
        );
        self.slots[slot] = 0;
    }

    pub fn all_free(&self) -> bool {
        self.slots.iter().all(|&b| b == 0)
    }
}
