//! The single block-0 superblock record.

use bytemuck::{Pod, Zeroable};

use super::layout::{self, MAGIC};
use crate::error::SfsError;

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct RawSuperblock {
    pub magic: u32,
    pub block_size: u32,
    pub fs_size_blocks: u32,
    pub inode_table_len: u32,
    pub root_dir_inode: u32,
}

impl RawSuperblock {
    pub fn fresh() -> Self {
        Self {
            magic: MAGIC,
            block_size: layout::BLOCK_SIZE,
            fs_size_blocks: layout::NUM_TOTAL_BLOCKS,
            inode_table_len: layout::NUM_INODE_BLOCKS,
            root_dir_inode: 0,
        }
    }

    pub fn validate(&self) -> Result<(), SfsError> {
        if self.magic != MAGIC {
            return Err(SfsError::BadMagic {
                expected: MAGIC,
                found: self.magic,
            });
        }
        Ok(())
    }
}

impl Default for RawSuperblock {
    fn default() -> Self {
        Self {
            magic: 0,
            block_size: 0,
            fs_size_blocks: 0,
            inode_table_len: 0,
            root_dir_inode: 0,
        }
    }
}
