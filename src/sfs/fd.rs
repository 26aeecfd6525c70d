//! In-memory file descriptor table. Never persisted — remounting always
//! starts with every descriptor closed.

use crate::error::SfsError;
use crate::sfs::layout::NUM_INODES;

#[derive(Clone, Copy)]
struct Descriptor {
    /// Inode index this descriptor refers to, or `None` if the slot is free.
    inode: Option<u32>,
    rwptr: u32,
}

pub struct FdTable {
    slots: Vec<Descriptor>,
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: vec![Descriptor { inode: None, rwptr: 0 }; NUM_INODES as usize],
        }
    }

    /// Finds a free slot and binds it to `inode` at the given starting
    /// offset, returning the descriptor index. Slot 0 is never handed out;
    /// it mirrors inode 0's reservation for the root directory.
    pub fn open(&mut self, inode: u32, rwptr: u32) -> Result<i32, SfsError> {
        let slot = (1..self.slots.len())
            .find(|&i| self.slots[i].inode.is_none())
            .ok_or(SfsError::DescriptorsExhausted)?;
        self.slots[slot] = Descriptor {
            inode: Some(inode),
            rwptr,
        };
        Ok(slot as i32)
    }

    pub fn is_open_for_inode(&self, inode: u32) -> bool {
        self.slots.iter().any(|d| d.inode == Some(inode))
    }

    pub fn close(&mut self, fd: i32) -> Result<(), SfsError> {
        let slot = self.validate(fd)?;
        if self.slots[slot].inode.is_none() {
            return Err(SfsError::DescriptorNotOpen(fd));
        }
        self.slots[slot] = Descriptor { inode: None, rwptr: 0 };
        Ok(())
    }

    /// Closes whichever descriptor (if any) refers to `inode`, used by
    /// `remove` to force-close a file that is being deleted out from under
    /// its open handle.
    pub fn close_inode(&mut self, inode: u32) {
        for slot in &mut self.slots {
            if slot.inode == Some(inode) {
                *slot = Descriptor { inode: None, rwptr: 0 };
            }
        }
    }

    pub fn inode_of(&self, fd: i32) -> Result<u32, SfsError> {
        let slot = self.validate(fd)?;
        self.slots[slot].inode.ok_or(SfsError::DescriptorNotOpen(fd))
    }

    pub fn rwptr(&self, fd: i32) -> Result<u32, SfsError> {
        let slot = self.validate(fd)?;
        if self.slots[slot].inode.is_none() {
            return Err(SfsError::DescriptorNotOpen(fd));
        }
        Ok(self.slots[slot].rwptr)
    }

    pub fn set_rwptr(&mut self, fd: i32, value: u32) -> Result<(), SfsError> {
        let slot = self.validate(fd)?;
        if self.slots[slot].inode.is_none() {
            return Err(SfsError::DescriptorNotOpen(fd));
        }
        self.slots[slot].rwptr = value;
        Ok(())
    }

    fn validate(&self, fd: i32) -> Result<usize, SfsError> {
        if fd <= 0 || fd as usize >= self.slots.len() {
            return Err(SfsError::DescriptorOutOfRange(fd));
        }
        Ok(fd as usize)
    }
}
