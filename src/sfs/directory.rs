//! The flat, single-level directory table.

use bytemuck::{Pod, Zeroable};

/// Maximum filename length, NUL terminator included, matching the original
/// `MAX_FILENAME` macro.
pub const MAX_FILENAME: usize = 60;

/// Whether a directory slot is free or in use. Kept as a `u32` on disk (not
/// a `bool`) so the record has a fixed, predictable byte layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum EntryMode {
    Free = 0,
    Used = 1,
}

/// One packed, on-disk directory entry: a NUL-terminated filename and a
/// mode flag. Entry `i` always corresponds to inode `i + 1`.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct RawDirectoryEntry {
    mode: u32,
    names: [u8; MAX_FILENAME],
}

impl RawDirectoryEntry {
    pub const fn free() -> Self {
        Self {
            mode: EntryMode::Free as u32,
            names: [0; MAX_FILENAME],
        }
    }

    pub fn mode(&self) -> EntryMode {
        if self.mode == EntryMode::Used as u32 {
            EntryMode::Used
        } else {
            EntryMode::Free
        }
    }

    pub fn is_used(&self) -> bool {
        self.mode() == EntryMode::Used
    }

    pub fn name(&self) -> &str {
        let len = self.names.iter().position(|&b| b == 0).unwrap_or(self.names.len());
        std::str::from_utf8(&self.names[..len]).unwrap_or("")
    }

    /// Sets the name and marks the entry used. Caller must have already
    /// validated the name's length.
    pub fn occupy(&mut self, name: &str) {
        self.names = [0; MAX_FILENAME];
        self.names[..name.len()].copy_from_slice(name.as_bytes());
        self.mode = EntryMode::Used as u32;
    }

    pub fn clear(&mut self) {
        *self = Self::free();
    }
}

impl Default for RawDirectoryEntry {
    fn default() -> Self {
        Self::free()
    }
}
